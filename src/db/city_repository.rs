// src/db/city_repository.rs
// DOCUMENTATION: Country and city database operations
// PURPOSE: Geography lookups for listings and ingest resolution

use crate::errors::AtlasError;
use crate::models::{City, CityWithCount, Country};
use sqlx::PgPool;
use uuid::Uuid;

const CITY_SELECT: &str = r#"
    SELECT c.id, c.name, c.slug, c.country_id,
           co.name AS country_name, co.slug AS country_slug,
           c.latitude, c.longitude, c.description, c.image_url,
           c.created_at, c.updated_at
    FROM cities c
    LEFT JOIN countries co ON co.id = c.country_id
"#;

const CITY_WITH_COUNT_SELECT: &str = r#"
    SELECT c.id, c.name, c.slug,
           co.name AS country_name, co.slug AS country_slug,
           c.image_url,
           COUNT(p.id) FILTER (WHERE p.is_active) AS place_count
    FROM cities c
    LEFT JOIN countries co ON co.id = c.country_id
    LEFT JOIN places p ON p.city_id = c.id
"#;

fn db_error(context: &str, e: sqlx::Error) -> AtlasError {
    log::error!("{}: {}", context, e);
    AtlasError::DatabaseError(e.to_string())
}

pub struct CityRepository;

impl CityRepository {
    /// Insert a country by slug or return the existing one
    pub async fn upsert_country(pool: &PgPool, name: &str, slug: &str) -> Result<Country, AtlasError> {
        sqlx::query_as::<_, Country>(
            r#"
            INSERT INTO countries (name, slug)
            VALUES ($1, $2)
            ON CONFLICT (slug) DO UPDATE SET name = countries.name
            RETURNING id, name, slug, code, created_at
            "#,
        )
        .bind(name.trim())
        .bind(slug)
        .fetch_one(pool)
        .await
        .map_err(|e| db_error(&format!("Failed to upsert country {}", slug), e))
    }

    /// City id for `slug`, creating the city when it does not exist
    /// DOCUMENTATION: An existing city without a country adopts `country_id`;
    /// coordinates seed the city centre only on creation
    pub async fn find_or_create_city(
        pool: &PgPool,
        name: &str,
        slug: &str,
        country_id: Option<Uuid>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Uuid, AtlasError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO cities (name, slug, country_id, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slug) DO UPDATE
            SET country_id = COALESCE(cities.country_id, EXCLUDED.country_id)
            RETURNING id
            "#,
        )
        .bind(name.trim())
        .bind(slug)
        .bind(country_id)
        .bind(latitude)
        .bind(longitude)
        .fetch_one(pool)
        .await
        .map_err(|e| db_error(&format!("Failed to resolve city {}", slug), e))?;

        Ok(id)
    }

    pub async fn list_countries(pool: &PgPool) -> Result<Vec<Country>, AtlasError> {
        sqlx::query_as::<_, Country>(
            "SELECT id, name, slug, code, created_at FROM countries ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| db_error("Failed to list countries", e))
    }

    pub async fn get_country_by_slug(pool: &PgPool, slug: &str) -> Result<Country, AtlasError> {
        sqlx::query_as::<_, Country>(
            "SELECT id, name, slug, code, created_at FROM countries WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(|e| db_error("Failed to fetch country", e))?
        .ok_or_else(|| {
            log::warn!("Country not found: {}", slug);
            AtlasError::NotFound(format!("country '{}'", slug))
        })
    }

    /// Cities with active place counts, optionally within one country
    pub async fn list_cities(
        pool: &PgPool,
        country_slug: Option<&str>,
    ) -> Result<Vec<CityWithCount>, AtlasError> {
        let sql = format!(
            "{} WHERE ($1::text IS NULL OR co.slug = $1) \
             GROUP BY c.id, co.name, co.slug \
             ORDER BY place_count DESC, c.name",
            CITY_WITH_COUNT_SELECT
        );

        sqlx::query_as::<_, CityWithCount>(&sql)
            .bind(country_slug)
            .fetch_all(pool)
            .await
            .map_err(|e| db_error("Failed to list cities", e))
    }

    pub async fn get_city_by_slug(pool: &PgPool, slug: &str) -> Result<City, AtlasError> {
        let sql = format!("{} WHERE c.slug = $1", CITY_SELECT);
        sqlx::query_as::<_, City>(&sql)
            .bind(slug)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_error("Failed to fetch city", e))?
            .ok_or_else(|| {
                log::warn!("City not found: {}", slug);
                AtlasError::NotFound(format!("city '{}'", slug))
            })
    }

    pub async fn get_city_by_id(pool: &PgPool, id: Uuid) -> Result<City, AtlasError> {
        let sql = format!("{} WHERE c.id = $1", CITY_SELECT);
        sqlx::query_as::<_, City>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_error("Failed to fetch city", e))?
            .ok_or_else(|| AtlasError::NotFound(format!("city '{}'", id)))
    }

    /// Active place counts per type within a city
    pub async fn place_counts_by_type(
        pool: &PgPool,
        city_id: Uuid,
    ) -> Result<Vec<(String, i64)>, AtlasError> {
        sqlx::query_as(
            r#"
            SELECT type, COUNT(*)
            FROM places
            WHERE city_id = $1 AND is_active = true
            GROUP BY type
            "#,
        )
        .bind(city_id)
        .fetch_all(pool)
        .await
        .map_err(|e| db_error("Failed to count city places", e))
    }

    /// Active place counts per country; places in cities without a country
    /// are grouped under "unknown"
    pub async fn place_counts_by_country(pool: &PgPool) -> Result<Vec<(String, i64)>, AtlasError> {
        sqlx::query_as(
            r#"
            SELECT COALESCE(co.name, 'unknown'), COUNT(p.id)
            FROM places p
            JOIN cities c ON c.id = p.city_id
            LEFT JOIN countries co ON co.id = c.country_id
            WHERE p.is_active = true
            GROUP BY 1
            ORDER BY 2 DESC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(|e| db_error("Failed to count places per country", e))
    }

    /// (countries, cities)
    pub async fn totals(pool: &PgPool) -> Result<(i64, i64), AtlasError> {
        sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM countries), (SELECT COUNT(*) FROM cities)",
        )
        .fetch_one(pool)
        .await
        .map_err(|e| db_error("Failed to count geography", e))
    }
}
