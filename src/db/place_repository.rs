// src/db/place_repository.rs
// DOCUMENTATION: Database access layer for places
// PURPOSE: Abstract place SQL from business logic

use crate::errors::AtlasError;
use crate::ingest::dedupe::PlaceCandidate;
use crate::models::*;
use crate::services::geo;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Shared SELECT list; places joined with their city and country
const PLACE_SELECT: &str = r#"
    SELECT
        p.id, p.name, p.slug, p.type, p.city_id,
        c.name AS city_name, c.slug AS city_slug, co.name AS country_name,
        p.latitude, p.longitude, p.address, p.phone, p.website,
        p.description, p.short_description, p.amenities, p.dog_policy,
        p.rating, p.review_count, p.image_url, p.is_verified, p.is_active,
        p.created_at, p.updated_at
    FROM places p
    JOIN cities c ON c.id = p.city_id
    LEFT JOIN countries co ON co.id = c.country_id
"#;

/// Internal struct for mapping database rows to Place struct
/// DOCUMENTATION: `type` is read as text and parsed into PlaceType
#[derive(Debug, FromRow)]
struct PlaceRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[sqlx(rename = "type")]
    pub type_field: String,
    pub city_id: Uuid,
    pub city_name: String,
    pub city_slug: String,
    pub country_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub amenities: Vec<String>,
    pub dog_policy: Option<String>,
    pub rating: Option<f32>,
    pub review_count: i32,
    pub image_url: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlaceRow {
    /// Convert PlaceRow to Place model
    fn into_place(self) -> Place {
        let place_type = self.type_field.parse().unwrap_or_else(|e| {
            log::warn!("Place {} has {}; reading as other", self.id, e);
            PlaceType::Other
        });

        Place {
            id: self.id,
            name: self.name,
            slug: self.slug,
            place_type,
            city_id: self.city_id,
            city_name: self.city_name,
            city_slug: self.city_slug,
            country_name: self.country_name,
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.address,
            phone: self.phone,
            website: self.website,
            description: self.description,
            short_description: self.short_description,
            amenities: self.amenities,
            dog_policy: self.dog_policy,
            rating: self.rating,
            review_count: self.review_count,
            image_url: self.image_url,
            is_verified: self.is_verified,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> AtlasError {
    log::error!("{}: {}", context, e);
    AtlasError::DatabaseError(e.to_string())
}

/// ILIKE pattern matching `q` anywhere, with LIKE metacharacters escaped
fn contains_pattern(q: &str) -> String {
    let escaped = q
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Append the WHERE clause shared by the search count and page queries
fn push_search_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &SearchQuery) {
    builder.push(" WHERE p.is_active = true");

    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = contains_pattern(q);
        builder
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(city) = &query.city {
        builder.push(" AND c.slug = ").push_bind(city.clone());
    }

    if let Some(country) = &query.country {
        builder.push(" AND co.slug = ").push_bind(country.clone());
    }

    if let Some(place_type) = query.place_type {
        builder.push(" AND p.type = ").push_bind(place_type.as_str());
    }

    if let Some(min_rating) = query.min_rating {
        builder.push(" AND p.rating >= ").push_bind(min_rating);
    }

    if let Some(amenity) = &query.amenity {
        builder
            .push(" AND ")
            .push_bind(amenity.trim().to_lowercase())
            .push(" = ANY(p.amenities)");
    }

    if let Some((lat, lon, radius_km)) = query.proximity() {
        let (lat_delta, lon_delta) = geo::bounding_deltas(lat, radius_km);
        builder
            .push(" AND p.latitude BETWEEN ")
            .push_bind(lat - lat_delta)
            .push(" AND ")
            .push_bind(lat + lat_delta)
            .push(" AND p.longitude BETWEEN ")
            .push_bind(lon - lon_delta)
            .push(" AND ")
            .push_bind(lon + lon_delta);

        // Exact haversine distance in km
        builder
            .push(" AND 2 * 6371 * asin(sqrt(power(sin(radians(p.latitude - ")
            .push_bind(lat)
            .push(") / 2), 2) + cos(radians(")
            .push_bind(lat)
            .push(")) * cos(radians(p.latitude)) * power(sin(radians(p.longitude - ")
            .push_bind(lon)
            .push(") / 2), 2))) <= ")
            .push_bind(radius_km);
    }
}

/// PlaceRepository: All database operations for places
pub struct PlaceRepository;

impl PlaceRepository {
    /// Create new place in database
    /// DOCUMENTATION: Used by POST /api/places; a taken slug is a conflict
    pub async fn create_place(pool: &PgPool, place: &NewPlace) -> Result<Place, AtlasError> {
        let inserted: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO places (
                name, slug, type, city_id, latitude, longitude,
                address, phone, website, description, short_description,
                amenities, dog_policy, rating, image_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id
            "#,
        )
        .bind(&place.name)
        .bind(&place.slug)
        .bind(place.place_type.as_str())
        .bind(place.city_id)
        .bind(place.latitude)
        .bind(place.longitude)
        .bind(&place.address)
        .bind(&place.phone)
        .bind(&place.website)
        .bind(&place.description)
        .bind(&place.short_description)
        .bind(&place.amenities)
        .bind(&place.dog_policy)
        .bind(place.rating)
        .bind(&place.image_url)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                log::warn!("Place slug already taken: {}", place.slug);
                AtlasError::AlreadyExists(format!("place '{}'", place.slug))
            }
            other => db_error("Failed to create place", other),
        })?;

        let place = Self::get_by_id(pool, inserted.0).await?;
        log::info!("Created place {} ({})", place.slug, place.id);
        Ok(place)
    }

    /// Insert or update a place keyed by slug
    /// DOCUMENTATION: Returns (id, inserted). Review-derived ratings and
    /// enrichment images are not overwritten by import data.
    pub async fn upsert_by_slug(pool: &PgPool, place: &NewPlace) -> Result<(Uuid, bool), AtlasError> {
        let (id, inserted): (Uuid, bool) = sqlx::query_as(
            r#"
            INSERT INTO places (
                name, slug, type, city_id, latitude, longitude,
                address, phone, website, description, short_description,
                amenities, dog_policy, rating, image_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                type = EXCLUDED.type,
                city_id = EXCLUDED.city_id,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                address = COALESCE(EXCLUDED.address, places.address),
                phone = COALESCE(EXCLUDED.phone, places.phone),
                website = COALESCE(EXCLUDED.website, places.website),
                description = COALESCE(EXCLUDED.description, places.description),
                short_description = COALESCE(EXCLUDED.short_description, places.short_description),
                amenities = CASE WHEN cardinality(EXCLUDED.amenities) > 0
                                 THEN EXCLUDED.amenities ELSE places.amenities END,
                dog_policy = COALESCE(EXCLUDED.dog_policy, places.dog_policy),
                rating = CASE WHEN places.review_count > 0
                              THEN places.rating
                              ELSE COALESCE(EXCLUDED.rating, places.rating) END,
                image_url = COALESCE(places.image_url, EXCLUDED.image_url),
                is_active = true,
                updated_at = NOW()
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(&place.name)
        .bind(&place.slug)
        .bind(place.place_type.as_str())
        .bind(place.city_id)
        .bind(place.latitude)
        .bind(place.longitude)
        .bind(&place.address)
        .bind(&place.phone)
        .bind(&place.website)
        .bind(&place.description)
        .bind(&place.short_description)
        .bind(&place.amenities)
        .bind(&place.dog_policy)
        .bind(place.rating)
        .bind(&place.image_url)
        .fetch_one(pool)
        .await
        .map_err(|e| db_error(&format!("Failed to upsert place {}", place.slug), e))?;

        Ok((id, inserted))
    }

    /// Merge imported values into a matched duplicate, keeping its name and slug
    pub async fn merge_import(pool: &PgPool, id: Uuid, place: &NewPlace) -> Result<(), AtlasError> {
        let rows = sqlx::query(
            r#"
            UPDATE places SET
                type = $1,
                latitude = $2,
                longitude = $3,
                address = COALESCE($4, address),
                phone = COALESCE($5, phone),
                website = COALESCE($6, website),
                description = COALESCE($7, description),
                short_description = COALESCE($8, short_description),
                amenities = CASE WHEN cardinality($9::text[]) > 0 THEN $9 ELSE amenities END,
                dog_policy = COALESCE($10, dog_policy),
                rating = CASE WHEN review_count > 0 THEN rating ELSE COALESCE($11, rating) END,
                image_url = COALESCE(image_url, $12),
                is_active = true,
                updated_at = NOW()
            WHERE id = $13
            "#,
        )
        .bind(place.place_type.as_str())
        .bind(place.latitude)
        .bind(place.longitude)
        .bind(&place.address)
        .bind(&place.phone)
        .bind(&place.website)
        .bind(&place.description)
        .bind(&place.short_description)
        .bind(&place.amenities)
        .bind(&place.dog_policy)
        .bind(place.rating)
        .bind(&place.image_url)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| db_error(&format!("Failed to merge import into place {}", id), e))?
        .rows_affected();

        if rows == 0 {
            return Err(AtlasError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Active places of one city, for import dedupe
    pub async fn candidates_in_city(
        pool: &PgPool,
        city_id: Uuid,
    ) -> Result<Vec<PlaceCandidate>, AtlasError> {
        let rows: Vec<(Uuid, String, String, f64, f64)> = sqlx::query_as(
            r#"
            SELECT id, slug, name, latitude, longitude
            FROM places
            WHERE city_id = $1 AND is_active = true
            "#,
        )
        .bind(city_id)
        .fetch_all(pool)
        .await
        .map_err(|e| db_error("Failed to load dedupe candidates", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, slug, name, latitude, longitude)| PlaceCandidate {
                id,
                slug,
                name,
                latitude,
                longitude,
            })
            .collect())
    }

    /// Retrieve active place by ID
    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Place, AtlasError> {
        let sql = format!("{} WHERE p.id = $1 AND p.is_active = true", PLACE_SELECT);
        let row = sqlx::query_as::<_, PlaceRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_error("Database error fetching place", e))?
            .ok_or_else(|| {
                log::warn!("Place not found: {}", id);
                AtlasError::NotFound(format!("place '{}'", id))
            })?;

        Ok(row.into_place())
    }

    /// Retrieve active place by slug
    pub async fn get_by_slug(pool: &PgPool, slug: &str) -> Result<Place, AtlasError> {
        let sql = format!("{} WHERE p.slug = $1 AND p.is_active = true", PLACE_SELECT);
        let row = sqlx::query_as::<_, PlaceRow>(&sql)
            .bind(slug)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_error("Database error fetching place", e))?
            .ok_or_else(|| {
                log::warn!("Place not found: {}", slug);
                AtlasError::NotFound(format!("place '{}'", slug))
            })?;

        Ok(row.into_place())
    }

    /// Search places with filters
    /// DOCUMENTATION: Used for GET /api/places
    /// Returns tuple: (results, total_count) for pagination
    pub async fn search(
        pool: &PgPool,
        query: &SearchQuery,
    ) -> Result<(Vec<Place>, i64), AtlasError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM places p JOIN cities c ON c.id = p.city_id \
             LEFT JOIN countries co ON co.id = c.country_id",
        );
        push_search_filters(&mut count, query);

        let (total,) = count
            .build_query_as::<(i64,)>()
            .fetch_one(pool)
            .await
            .map_err(|e| db_error("Count query error", e))?;

        let mut select = QueryBuilder::<Postgres>::new(PLACE_SELECT);
        push_search_filters(&mut select, query);
        select
            .push(" ORDER BY p.rating DESC NULLS LAST, p.name ASC LIMIT ")
            .push_bind(query.limit())
            .push(" OFFSET ")
            .push_bind(query.offset());

        let rows = select
            .build_query_as::<PlaceRow>()
            .fetch_all(pool)
            .await
            .map_err(|e| db_error("Search query error", e))?;

        let places: Vec<Place> = rows.into_iter().map(PlaceRow::into_place).collect();

        log::info!(
            "Search completed: {} results, {} total (page {})",
            places.len(),
            total,
            query.page()
        );

        Ok((places, total))
    }

    /// Active places inside the bounding box of a circle around `origin`
    /// DOCUMENTATION: Coarse filter; callers apply the exact distance
    pub async fn within_box(
        pool: &PgPool,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Place>, AtlasError> {
        let (lat_delta, lon_delta) = geo::bounding_deltas(latitude, radius_km);
        let sql = format!(
            "{} WHERE p.is_active = true \
               AND p.latitude BETWEEN $1 AND $2 \
               AND p.longitude BETWEEN $3 AND $4 \
               AND ($5::uuid IS NULL OR p.id <> $5)",
            PLACE_SELECT
        );

        let rows = sqlx::query_as::<_, PlaceRow>(&sql)
            .bind(latitude - lat_delta)
            .bind(latitude + lat_delta)
            .bind(longitude - lon_delta)
            .bind(longitude + lon_delta)
            .bind(exclude)
            .fetch_all(pool)
            .await
            .map_err(|e| db_error("Nearby query error", e))?;

        Ok(rows.into_iter().map(PlaceRow::into_place).collect())
    }

    /// Active places for the map, optionally filtered by city slug and type
    pub async fn map_places(
        pool: &PgPool,
        city: Option<&str>,
        place_type: Option<PlaceType>,
    ) -> Result<Vec<Place>, AtlasError> {
        let sql = format!(
            "{} WHERE p.is_active = true \
               AND ($1::text IS NULL OR c.slug = $1) \
               AND ($2::text IS NULL OR p.type = $2) \
             ORDER BY p.name",
            PLACE_SELECT
        );

        let rows = sqlx::query_as::<_, PlaceRow>(&sql)
            .bind(city)
            .bind(place_type.map(|t| t.as_str()))
            .fetch_all(pool)
            .await
            .map_err(|e| db_error("Map query error", e))?;

        Ok(rows.into_iter().map(PlaceRow::into_place).collect())
    }

    /// Active places of a city, best rated first, optionally limited to types
    pub async fn list_in_city(
        pool: &PgPool,
        city_id: Uuid,
        types: &[PlaceType],
    ) -> Result<Vec<Place>, AtlasError> {
        let type_names: Vec<String> = types.iter().map(|t| t.as_str().to_string()).collect();
        let sql = format!(
            "{} WHERE p.is_active = true AND p.city_id = $1 \
               AND (cardinality($2::text[]) = 0 OR p.type = ANY($2)) \
             ORDER BY p.rating DESC NULLS LAST, p.review_count DESC, p.name",
            PLACE_SELECT
        );

        let rows = sqlx::query_as::<_, PlaceRow>(&sql)
            .bind(city_id)
            .bind(&type_names)
            .fetch_all(pool)
            .await
            .map_err(|e| db_error("City places query error", e))?;

        Ok(rows.into_iter().map(PlaceRow::into_place).collect())
    }

    /// Active places that have no image yet, for enrichment
    pub async fn missing_images(
        pool: &PgPool,
        city: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Place>, AtlasError> {
        let sql = format!(
            "{} WHERE p.is_active = true AND p.image_url IS NULL \
               AND ($1::text IS NULL OR c.slug = $1) \
             ORDER BY p.created_at \
             LIMIT $2",
            PLACE_SELECT
        );

        let rows = sqlx::query_as::<_, PlaceRow>(&sql)
            .bind(city)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(|e| db_error("Missing-image query error", e))?;

        Ok(rows.into_iter().map(PlaceRow::into_place).collect())
    }

    pub async fn set_image_url(pool: &PgPool, id: Uuid, url: &str) -> Result<(), AtlasError> {
        sqlx::query("UPDATE places SET image_url = $1, updated_at = NOW() WHERE id = $2")
            .bind(url)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| db_error(&format!("Failed to set image for place {}", id), e))?;
        Ok(())
    }

    /// Update existing place
    /// DOCUMENTATION: Partial update - only provided fields are modified.
    /// The slug stays stable across renames.
    pub async fn update_place(
        pool: &PgPool,
        id: Uuid,
        req: &UpdatePlaceRequest,
    ) -> Result<Place, AtlasError> {
        // Verify place exists
        let _ = Self::get_by_id(pool, id).await?;

        sqlx::query(
            r#"
            UPDATE places
            SET name = COALESCE($1, name),
                type = COALESCE($2, type),
                latitude = COALESCE($3, latitude),
                longitude = COALESCE($4, longitude),
                address = COALESCE($5, address),
                phone = COALESCE($6, phone),
                website = COALESCE($7, website),
                description = COALESCE($8, description),
                short_description = COALESCE($9, short_description),
                amenities = COALESCE($10, amenities),
                dog_policy = COALESCE($11, dog_policy),
                image_url = COALESCE($12, image_url),
                is_verified = COALESCE($13, is_verified),
                updated_at = NOW()
            WHERE id = $14
            "#,
        )
        .bind(&req.name)
        .bind(req.place_type.map(|t| t.as_str()))
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(&req.address)
        .bind(&req.phone)
        .bind(&req.website)
        .bind(&req.description)
        .bind(&req.short_description)
        .bind(&req.amenities)
        .bind(&req.dog_policy)
        .bind(&req.image_url)
        .bind(req.is_verified)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| db_error(&format!("Update failed for place {}", id), e))?;

        let place = Self::get_by_id(pool, id).await?;

        log::info!("Updated place: {}", id);
        Ok(place)
    }

    /// Soft delete place
    /// DOCUMENTATION: Sets is_active=false instead of physical deletion
    pub async fn delete_place(pool: &PgPool, id: Uuid) -> Result<(), AtlasError> {
        let rows = sqlx::query(
            "UPDATE places SET is_active = false, updated_at = NOW() WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| db_error(&format!("Delete failed for place {}", id), e))?
        .rows_affected();

        if rows == 0 {
            return Err(AtlasError::NotFound(format!("place '{}'", id)));
        }

        log::info!("Deleted place: {}", id);
        Ok(())
    }

    /// Recompute rating and review_count from the reviews table
    /// DOCUMENTATION: The place row is locked so concurrent review writes
    /// apply their recomputes one after another
    pub async fn refresh_rating(pool: &PgPool, id: Uuid) -> Result<RatingSummary, AtlasError> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to open transaction", e))?;

        sqlx::query("SELECT id FROM places WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error(&format!("Failed to lock place {}", id), e))?
            .ok_or_else(|| AtlasError::NotFound(format!("place '{}'", id)))?;

        let ratings: Vec<i16> = sqlx::query_scalar("SELECT rating FROM reviews WHERE place_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| db_error(&format!("Failed to load ratings of place {}", id), e))?;

        let summary = RatingSummary::from_ratings(&ratings);

        sqlx::query(
            "UPDATE places SET rating = $1, review_count = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(summary.rating)
        .bind(summary.review_count)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error(&format!("Failed to refresh rating of place {}", id), e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit rating refresh", e))?;

        log::debug!(
            "Place {} rating {:?} over {} reviews",
            id,
            summary.rating,
            summary.review_count
        );
        Ok(summary)
    }

    /// Active place counts per type
    pub async fn count_by_type(pool: &PgPool) -> Result<Vec<(String, i64)>, AtlasError> {
        sqlx::query_as(
            "SELECT type, COUNT(*) FROM places WHERE is_active = true GROUP BY type ORDER BY type",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| db_error("Failed to count places by type", e))
    }

    /// Totals for the admin dashboard: (active, inactive, verified, with image)
    pub async fn totals(pool: &PgPool) -> Result<(i64, i64, i64, i64), AtlasError> {
        sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE is_active),
                COUNT(*) FILTER (WHERE NOT is_active),
                COUNT(*) FILTER (WHERE is_active AND is_verified),
                COUNT(*) FILTER (WHERE is_active AND image_url IS NOT NULL)
            FROM places
            "#,
        )
        .fetch_one(pool)
        .await
        .map_err(|e| db_error("Failed to count places", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_like_metacharacters() {
        assert_eq!(contains_pattern("bark"), "%bark%");
        assert_eq!(contains_pattern("100%_dog"), r"%100\%\_dog%");
        assert_eq!(contains_pattern(r"paws\"), r"%paws\\%");
        assert_eq!(contains_pattern(r"a\%b"), r"%a\\\%b%");
    }
}
