// src/services/city_service.rs
// DOCUMENTATION: Country and city listings
// PURPOSE: Assemble geography responses with place counts

use crate::db::CityRepository;
use crate::errors::AtlasError;
use crate::models::{CityDetailResponse, CityWithCount, Country, CountryDetailResponse};
use sqlx::PgPool;
use std::collections::BTreeMap;

pub struct CityService;

impl CityService {
    pub async fn list_countries(pool: &PgPool) -> Result<Vec<Country>, AtlasError> {
        CityRepository::list_countries(pool).await
    }

    pub async fn get_country(pool: &PgPool, slug: &str) -> Result<CountryDetailResponse, AtlasError> {
        let country = CityRepository::get_country_by_slug(pool, slug).await?;
        let cities = CityRepository::list_cities(pool, Some(&country.slug)).await?;
        Ok(CountryDetailResponse { country, cities })
    }

    pub async fn list_cities(
        pool: &PgPool,
        country: Option<&str>,
    ) -> Result<Vec<CityWithCount>, AtlasError> {
        CityRepository::list_cities(pool, country).await
    }

    pub async fn get_city(pool: &PgPool, slug: &str) -> Result<CityDetailResponse, AtlasError> {
        let city = CityRepository::get_city_by_slug(pool, slug).await?;
        let counts = CityRepository::place_counts_by_type(pool, city.id).await?;
        let places_by_type: BTreeMap<String, i64> = counts.into_iter().collect();
        let place_count = places_by_type.values().sum();

        Ok(CityDetailResponse {
            city,
            place_count,
            places_by_type,
        })
    }
}
