// src/services/admin_service.rs
// DOCUMENTATION: Catalogue statistics for the admin dashboard

use crate::db::{CityRepository, IngestJobRepository, PlaceRepository, ReviewRepository, UserRepository};
use crate::errors::AtlasError;
use crate::services::{CacheStats, SearchCache};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct PlaceTotals {
    pub active: i64,
    pub inactive: i64,
    pub verified: i64,
    pub with_image: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub places: PlaceTotals,
    pub places_by_type: BTreeMap<String, i64>,
    pub places_by_country: BTreeMap<String, i64>,
    pub countries: i64,
    pub cities: i64,
    pub reviews: i64,
    pub users: i64,
    pub pending_ingest_jobs: i64,
    pub search_cache: CacheStats,
}

pub struct AdminService;

impl AdminService {
    pub async fn stats(pool: &PgPool, cache: &SearchCache) -> Result<AdminStats, AtlasError> {
        let (active, inactive, verified, with_image) = PlaceRepository::totals(pool).await?;
        let (countries, cities) = CityRepository::totals(pool).await?;

        Ok(AdminStats {
            places: PlaceTotals {
                active,
                inactive,
                verified,
                with_image,
            },
            places_by_type: PlaceRepository::count_by_type(pool).await?.into_iter().collect(),
            places_by_country: CityRepository::place_counts_by_country(pool)
                .await?
                .into_iter()
                .collect(),
            countries,
            cities,
            reviews: ReviewRepository::count_all(pool).await?,
            users: UserRepository::count_all(pool).await?,
            pending_ingest_jobs: IngestJobRepository::count_pending(pool).await?,
            search_cache: cache.stats().await,
        })
    }
}
