// src/services/place_service.rs
// DOCUMENTATION: Business logic for places
// PURPOSE: Intermediary between handlers and repositories, handles caching,
// slugs and distances

use crate::db::{CityRepository, PhotoRepository, PlaceRepository, ReviewRepository};
use crate::errors::AtlasError;
use crate::ingest::place_slug;
use crate::models::{
    CreatePlaceRequest, MapQuery, NearbyQuery, Place, PlaceDetailResponse, PlaceResponse,
    SearchQuery, SearchResponse, UpdatePlaceRequest,
};
use crate::services::geo;
use crate::services::SearchCache;
use geojson::FeatureCollection;
use sqlx::PgPool;
use uuid::Uuid;

/// Reviews embedded in a place detail response
const DETAIL_REVIEW_LIMIT: i64 = 10;

const DEFAULT_NEARBY_RADIUS_KM: f64 = 5.0;
const MAX_NEARBY_RADIUS_KM: f64 = 50.0;
const DEFAULT_NEARBY_LIMIT: i64 = 10;
const MAX_NEARBY_LIMIT: i64 = 50;

pub struct PlaceService;

impl PlaceService {
    /// Search places, serving repeated queries from the cache
    pub async fn search_places(
        pool: &PgPool,
        cache: &SearchCache,
        query: SearchQuery,
    ) -> Result<SearchResponse, AtlasError> {
        if let Some((lat, lon, _)) = query.proximity() {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(AtlasError::InvalidInput(
                    "lat/lon are out of range".to_string(),
                ));
            }
        }

        let key = query.cache_key();
        if let Some(cached) = cache.get(&key).await {
            match serde_json::from_str::<SearchResponse>(&cached) {
                Ok(response) => return Ok(response),
                Err(e) => log::warn!("Discarding unreadable cache entry {}: {}", key, e),
            }
        }

        let (places, total_count) = PlaceRepository::search(pool, &query).await?;

        let origin = query.proximity().map(|(lat, lon, _)| geo::point(lat, lon));
        let data = places
            .iter()
            .map(|p| {
                let mut response = p.to_response();
                response.distance_km = origin.map(|o| {
                    round_km(geo::haversine_km(o, geo::point(p.latitude, p.longitude)))
                });
                response
            })
            .collect();

        let page = query.page();
        let limit = query.limit();
        let response = SearchResponse {
            data,
            total_count,
            page,
            limit,
            has_more: query.has_more(total_count),
        };

        match serde_json::to_string(&response) {
            Ok(json) => cache.set(key, json).await,
            Err(e) => log::warn!("Search response not cached: {}", e),
        }

        Ok(response)
    }

    /// Resolve a place by UUID or slug
    pub async fn find_place(pool: &PgPool, identifier: &str) -> Result<Place, AtlasError> {
        match Uuid::parse_str(identifier) {
            Ok(id) => PlaceRepository::get_by_id(pool, id).await,
            Err(_) => PlaceRepository::get_by_slug(pool, identifier).await,
        }
    }

    /// Place detail with city, photos and latest reviews
    pub async fn get_place(
        pool: &PgPool,
        identifier: &str,
    ) -> Result<PlaceDetailResponse, AtlasError> {
        let place = Self::find_place(pool, identifier).await?;
        let city = CityRepository::get_city_by_id(pool, place.city_id).await?;
        let photos = PhotoRepository::get_photos_by_place(pool, place.id).await?;
        let reviews =
            ReviewRepository::get_reviews_by_place(pool, place.id, DETAIL_REVIEW_LIMIT).await?;

        Ok(PlaceDetailResponse {
            place: place.to_response(),
            city_info: city.summary(),
            photos: photos.iter().map(|p| p.to_response()).collect(),
            reviews: reviews.iter().map(|r| r.to_response()).collect(),
        })
    }

    /// Other active places around a place, closest first
    pub async fn nearby(
        pool: &PgPool,
        id: Uuid,
        query: NearbyQuery,
    ) -> Result<Vec<PlaceResponse>, AtlasError> {
        let radius_km = query
            .radius_km
            .unwrap_or(DEFAULT_NEARBY_RADIUS_KM)
            .clamp(0.1, MAX_NEARBY_RADIUS_KM);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_NEARBY_LIMIT)
            .clamp(1, MAX_NEARBY_LIMIT) as usize;

        let place = PlaceRepository::get_by_id(pool, id).await?;
        let candidates =
            PlaceRepository::within_box(pool, place.latitude, place.longitude, radius_km, Some(id))
                .await?;

        Ok(rank_by_distance(&place, candidates, radius_km, limit))
    }

    /// GeoJSON feed for the map
    pub async fn geojson(pool: &PgPool, query: MapQuery) -> Result<FeatureCollection, AtlasError> {
        let places =
            PlaceRepository::map_places(pool, query.city.as_deref(), query.place_type).await?;
        Ok(geo::places_to_geojson(&places))
    }

    /// Create a new place in an existing city
    pub async fn create_place(
        pool: &PgPool,
        cache: &SearchCache,
        req: CreatePlaceRequest,
    ) -> Result<PlaceResponse, AtlasError> {
        let city = CityRepository::get_city_by_slug(pool, req.city.trim()).await?;
        let slug = place_slug(&req.name, &city.name);
        if slug.is_empty() {
            return Err(AtlasError::ValidationError(
                "name must contain at least one letter or digit".to_string(),
            ));
        }

        let place = PlaceRepository::create_place(pool, &req.into_new_place(slug, city.id)).await?;
        cache.clear().await;
        Ok(place.to_response())
    }

    /// Update a place
    pub async fn update_place(
        pool: &PgPool,
        cache: &SearchCache,
        id: Uuid,
        req: UpdatePlaceRequest,
    ) -> Result<PlaceResponse, AtlasError> {
        let place = PlaceRepository::update_place(pool, id, &req).await?;
        cache.clear().await;
        Ok(place.to_response())
    }

    /// Delete a place
    pub async fn delete_place(
        pool: &PgPool,
        cache: &SearchCache,
        id: Uuid,
    ) -> Result<(), AtlasError> {
        PlaceRepository::delete_place(pool, id).await?;
        cache.clear().await;
        Ok(())
    }
}

fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Exact-distance filter and ordering applied after the bounding-box query
fn rank_by_distance(
    origin: &Place,
    candidates: Vec<Place>,
    radius_km: f64,
    limit: usize,
) -> Vec<PlaceResponse> {
    let center = geo::point(origin.latitude, origin.longitude);

    let mut ranked: Vec<(f64, Place)> = candidates
        .into_iter()
        .filter(|p| p.id != origin.id)
        .map(|p| (geo::haversine_km(center, geo::point(p.latitude, p.longitude)), p))
        .filter(|(d, _)| *d <= radius_km)
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    ranked
        .into_iter()
        .take(limit)
        .map(|(d, p)| {
            let mut response = p.to_response();
            response.distance_km = Some(round_km(d));
            response
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlaceType;
    use chrono::Utc;

    fn place(name: &str, lat: f64, lng: f64) -> Place {
        Place {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: place_slug(name, "Berlin"),
            place_type: PlaceType::Park,
            city_id: Uuid::nil(),
            city_name: "Berlin".into(),
            city_slug: "berlin".into(),
            country_name: Some("Germany".into()),
            latitude: lat,
            longitude: lng,
            address: None,
            phone: None,
            website: None,
            description: None,
            short_description: None,
            amenities: vec![],
            dog_policy: None,
            rating: None,
            review_count: 0,
            image_url: None,
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_rank_by_distance_orders_and_filters() {
        let origin = place("Tiergarten", 52.5145, 13.3501);
        let near = place("Near", 52.5160, 13.3501);
        let mid = place("Mid", 52.5250, 13.3501);
        let far = place("Far", 52.6500, 13.3501);

        let ranked = rank_by_distance(
            &origin,
            vec![far, mid, origin.clone(), near],
            5.0,
            10,
        );
        let names: Vec<&str> = ranked.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Near", "Mid"]);
        assert!(ranked[0].distance_km.unwrap() < ranked[1].distance_km.unwrap());
    }

    #[test]
    fn test_rank_by_distance_respects_limit() {
        let origin = place("Origin", 52.5, 13.4);
        let others: Vec<Place> = (1..=5)
            .map(|i| place(&format!("P{}", i), 52.5 + i as f64 * 0.001, 13.4))
            .collect();
        let ranked = rank_by_distance(&origin, others, 10.0, 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].name, "P1");
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(1.23456), 1.23);
    }
}
