// src/models/place.rs
// DOCUMENTATION: Core data structures for places
// PURPOSE: Defines all serialization/deserialization models for API and database

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unidecode::unidecode;
use uuid::Uuid;
use validator::Validate;

use super::{CitySummary, PhotoResponse, ReviewResponse};

/// Kind of dog-friendly venue
/// DOCUMENTATION: Stored as snake_case text, constrained by a CHECK in the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceType {
    Park,
    DogPark,
    Beach,
    Trail,
    Cafe,
    Restaurant,
    Bar,
    Hotel,
    Vet,
    PetStore,
    Groomer,
    Daycare,
    Other,
}

impl PlaceType {
    pub const ALL: [PlaceType; 13] = [
        PlaceType::Park,
        PlaceType::DogPark,
        PlaceType::Beach,
        PlaceType::Trail,
        PlaceType::Cafe,
        PlaceType::Restaurant,
        PlaceType::Bar,
        PlaceType::Hotel,
        PlaceType::Vet,
        PlaceType::PetStore,
        PlaceType::Groomer,
        PlaceType::Daycare,
        PlaceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceType::Park => "park",
            PlaceType::DogPark => "dog_park",
            PlaceType::Beach => "beach",
            PlaceType::Trail => "trail",
            PlaceType::Cafe => "cafe",
            PlaceType::Restaurant => "restaurant",
            PlaceType::Bar => "bar",
            PlaceType::Hotel => "hotel",
            PlaceType::Vet => "vet",
            PlaceType::PetStore => "pet_store",
            PlaceType::Groomer => "groomer",
            PlaceType::Daycare => "daycare",
            PlaceType::Other => "other",
        }
    }

    /// Outdoor spots are scheduled in the morning by the itinerary planner
    pub fn is_outdoor(&self) -> bool {
        matches!(
            self,
            PlaceType::Park | PlaceType::DogPark | PlaceType::Beach | PlaceType::Trail
        )
    }

    /// Places that serve food or drink
    pub fn is_food(&self) -> bool {
        matches!(self, PlaceType::Cafe | PlaceType::Restaurant | PlaceType::Bar)
    }

    /// Comma-separated list of accepted values, used in validation messages
    pub fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PlaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaceType {
    type Err = String;

    /// Case- and accent-insensitive; spaces and dashes are treated as underscores
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = unidecode(raw.trim())
            .to_lowercase()
            .replace([' ', '-'], "_");

        let place_type = match normalized.as_str() {
            "park" | "parks" | "garden" => PlaceType::Park,
            "dog_park" | "dogpark" | "off_leash" | "off_leash_area" => PlaceType::DogPark,
            "beach" | "dog_beach" => PlaceType::Beach,
            "trail" | "hiking" | "hike" | "walk" => PlaceType::Trail,
            "cafe" | "coffee" | "coffee_shop" => PlaceType::Cafe,
            "restaurant" | "food" => PlaceType::Restaurant,
            "bar" | "pub" | "brewery" => PlaceType::Bar,
            "hotel" | "accommodation" | "lodging" | "hostel" => PlaceType::Hotel,
            "vet" | "veterinary" | "veterinarian" | "clinic" => PlaceType::Vet,
            "pet_store" | "pet_shop" | "petshop" | "shop" | "store" => PlaceType::PetStore,
            "groomer" | "grooming" => PlaceType::Groomer,
            "daycare" | "dog_daycare" | "boarding" => PlaceType::Daycare,
            "other" => PlaceType::Other,
            _ => {
                return Err(format!(
                    "unknown place type '{}' (allowed: {})",
                    raw.trim(),
                    Self::allowed_values()
                ))
            }
        };

        Ok(place_type)
    }
}

/// Represents a complete place record from the database
/// DOCUMENTATION: Built from the places table joined with its city and country
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub name: String,
    /// Unique key used by ingest upserts and public URLs
    pub slug: String,
    #[serde(rename = "type")]
    pub place_type: PlaceType,
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
    /// Mean review rating (0-5), seeded from import data until reviews exist
    pub rating: Option<f32>,
    pub review_count: i32,
    pub image_url: Option<String>,
    pub is_verified: bool,
    /// Soft delete flag
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a new place
/// DOCUMENTATION: Data transfer object for POST /api/places
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CreatePlaceRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(rename = "type")]
    pub place_type: PlaceType,

    /// City slug; the city must already exist
    #[validate(length(min = 1))]
    pub city: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[validate(url)]
    #[serde(default)]
    pub website: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub short_description: Option<String>,

    #[serde(default)]
    pub amenities: Vec<String>,

    #[serde(default)]
    pub dog_policy: Option<String>,

    #[validate(range(min = 0.0, max = 5.0))]
    #[serde(default)]
    pub rating: Option<f32>,

    #[validate(url)]
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Request DTO for updating an existing place
/// DOCUMENTATION: All fields are optional - only provided fields are updated
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePlaceRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub place_type: Option<PlaceType>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    pub address: Option<String>,
    pub phone: Option<String>,

    #[validate(url)]
    pub website: Option<String>,

    pub description: Option<String>,
    pub short_description: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub dog_policy: Option<String>,

    #[validate(url)]
    pub image_url: Option<String>,

    pub is_verified: Option<bool>,
}

/// Response DTO for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub place_type: PlaceType,
    pub city: String,
    pub city_slug: String,
    pub country: Option<String>,
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
    /// Distance from the query point, when the request carried coordinates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Detailed response DTO
/// DOCUMENTATION: Used for GET /api/places/{slug}
#[derive(Debug, Serialize)]
pub struct PlaceDetailResponse {
    #[serde(flatten)]
    pub place: PlaceResponse,
    pub city_info: CitySummary,
    pub photos: Vec<PhotoResponse>,
    pub reviews: Vec<ReviewResponse>,
}

/// Search query parameters
/// DOCUMENTATION: DTO for parsing query string in GET /api/places
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SearchQuery {
    /// Free-text match on name and description
    pub q: Option<String>,

    /// City slug
    pub city: Option<String>,

    /// Country slug
    pub country: Option<String>,

    #[serde(rename = "type")]
    pub place_type: Option<PlaceType>,

    pub min_rating: Option<f32>,

    /// Required amenity (exact match)
    pub amenity: Option<String>,

    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_km: Option<f64>,

    /// Page number (1-based)
    pub page: Option<i64>,

    /// Results per page (max 100)
    pub limit: Option<i64>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

impl SearchQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Whether rows remain past the current page
    pub fn has_more(&self, total_count: i64) -> bool {
        total_count > self.page().saturating_mul(self.limit())
    }

    /// Origin point and radius, only when all three are present
    pub fn proximity(&self) -> Option<(f64, f64, f64)> {
        match (self.lat, self.lon, self.radius_km) {
            (Some(lat), Some(lon), Some(radius)) if radius > 0.0 => Some((lat, lon, radius)),
            _ => None,
        }
    }

    /// Normalized cache key; equivalent queries map to the same key
    pub fn cache_key(&self) -> String {
        format!(
            "places:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
            self.q.as_deref().map(|q| q.trim().to_lowercase()).unwrap_or_default(),
            self.city.as_deref().unwrap_or(""),
            self.country.as_deref().unwrap_or(""),
            self.place_type.map(|t| t.as_str()).unwrap_or("all"),
            self.min_rating.map(|r| r.to_string()).unwrap_or_default(),
            self.amenity.as_deref().unwrap_or(""),
            self.lat.map(|v| (v * 10000.0).round() as i64).unwrap_or_default(),
            self.lon.map(|v| (v * 10000.0).round() as i64).unwrap_or_default(),
            self.radius_km.map(|r| r.to_string()).unwrap_or_default(),
            self.page(),
            self.limit(),
        )
    }
}

/// Paginated search response
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub data: Vec<PlaceResponse>,
    pub total_count: i64,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

/// Query for GET /api/places/{id}/nearby
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub radius_km: Option<f64>,
    pub limit: Option<i64>,
}

/// Query for GET /api/places/geojson
#[derive(Debug, Deserialize)]
pub struct MapQuery {
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub place_type: Option<PlaceType>,
}

/// Column values written by inserts and upserts
/// DOCUMENTATION: Shared by admin create and CSV ingest
#[derive(Debug, Clone)]
pub struct NewPlace {
    pub name: String,
    pub slug: String,
    pub place_type: PlaceType,
    pub city_id: Uuid,
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
    pub image_url: Option<String>,
}

impl CreatePlaceRequest {
    pub fn into_new_place(self, slug: String, city_id: Uuid) -> NewPlace {
        NewPlace {
            name: self.name.trim().to_string(),
            slug,
            place_type: self.place_type,
            city_id,
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
            image_url: self.image_url,
        }
    }
}

impl Place {
    /// Convert Place to PlaceResponse for API
    pub fn to_response(&self) -> PlaceResponse {
        PlaceResponse {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            place_type: self.place_type,
            city: self.city_name.clone(),
            city_slug: self.city_slug.clone(),
            country: self.country_name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.address.clone(),
            phone: self.phone.clone(),
            website: self.website.clone(),
            description: self.description.clone(),
            short_description: self.short_description.clone(),
            amenities: self.amenities.clone(),
            dog_policy: self.dog_policy.clone(),
            rating: self.rating,
            review_count: self.review_count,
            image_url: self.image_url.clone(),
            is_verified: self.is_verified,
            distance_km: None,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_type_aliases() {
        assert_eq!("Café".parse::<PlaceType>().unwrap(), PlaceType::Cafe);
        assert_eq!("dog-park".parse::<PlaceType>().unwrap(), PlaceType::DogPark);
        assert_eq!("Pet Shop".parse::<PlaceType>().unwrap(), PlaceType::PetStore);
        assert_eq!("VETERINARY".parse::<PlaceType>().unwrap(), PlaceType::Vet);
        assert_eq!(" hotel ".parse::<PlaceType>().unwrap(), PlaceType::Hotel);
    }

    #[test]
    fn test_place_type_unknown_lists_allowed_values() {
        let err = "spaceport".parse::<PlaceType>().unwrap_err();
        assert!(err.contains("spaceport"));
        assert!(err.contains("dog_park"));
    }

    #[test]
    fn test_place_type_roundtrips_its_own_name() {
        for t in PlaceType::ALL {
            assert_eq!(t.as_str().parse::<PlaceType>().unwrap(), t);
        }
    }

    #[test]
    fn test_place_type_serde_is_snake_case() {
        let json = serde_json::to_string(&PlaceType::PetStore).unwrap();
        assert_eq!(json, "\"pet_store\"");
    }

    #[test]
    fn test_search_query_pagination_bounds() {
        let query = SearchQuery {
            page: Some(0),
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), MAX_PAGE_SIZE);
        assert_eq!(query.offset(), 0);

        let query = SearchQuery {
            page: Some(3),
            limit: Some(10),
            ..Default::default()
        };
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn test_search_query_huge_page_saturates() {
        let query = SearchQuery {
            page: Some(i64::MAX),
            limit: Some(20),
            ..Default::default()
        };
        assert_eq!(query.offset(), i64::MAX);
        assert!(!query.has_more(1_000));

        let query = SearchQuery {
            page: Some(2),
            limit: Some(20),
            ..Default::default()
        };
        assert!(query.has_more(41));
        assert!(!query.has_more(40));
    }

    #[test]
    fn test_cache_key_normalizes_text() {
        let a = SearchQuery {
            q: Some("  Dog Beach ".into()),
            ..Default::default()
        };
        let b = SearchQuery {
            q: Some("dog beach".into()),
            ..Default::default()
        };
        assert_eq!(a.cache_key(), b.cache_key());

        let c = SearchQuery {
            q: Some("dog beach".into()),
            page: Some(2),
            ..Default::default()
        };
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_proximity_requires_all_parts() {
        let mut query = SearchQuery {
            lat: Some(41.38),
            lon: Some(2.17),
            ..Default::default()
        };
        assert!(query.proximity().is_none());
        query.radius_km = Some(2.0);
        assert_eq!(query.proximity(), Some((41.38, 2.17, 2.0)));
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreatePlaceRequest {
            name: "Parc de la Ciutadella".into(),
            place_type: PlaceType::Park,
            city: "barcelona".into(),
            latitude: 95.0,
            longitude: 2.18,
            address: None,
            phone: None,
            website: Some("not a url".into()),
            description: None,
            short_description: None,
            amenities: vec![],
            dog_policy: None,
            rating: None,
            image_url: None,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("latitude"));
        assert!(fields.contains_key("website"));
    }
}
