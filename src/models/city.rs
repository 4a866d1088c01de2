// src/models/city.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Country {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    /// ISO 3166-1 alpha-2 code, when known
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// City row joined with its country name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct City {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub country_id: Option<Uuid>,
    pub country_name: Option<String>,
    pub country_slug: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact city reference embedded in place detail responses
#[derive(Debug, Clone, Serialize)]
pub struct CitySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub country: Option<String>,
    pub country_slug: Option<String>,
}

/// City listing entry with its number of active places
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CityWithCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub country_name: Option<String>,
    pub country_slug: Option<String>,
    pub image_url: Option<String>,
    pub place_count: i64,
}

#[derive(Debug, Serialize)]
pub struct CityDetailResponse {
    #[serde(flatten)]
    pub city: City,
    pub place_count: i64,
    /// Active places per place type
    pub places_by_type: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct CountryDetailResponse {
    #[serde(flatten)]
    pub country: Country,
    pub cities: Vec<CityWithCount>,
}

impl City {
    pub fn summary(&self) -> CitySummary {
        CitySummary {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            country: self.country_name.clone(),
            country_slug: self.country_slug.clone(),
        }
    }
}
