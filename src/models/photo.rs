// src/models/photo.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Place photo from an enrichment provider or an admin upload
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Photo {
    pub id: Uuid,
    pub place_id: Uuid,
    pub url: String,
    pub thumbnail_url: Option<String>,
    /// Provider name: unsplash, pexels, wikimedia, google, manual
    pub source: String,
    /// Provider-side identifier, unique per source
    pub source_ref: String,
    pub attribution: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub is_primary: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Request to create a new photo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePhotoRequest {
    pub place_id: Uuid,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub source: String,
    pub source_ref: String,
    pub attribution: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub is_primary: bool,
    pub display_order: i32,
}

/// Body of POST /api/admin/places/{id}/photos
#[derive(Debug, Deserialize, Validate)]
pub struct AddPhotoRequest {
    #[validate(url)]
    pub url: String,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
    pub attribution: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// Photo DTO for API responses
#[derive(Debug, Clone, Serialize)]
pub struct PhotoResponse {
    pub id: Uuid,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub source: String,
    pub attribution: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub is_primary: bool,
}

impl Photo {
    pub fn to_response(&self) -> PhotoResponse {
        PhotoResponse {
            id: self.id,
            url: self.url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            source: self.source.clone(),
            attribution: self.attribution.clone(),
            width: self.width,
            height: self.height,
            is_primary: self.is_primary,
        }
    }
}
