// src/models/favorite.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::PlaceResponse;

/// A favorited place with the time it was saved
#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub favorited_at: DateTime<Utc>,
    pub place: PlaceResponse,
}

/// Result of add/remove/toggle operations
#[derive(Debug, Serialize)]
pub struct FavoriteState {
    pub place_id: Uuid,
    pub favorited: bool,
}
