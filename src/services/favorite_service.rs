// src/services/favorite_service.rs
// DOCUMENTATION: Per-user saved places
// PURPOSE: Idempotent add/remove/toggle over the favorites table

use crate::db::{FavoriteRepository, PlaceRepository};
use crate::errors::AtlasError;
use crate::models::{FavoriteResponse, FavoriteState};
use sqlx::PgPool;
use uuid::Uuid;

pub struct FavoriteService;

impl FavoriteService {
    /// Favorites of a user, newest first; inactive places are skipped
    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<FavoriteResponse>, AtlasError> {
        let entries = FavoriteRepository::list_for_user(pool, user_id).await?;

        let mut favorites = Vec::with_capacity(entries.len());
        for (place_id, favorited_at) in entries {
            match PlaceRepository::get_by_id(pool, place_id).await {
                Ok(place) => favorites.push(FavoriteResponse {
                    favorited_at,
                    place: place.to_response(),
                }),
                Err(AtlasError::NotFound(_)) => {
                    log::debug!("Favorite {} no longer active, skipped", place_id)
                }
                Err(e) => return Err(e),
            }
        }

        Ok(favorites)
    }

    pub async fn add(pool: &PgPool, user_id: Uuid, place_id: Uuid) -> Result<FavoriteState, AtlasError> {
        PlaceRepository::get_by_id(pool, place_id).await?;
        FavoriteRepository::add(pool, user_id, place_id).await?;
        Ok(FavoriteState {
            place_id,
            favorited: true,
        })
    }

    /// Removing a place that is not a favorite is not an error
    pub async fn remove(
        pool: &PgPool,
        user_id: Uuid,
        place_id: Uuid,
    ) -> Result<FavoriteState, AtlasError> {
        let removed = FavoriteRepository::remove(pool, user_id, place_id).await?;
        log::debug!("Favorite {} for user {} removed: {}", place_id, user_id, removed);
        Ok(FavoriteState {
            place_id,
            favorited: false,
        })
    }

    pub async fn toggle(
        pool: &PgPool,
        user_id: Uuid,
        place_id: Uuid,
    ) -> Result<FavoriteState, AtlasError> {
        if FavoriteRepository::exists(pool, user_id, place_id).await? {
            Self::remove(pool, user_id, place_id).await
        } else {
            Self::add(pool, user_id, place_id).await
        }
    }
}
