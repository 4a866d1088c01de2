// src/services/photo_service.rs
// DOCUMENTATION: Place photo gallery
// PURPOSE: List photos, attach manual photos and switch the primary one

use crate::db::{PhotoRepository, PlaceRepository};
use crate::errors::AtlasError;
use crate::models::{AddPhotoRequest, CreatePhotoRequest, PhotoResponse};
use crate::services::SearchCache;
use sqlx::PgPool;
use uuid::Uuid;

pub const MANUAL_SOURCE: &str = "manual";

pub struct PhotoService;

impl PhotoService {
    pub async fn list(pool: &PgPool, place_id: Uuid) -> Result<Vec<PhotoResponse>, AtlasError> {
        PlaceRepository::get_by_id(pool, place_id).await?;
        let photos = PhotoRepository::get_photos_by_place(pool, place_id).await?;
        Ok(photos.iter().map(|p| p.to_response()).collect())
    }

    /// Attach an admin-supplied photo
    /// DOCUMENTATION: The first photo of a place becomes primary automatically
    pub async fn add(
        pool: &PgPool,
        cache: &SearchCache,
        place_id: Uuid,
        req: AddPhotoRequest,
    ) -> Result<PhotoResponse, AtlasError> {
        let place = PlaceRepository::get_by_id(pool, place_id).await?;
        let display_order = PhotoRepository::next_display_order(pool, place_id).await?;
        let make_primary = req.is_primary || (display_order == 0 && place.image_url.is_none());

        let photo = PhotoRepository::create_photo(
            pool,
            &CreatePhotoRequest {
                place_id,
                source_ref: req.url.clone(),
                url: req.url,
                thumbnail_url: req.thumbnail_url,
                source: MANUAL_SOURCE.to_string(),
                attribution: req.attribution,
                width: None,
                height: None,
                is_primary: false,
                display_order,
            },
        )
        .await?;

        let photo = if make_primary {
            let primary = PhotoRepository::set_primary_photo(pool, place_id, photo.id).await?;
            cache.clear().await;
            primary
        } else {
            photo
        };

        log::info!("Added photo {} to place {}", photo.id, place_id);
        Ok(photo.to_response())
    }

    pub async fn set_primary(
        pool: &PgPool,
        cache: &SearchCache,
        place_id: Uuid,
        photo_id: Uuid,
    ) -> Result<PhotoResponse, AtlasError> {
        PlaceRepository::get_by_id(pool, place_id).await?;
        let photo = PhotoRepository::set_primary_photo(pool, place_id, photo_id).await?;
        cache.clear().await;
        Ok(photo.to_response())
    }
}
