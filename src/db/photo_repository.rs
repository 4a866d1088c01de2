// src/db/photo_repository.rs
// DOCUMENTATION: Photo database operations
// PURPOSE: Handle CRUD operations for place photos

use crate::errors::AtlasError;
use crate::models::{CreatePhotoRequest, Photo};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PhotoRepository;

impl PhotoRepository {
    /// Create a new photo
    /// DOCUMENTATION: Insert photo from any source (Unsplash, Pexels, Wikimedia,
    /// Google, manual); the same provider photo is updated instead of duplicated
    pub async fn create_photo(
        pool: &PgPool,
        req: &CreatePhotoRequest,
    ) -> Result<Photo, AtlasError> {
        let photo = sqlx::query_as::<_, Photo>(
            r#"
            INSERT INTO place_photos (
                place_id, url, thumbnail_url, source, source_ref,
                attribution, width, height, is_primary, display_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source, source_ref) DO UPDATE
            SET url = EXCLUDED.url,
                thumbnail_url = COALESCE(EXCLUDED.thumbnail_url, place_photos.thumbnail_url),
                width = COALESCE(EXCLUDED.width, place_photos.width),
                height = COALESCE(EXCLUDED.height, place_photos.height),
                attribution = COALESCE(EXCLUDED.attribution, place_photos.attribution),
                is_primary = EXCLUDED.is_primary OR place_photos.is_primary
            RETURNING *
            "#,
        )
        .bind(req.place_id)
        .bind(&req.url)
        .bind(&req.thumbnail_url)
        .bind(&req.source)
        .bind(&req.source_ref)
        .bind(&req.attribution)
        .bind(req.width)
        .bind(req.height)
        .bind(req.is_primary)
        .bind(req.display_order)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to create photo: {}", e);
            AtlasError::DatabaseError(format!("Create photo failed: {}", e))
        })?;

        Ok(photo)
    }

    /// Get photos for a place
    /// DOCUMENTATION: Primary first, then by display_order
    pub async fn get_photos_by_place(
        pool: &PgPool,
        place_id: Uuid,
    ) -> Result<Vec<Photo>, AtlasError> {
        let photos = sqlx::query_as::<_, Photo>(
            r#"
            SELECT * FROM place_photos
            WHERE place_id = $1
            ORDER BY is_primary DESC, display_order ASC, created_at ASC
            "#,
        )
        .bind(place_id)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to fetch photos for place {}: {}", place_id, e);
            AtlasError::DatabaseError(format!("Fetch photos failed: {}", e))
        })?;

        Ok(photos)
    }

    /// Next display_order slot for a place
    pub async fn next_display_order(pool: &PgPool, place_id: Uuid) -> Result<i32, AtlasError> {
        let (next,): (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(display_order) + 1, 0) FROM place_photos WHERE place_id = $1",
        )
        .bind(place_id)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to read photo order for place {}: {}", place_id, e);
            AtlasError::DatabaseError(format!("Read photo order failed: {}", e))
        })?;

        Ok(next)
    }

    /// Set primary photo
    /// DOCUMENTATION: Mark a specific photo as primary (unsets other primaries
    /// for the place) and mirror its URL into places.image_url
    pub async fn set_primary_photo(
        pool: &PgPool,
        place_id: Uuid,
        photo_id: Uuid,
    ) -> Result<Photo, AtlasError> {
        let mut tx = pool.begin().await.map_err(|e| {
            log::error!("Failed to open transaction: {}", e);
            AtlasError::DatabaseError(e.to_string())
        })?;

        // First, unset all primaries for this place
        sqlx::query("UPDATE place_photos SET is_primary = FALSE WHERE place_id = $1")
            .bind(place_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                log::error!("Failed to unset primary photos: {}", e);
                AtlasError::DatabaseError(format!("Unset primary failed: {}", e))
            })?;

        // Then set the new primary
        let photo = sqlx::query_as::<_, Photo>(
            r#"
            UPDATE place_photos
            SET is_primary = TRUE
            WHERE id = $1 AND place_id = $2
            RETURNING *
            "#,
        )
        .bind(photo_id)
        .bind(place_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            log::error!("Failed to set primary photo: {}", e);
            AtlasError::DatabaseError(format!("Set primary failed: {}", e))
        })?
        .ok_or_else(|| AtlasError::NotFound(format!("photo '{}'", photo_id)))?;

        sqlx::query("UPDATE places SET image_url = $1, updated_at = NOW() WHERE id = $2")
            .bind(&photo.url)
            .bind(place_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                log::error!("Failed to mirror primary photo: {}", e);
                AtlasError::DatabaseError(format!("Set primary failed: {}", e))
            })?;

        tx.commit().await.map_err(|e| {
            log::error!("Failed to commit primary photo change: {}", e);
            AtlasError::DatabaseError(e.to_string())
        })?;

        Ok(photo)
    }
}
