// src/db/review_repository.rs
// DOCUMENTATION: Review database operations
// PURPOSE: Handle CRUD operations for user reviews of places

use crate::errors::AtlasError;
use crate::models::{CreateReviewRequest, Review};
use sqlx::PgPool;
use uuid::Uuid;

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.place_id, r.user_id, u.name AS author_name,
           r.rating, r.title, r.content, r.created_at, r.updated_at
    FROM reviews r
    JOIN users u ON u.id = r.user_id
"#;

pub struct ReviewRepository;

impl ReviewRepository {
    /// Create or replace the caller's review of a place
    /// DOCUMENTATION: One review per (place, user); a second submission
    /// overwrites the first
    pub async fn upsert_review(
        pool: &PgPool,
        place_id: Uuid,
        user_id: Uuid,
        req: &CreateReviewRequest,
    ) -> Result<Review, AtlasError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO reviews (place_id, user_id, rating, title, content)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (place_id, user_id) DO UPDATE
            SET rating = EXCLUDED.rating,
                title = EXCLUDED.title,
                content = EXCLUDED.content,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(place_id)
        .bind(user_id)
        .bind(req.rating)
        .bind(&req.title)
        .bind(req.content.trim())
        .fetch_one(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to save review: {}", e);
            AtlasError::DatabaseError(format!("Save review failed: {}", e))
        })?;

        Self::get_by_id(pool, id).await
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Review, AtlasError> {
        let sql = format!("{} WHERE r.id = $1", REVIEW_SELECT);
        sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                log::error!("Failed to fetch review {}: {}", id, e);
                AtlasError::DatabaseError(format!("Fetch review failed: {}", e))
            })?
            .ok_or_else(|| AtlasError::NotFound(format!("review '{}'", id)))
    }

    /// Get reviews for a place
    /// DOCUMENTATION: Newest first, limited to `limit` rows
    pub async fn get_reviews_by_place(
        pool: &PgPool,
        place_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Review>, AtlasError> {
        let sql = format!(
            "{} WHERE r.place_id = $1 ORDER BY r.created_at DESC LIMIT $2",
            REVIEW_SELECT
        );

        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(place_id)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                log::error!("Failed to fetch reviews for place {}: {}", place_id, e);
                AtlasError::DatabaseError(format!("Fetch reviews failed: {}", e))
            })?;

        Ok(reviews)
    }

    pub async fn delete_review(pool: &PgPool, id: Uuid) -> Result<(), AtlasError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| {
                log::error!("Failed to delete review {}: {}", id, e);
                AtlasError::DatabaseError(format!("Delete review failed: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(AtlasError::NotFound(format!("review '{}'", id)));
        }
        Ok(())
    }

    pub async fn count_all(pool: &PgPool) -> Result<i64, AtlasError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews")
            .fetch_one(pool)
            .await
            .map_err(|e| {
                log::error!("Failed to count reviews: {}", e);
                AtlasError::DatabaseError(format!("Count reviews failed: {}", e))
            })?;
        Ok(count)
    }
}
