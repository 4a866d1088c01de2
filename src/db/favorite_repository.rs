// src/db/favorite_repository.rs
// DOCUMENTATION: Favorite database operations
// PURPOSE: Per-user saved places

use crate::errors::AtlasError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

fn db_error(context: &str, e: sqlx::Error) -> AtlasError {
    log::error!("{}: {}", context, e);
    AtlasError::DatabaseError(e.to_string())
}

pub struct FavoriteRepository;

impl FavoriteRepository {
    /// Idempotent add
    pub async fn add(pool: &PgPool, user_id: Uuid, place_id: Uuid) -> Result<(), AtlasError> {
        sqlx::query(
            r#"
            INSERT INTO favorites (user_id, place_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, place_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(place_id)
        .execute(pool)
        .await
        .map_err(|e| db_error("Failed to add favorite", e))?;
        Ok(())
    }

    /// Idempotent remove; returns whether a row was deleted
    pub async fn remove(pool: &PgPool, user_id: Uuid, place_id: Uuid) -> Result<bool, AtlasError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND place_id = $2")
            .bind(user_id)
            .bind(place_id)
            .execute(pool)
            .await
            .map_err(|e| db_error("Failed to remove favorite", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &PgPool, user_id: Uuid, place_id: Uuid) -> Result<bool, AtlasError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND place_id = $2)",
        )
        .bind(user_id)
        .bind(place_id)
        .fetch_one(pool)
        .await
        .map_err(|e| db_error("Failed to read favorite", e))?;
        Ok(exists)
    }

    /// (place_id, favorited_at) pairs for a user, newest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<(Uuid, DateTime<Utc>)>, AtlasError> {
        sqlx::query_as(
            r#"
            SELECT f.place_id, f.created_at
            FROM favorites f
            JOIN places p ON p.id = f.place_id AND p.is_active = true
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(|e| db_error("Failed to list favorites", e))
    }
}
