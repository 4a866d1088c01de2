// src/db/user_repository.rs
// DOCUMENTATION: User account database operations
// PURPOSE: Lookups and inserts for credential and Google sign-in

use crate::errors::AtlasError;
use crate::models::User;
use sqlx::PgPool;
use uuid::Uuid;

fn db_error(context: &str, e: sqlx::Error) -> AtlasError {
    log::error!("{}: {}", context, e);
    AtlasError::DatabaseError(e.to_string())
}

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AtlasError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email.trim())
            .fetch_optional(pool)
            .await
            .map_err(|e| db_error("Failed to look up user by email", e))
    }

    pub async fn find_by_google_sub(pool: &PgPool, sub: &str) -> Result<Option<User>, AtlasError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE google_sub = $1")
            .bind(sub)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_error("Failed to look up user by google id", e))
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<User, AtlasError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_error("Failed to fetch user", e))?
            .ok_or_else(|| AtlasError::NotFound(format!("user '{}'", id)))
    }

    /// Insert a credentials account; a taken email is a conflict
    pub async fn create_with_password(
        pool: &PgPool,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, AtlasError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES (lower($1), $2, $3)
            RETURNING *
            "#,
        )
        .bind(email.trim())
        .bind(name)
        .bind(password_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AtlasError::AlreadyExists("an account with this email".to_string())
            }
            other => db_error("Failed to create user", other),
        })
    }

    pub async fn create_with_google(
        pool: &PgPool,
        email: &str,
        name: Option<&str>,
        image: Option<&str>,
        google_sub: &str,
    ) -> Result<User, AtlasError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, image, google_sub)
            VALUES (lower($1), $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(email.trim())
        .bind(name)
        .bind(image)
        .bind(google_sub)
        .fetch_one(pool)
        .await
        .map_err(|e| db_error("Failed to create Google user", e))
    }

    /// Attach a Google identity to an existing account found by email
    pub async fn link_google(
        pool: &PgPool,
        id: Uuid,
        google_sub: &str,
        image: Option<&str>,
    ) -> Result<User, AtlasError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET google_sub = $1,
                image = COALESCE(image, $2),
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(google_sub)
        .bind(image)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| db_error("Failed to link Google account", e))
    }

    pub async fn count_all(pool: &PgPool) -> Result<i64, AtlasError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .map_err(|e| db_error("Failed to count users", e))?;
        Ok(count)
    }
}
