// src/services/review_service.rs
// DOCUMENTATION: Review submission and moderation
// PURPOSE: Keep places.rating and review_count in step with reviews

use crate::db::{PlaceRepository, ReviewRepository};
use crate::errors::AtlasError;
use crate::handlers::extractors::AuthUser;
use crate::models::{CreateReviewRequest, ReviewResponse, ReviewSubmitted};
use crate::services::SearchCache;
use sqlx::PgPool;
use uuid::Uuid;

const DEFAULT_REVIEW_LIMIT: i64 = 20;
const MAX_REVIEW_LIMIT: i64 = 100;

pub struct ReviewService;

impl ReviewService {
    pub async fn list(
        pool: &PgPool,
        place_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<ReviewResponse>, AtlasError> {
        // 404 for unknown or inactive places
        PlaceRepository::get_by_id(pool, place_id).await?;

        let limit = limit.unwrap_or(DEFAULT_REVIEW_LIMIT).clamp(1, MAX_REVIEW_LIMIT);
        let reviews = ReviewRepository::get_reviews_by_place(pool, place_id, limit).await?;
        Ok(reviews.iter().map(|r| r.to_response()).collect())
    }

    /// Create or replace the caller's review of a place
    pub async fn submit(
        pool: &PgPool,
        cache: &SearchCache,
        user: &AuthUser,
        place_id: Uuid,
        req: CreateReviewRequest,
    ) -> Result<ReviewSubmitted, AtlasError> {
        PlaceRepository::get_by_id(pool, place_id).await?;

        let review = ReviewRepository::upsert_review(pool, place_id, user.user_id, &req).await?;
        let summary = PlaceRepository::refresh_rating(pool, place_id).await?;
        cache.clear().await;

        log::info!(
            "Review {} saved for place {} (rating now {:?} over {})",
            review.id,
            place_id,
            summary.rating,
            summary.review_count
        );

        Ok(ReviewSubmitted {
            review: review.to_response(),
            place_rating: summary.rating,
            place_review_count: summary.review_count,
        })
    }

    /// Delete a review; only its author or an admin may do so
    pub async fn delete(
        pool: &PgPool,
        cache: &SearchCache,
        user: &AuthUser,
        review_id: Uuid,
    ) -> Result<(), AtlasError> {
        let review = ReviewRepository::get_by_id(pool, review_id).await?;
        if !can_delete(user, review.user_id) {
            log::warn!(
                "User {} tried to delete review {} owned by {}",
                user.user_id,
                review_id,
                review.user_id
            );
            return Err(AtlasError::Forbidden);
        }

        ReviewRepository::delete_review(pool, review_id).await?;
        PlaceRepository::refresh_rating(pool, review.place_id).await?;
        cache.clear().await;
        Ok(())
    }
}

fn can_delete(user: &AuthUser, author_id: Uuid) -> bool {
    user.user_id == author_id || user.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ROLE_ADMIN, ROLE_USER};

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role: role.to_string(),
        }
    }

    #[test]
    fn test_author_can_delete_own_review() {
        let author = user(ROLE_USER);
        assert!(can_delete(&author, author.user_id));
    }

    #[test]
    fn test_other_user_cannot_delete() {
        assert!(!can_delete(&user(ROLE_USER), Uuid::new_v4()));
    }

    #[test]
    fn test_admin_can_delete_any_review() {
        assert!(can_delete(&user(ROLE_ADMIN), Uuid::new_v4()));
    }
}
