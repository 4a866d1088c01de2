// src/models/review.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// User review of a place, joined with the author's display name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub author_name: Option<String>,
    pub rating: i16,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of POST /api/places/{id}/reviews
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,

    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

/// Review response DTO exposed via API
#[derive(Debug, Clone, Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub author: Option<String>,
    pub rating: i16,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review write result with the place's recomputed aggregate
#[derive(Debug, Serialize)]
pub struct ReviewSubmitted {
    pub review: ReviewResponse,
    pub place_rating: Option<f32>,
    pub place_review_count: i32,
}

/// Place aggregate derived from its review ratings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    /// Mean rounded half-up to one decimal; None once no reviews remain
    pub rating: Option<f32>,
    pub review_count: i32,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &[i16]) -> Self {
        let count = ratings.len() as i64;
        if count == 0 {
            return Self {
                rating: None,
                review_count: 0,
            };
        }

        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        // tenths, rounded half-up in integer arithmetic
        let tenths = (sum * 20 + count) / (count * 2);

        Self {
            rating: Some(tenths as f32 / 10.0),
            review_count: count as i32,
        }
    }
}

/// Query for GET /api/places/{id}/reviews
#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub limit: Option<i64>,
}

impl Review {
    pub fn to_response(&self) -> ReviewResponse {
        ReviewResponse {
            id: self.id,
            place_id: self.place_id,
            user_id: self.user_id,
            author: self.author_name.clone(),
            rating: self.rating,
            title: self.title.clone(),
            content: self.content.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        let mut req = CreateReviewRequest {
            rating: 6,
            title: None,
            content: "Water bowls at the door".into(),
        };
        assert!(req.validate().is_err());

        req.rating = 5;
        assert!(req.validate().is_ok());

        req.rating = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_rating_summary() {
        assert_eq!(
            RatingSummary::from_ratings(&[]),
            RatingSummary {
                rating: None,
                review_count: 0
            }
        );

        let single = RatingSummary::from_ratings(&[4]);
        assert_eq!(single.rating, Some(4.0));
        assert_eq!(single.review_count, 1);

        // 4.25 rounds up, 13/3 = 4.333 rounds down, 14/3 = 4.667 rounds up
        assert_eq!(RatingSummary::from_ratings(&[4, 5, 4, 4]).rating, Some(4.3));
        assert_eq!(RatingSummary::from_ratings(&[4, 4, 5]).rating, Some(4.3));
        assert_eq!(RatingSummary::from_ratings(&[5, 5, 4]).rating, Some(4.7));
        assert_eq!(RatingSummary::from_ratings(&[1, 2]).rating, Some(1.5));
        assert_eq!(RatingSummary::from_ratings(&[5, 4, 1]).review_count, 3);
    }

    #[test]
    fn test_empty_content_rejected() {
        let req = CreateReviewRequest {
            rating: 4,
            title: Some("Nice".into()),
            content: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
