// src/handlers/reviews.rs
// DOCUMENTATION: HTTP handlers for reviews

use crate::errors::AtlasError;
use crate::handlers::extractors::AuthUser;
use crate::models::{CreateReviewRequest, ReviewListQuery};
use crate::services::{ReviewService, SearchCache};
use actix_web::{web, HttpResponse, Responder};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// GET /api/places/{id}/reviews
pub async fn list_reviews(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    query: web::Query<ReviewListQuery>,
) -> Result<impl Responder, AtlasError> {
    let reviews = ReviewService::list(pool.get_ref(), path.into_inner(), query.limit).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

/// POST /api/places/{id}/reviews
/// One review per user and place; resubmitting replaces it
pub async fn submit_review(
    user: AuthUser,
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<SearchCache>>,
    path: web::Path<Uuid>,
    req: web::Json<CreateReviewRequest>,
) -> Result<impl Responder, AtlasError> {
    if let Err(e) = req.validate() {
        return Err(AtlasError::ValidationError(e.to_string()));
    }

    let saved = ReviewService::submit(
        pool.get_ref(),
        cache.get_ref(),
        &user,
        path.into_inner(),
        req.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(saved))
}

/// DELETE /api/reviews/{id}
pub async fn delete_review(
    user: AuthUser,
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<SearchCache>>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AtlasError> {
    ReviewService::delete(pool.get_ref(), cache.get_ref(), &user, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/places/{id}/reviews", web::get().to(list_reviews))
        .route("/places/{id}/reviews", web::post().to(submit_review))
        .route("/reviews/{id}", web::delete().to(delete_review));
}
