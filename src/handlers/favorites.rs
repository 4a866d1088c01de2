// src/handlers/favorites.rs
// DOCUMENTATION: HTTP handlers for the signed-in user's favorites

use crate::errors::AtlasError;
use crate::handlers::extractors::AuthUser;
use crate::services::FavoriteService;
use actix_web::{web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;

/// GET /api/favorites
pub async fn list_favorites(
    user: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<impl Responder, AtlasError> {
    let favorites = FavoriteService::list(pool.get_ref(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(favorites))
}

/// PUT /api/favorites/{place_id}
pub async fn add_favorite(
    user: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AtlasError> {
    let state = FavoriteService::add(pool.get_ref(), user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(state))
}

/// DELETE /api/favorites/{place_id}
pub async fn remove_favorite(
    user: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AtlasError> {
    let state = FavoriteService::remove(pool.get_ref(), user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(state))
}

/// POST /api/favorites/{place_id}/toggle
pub async fn toggle_favorite(
    user: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AtlasError> {
    let state = FavoriteService::toggle(pool.get_ref(), user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(state))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/favorites")
            .route("", web::get().to(list_favorites))
            .route("/{place_id}", web::put().to(add_favorite))
            .route("/{place_id}", web::delete().to(remove_favorite))
            .route("/{place_id}/toggle", web::post().to(toggle_favorite)),
    );
}
