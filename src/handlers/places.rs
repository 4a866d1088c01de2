// src/handlers/places.rs
// DOCUMENTATION: HTTP handlers for place operations
// PURPOSE: Parse requests, call services, return responses

use crate::errors::AtlasError;
use crate::handlers::extractors::AdminAccess;
use crate::models::{CreatePlaceRequest, MapQuery, NearbyQuery, SearchQuery, UpdatePlaceRequest};
use crate::services::{PhotoService, PlaceService, SearchCache};
use actix_web::{web, HttpResponse, Responder};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// GET /api/places
/// Search places with filters and pagination
pub async fn search_places(
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<SearchCache>>,
    query: web::Query<SearchQuery>,
) -> Result<impl Responder, AtlasError> {
    let result = PlaceService::search_places(pool.get_ref(), cache.get_ref(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/places/geojson
pub async fn places_geojson(
    pool: web::Data<PgPool>,
    query: web::Query<MapQuery>,
) -> Result<impl Responder, AtlasError> {
    let collection = PlaceService::geojson(pool.get_ref(), query.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/geo+json")
        .json(collection))
}

/// GET /api/places/{id}
/// Retrieve a place by UUID or slug
pub async fn get_place(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<impl Responder, AtlasError> {
    let place = PlaceService::get_place(pool.get_ref(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(place))
}

/// GET /api/places/{id}/nearby
pub async fn nearby_places(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    query: web::Query<NearbyQuery>,
) -> Result<impl Responder, AtlasError> {
    let places = PlaceService::nearby(pool.get_ref(), path.into_inner(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(places))
}

/// GET /api/places/{id}/photos
pub async fn place_photos(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AtlasError> {
    let photos = PhotoService::list(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(photos))
}

/// POST /api/places
/// Create a new place (admin)
pub async fn create_place(
    _admin: AdminAccess,
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<SearchCache>>,
    req: web::Json<CreatePlaceRequest>,
) -> Result<impl Responder, AtlasError> {
    if let Err(e) = req.validate() {
        return Err(AtlasError::ValidationError(e.to_string()));
    }

    let place = PlaceService::create_place(pool.get_ref(), cache.get_ref(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(place))
}

/// PUT /api/places/{id}
/// Partial update (admin)
pub async fn update_place(
    _admin: AdminAccess,
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<SearchCache>>,
    path: web::Path<Uuid>,
    req: web::Json<UpdatePlaceRequest>,
) -> Result<impl Responder, AtlasError> {
    if let Err(e) = req.validate() {
        return Err(AtlasError::ValidationError(e.to_string()));
    }

    let place = PlaceService::update_place(
        pool.get_ref(),
        cache.get_ref(),
        path.into_inner(),
        req.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(place))
}

/// DELETE /api/places/{id}
/// Soft delete (admin)
pub async fn delete_place(
    _admin: AdminAccess,
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<SearchCache>>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AtlasError> {
    PlaceService::delete_place(pool.get_ref(), cache.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Configuration for place routes
/// DOCUMENTATION: /places/geojson is registered before /places/{id}
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/places", web::get().to(search_places))
        .route("/places", web::post().to(create_place))
        .route("/places/geojson", web::get().to(places_geojson))
        .route("/places/{id}", web::get().to(get_place))
        .route("/places/{id}", web::put().to(update_place))
        .route("/places/{id}", web::delete().to(delete_place))
        .route("/places/{id}/nearby", web::get().to(nearby_places))
        .route("/places/{id}/photos", web::get().to(place_photos));
}
