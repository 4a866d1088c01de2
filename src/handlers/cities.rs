// src/handlers/cities.rs
// DOCUMENTATION: HTTP handlers for countries and cities

use crate::errors::AtlasError;
use crate::services::CityService;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use sqlx::PgPool;

#[derive(Debug, Deserialize)]
pub struct CityListQuery {
    /// Country slug
    pub country: Option<String>,
}

/// GET /api/countries
pub async fn list_countries(pool: web::Data<PgPool>) -> Result<impl Responder, AtlasError> {
    let countries = CityService::list_countries(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(countries))
}

/// GET /api/countries/{slug}
pub async fn get_country(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<impl Responder, AtlasError> {
    let country = CityService::get_country(pool.get_ref(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(country))
}

/// GET /api/cities
pub async fn list_cities(
    pool: web::Data<PgPool>,
    query: web::Query<CityListQuery>,
) -> Result<impl Responder, AtlasError> {
    let cities = CityService::list_cities(pool.get_ref(), query.country.as_deref()).await?;
    Ok(HttpResponse::Ok().json(cities))
}

/// GET /api/cities/{slug}
pub async fn get_city(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<impl Responder, AtlasError> {
    let city = CityService::get_city(pool.get_ref(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(city))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/countries", web::get().to(list_countries))
        .route("/countries/{slug}", web::get().to(get_country))
        .route("/cities", web::get().to(list_cities))
        .route("/cities/{slug}", web::get().to(get_city));
}
