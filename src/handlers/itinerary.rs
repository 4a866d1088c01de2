// src/handlers/itinerary.rs
// DOCUMENTATION: HTTP handler for itinerary planning

use crate::config::Config;
use crate::errors::AtlasError;
use crate::models::ItineraryRequest;
use crate::services::ItineraryService;
use actix_web::{web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// POST /api/itinerary
pub async fn plan_itinerary(
    pool: web::Data<PgPool>,
    http: web::Data<reqwest::Client>,
    config: web::Data<Config>,
    req: web::Json<ItineraryRequest>,
) -> Result<impl Responder, AtlasError> {
    if let Err(e) = req.validate() {
        return Err(AtlasError::ValidationError(e.to_string()));
    }

    let plan = ItineraryService::plan(
        pool.get_ref(),
        http.get_ref(),
        config.get_ref(),
        req.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(plan))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/itinerary", web::post().to(plan_itinerary));
}
