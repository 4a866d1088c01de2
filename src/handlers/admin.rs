// src/handlers/admin.rs
// DOCUMENTATION: Admin handlers for ingest, enrichment and photos
// PURPOSE: Expose catalogue maintenance via REST endpoints
// Every handler requires AdminAccess (X-Admin-Token or an admin session)

use crate::config::Config;
use crate::errors::AtlasError;
use crate::handlers::extractors::AdminAccess;
use crate::models::{AddPhotoRequest, IngestUploadQuery};
use crate::services::{
    AdminService, EnrichRequest, EnrichmentService, IngestService, PhotoService, SearchCache,
};
use actix_web::{web, HttpResponse, Responder};
use governor::DefaultDirectRateLimiter;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// POST /api/admin/ingest?filename=
/// Validate a CSV body and store the report as an ingest job
///
/// DOCUMENTATION: Nothing is written to places until the job is applied
pub async fn upload_csv(
    admin: AdminAccess,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<IngestUploadQuery>,
    body: String,
) -> Result<impl Responder, AtlasError> {
    log::info!(
        "CSV upload by {} ({} bytes)",
        admin.actor(),
        body.len()
    );

    let job = IngestService::upload(
        pool.get_ref(),
        config.max_csv_bytes,
        query.filename.as_deref(),
        &body,
        &admin.actor(),
    )
    .await?;

    Ok(HttpResponse::Created().json(job))
}

/// POST /api/admin/ingest/{id}/apply
pub async fn apply_job(
    admin: AdminAccess,
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<SearchCache>>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AtlasError> {
    let id = path.into_inner();
    log::info!("Apply of ingest job {} requested by {}", id, admin.actor());

    let applied = IngestService::apply(pool.get_ref(), cache.get_ref(), id).await?;
    Ok(HttpResponse::Ok().json(applied))
}

/// GET /api/admin/ingest
pub async fn list_jobs(
    _admin: AdminAccess,
    pool: web::Data<PgPool>,
) -> Result<impl Responder, AtlasError> {
    let jobs = IngestService::list(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(jobs))
}

/// GET /api/admin/ingest/{id}
pub async fn get_job(
    _admin: AdminAccess,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AtlasError> {
    let job = IngestService::get(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(job))
}

/// GET /api/admin/stats
pub async fn database_stats(
    _admin: AdminAccess,
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<SearchCache>>,
) -> Result<impl Responder, AtlasError> {
    let stats = AdminService::stats(pool.get_ref(), cache.get_ref()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// POST /api/admin/enrich
/// Fill missing place images from the configured providers
pub async fn enrich_images(
    admin: AdminAccess,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    http: web::Data<reqwest::Client>,
    limiter: web::Data<DefaultDirectRateLimiter>,
    cache: web::Data<Arc<SearchCache>>,
    body: Option<web::Json<EnrichRequest>>,
) -> Result<impl Responder, AtlasError> {
    let req = body.map(web::Json::into_inner).unwrap_or_default();
    log::info!(
        "Enrichment requested by {} (city: {:?}, limit: {:?})",
        admin.actor(),
        req.city,
        req.limit
    );

    let stats = EnrichmentService::enrich(
        pool.get_ref(),
        http.get_ref(),
        config.get_ref(),
        limiter.get_ref(),
        cache.get_ref(),
        req,
    )
    .await?;

    Ok(HttpResponse::Ok().json(stats))
}

/// POST /api/admin/places/{id}/photos
pub async fn add_photo(
    _admin: AdminAccess,
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<SearchCache>>,
    path: web::Path<Uuid>,
    req: web::Json<AddPhotoRequest>,
) -> Result<impl Responder, AtlasError> {
    if let Err(e) = req.validate() {
        return Err(AtlasError::ValidationError(e.to_string()));
    }

    let photo = PhotoService::add(
        pool.get_ref(),
        cache.get_ref(),
        path.into_inner(),
        req.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Created().json(photo))
}

/// PUT /api/admin/places/{id}/photos/{photo_id}/primary
pub async fn set_primary_photo(
    _admin: AdminAccess,
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<SearchCache>>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<impl Responder, AtlasError> {
    let (place_id, photo_id) = path.into_inner();
    let photo =
        PhotoService::set_primary(pool.get_ref(), cache.get_ref(), place_id, photo_id).await?;
    Ok(HttpResponse::Ok().json(photo))
}

/// Configuration for admin routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/ingest", web::post().to(upload_csv))
            .route("/ingest", web::get().to(list_jobs))
            .route("/ingest/{id}", web::get().to(get_job))
            .route("/ingest/{id}/apply", web::post().to(apply_job))
            .route("/stats", web::get().to(database_stats))
            .route("/enrich", web::post().to(enrich_images))
            .route("/places/{id}/photos", web::post().to(add_photo))
            .route(
                "/places/{id}/photos/{photo_id}/primary",
                web::put().to(set_primary_photo),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROLE_USER;
    use crate::services::JwtService;
    use actix_web::{http::StatusCode, test, App};

    fn app_config() -> (Config, JwtService) {
        let config = Config::for_tests();
        let jwt = JwtService::from_config(&config);
        (config, jwt)
    }

    #[actix_rt::test]
    async fn test_admin_routes_require_credentials() {
        let (config, jwt) = app_config();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(jwt))
                .service(web::scope("/api").configure(super::config)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/admin/stats").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/admin/ingest?filename=x.csv")
            .set_payload("name,type,city,latitude,longitude\n")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_non_admin_session_forbidden() {
        let (config, jwt) = app_config();
        let token = jwt.issue(Uuid::new_v4(), ROLE_USER).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(jwt))
                .service(web::scope("/api").configure(super::config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/admin/ingest")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_rt::test]
    async fn test_wrong_admin_token_forbidden() {
        let (config, jwt) = app_config();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(jwt))
                .service(web::scope("/api").configure(super::config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/admin/enrich")
            .insert_header(("X-Admin-Token", "nope"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
