// src/handlers/auth.rs
// DOCUMENTATION: HTTP handlers for accounts and sessions

use crate::config::Config;
use crate::errors::AtlasError;
use crate::handlers::extractors::AuthUser;
use crate::models::{GoogleLoginRequest, LoginRequest, RegisterRequest};
use crate::services::{AuthService, JwtService};
use actix_web::{web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// POST /api/auth/register
pub async fn register(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtService>,
    req: web::Json<RegisterRequest>,
) -> Result<impl Responder, AtlasError> {
    if let Err(e) = req.validate() {
        return Err(AtlasError::ValidationError(e.to_string()));
    }

    let auth = AuthService::register(pool.get_ref(), jwt.get_ref(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(auth))
}

/// POST /api/auth/login
pub async fn login(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtService>,
    req: web::Json<LoginRequest>,
) -> Result<impl Responder, AtlasError> {
    let auth = AuthService::login(pool.get_ref(), jwt.get_ref(), req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(auth))
}

/// POST /api/auth/google
pub async fn google_login(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtService>,
    http: web::Data<reqwest::Client>,
    config: web::Data<Config>,
    req: web::Json<GoogleLoginRequest>,
) -> Result<impl Responder, AtlasError> {
    if req.id_token.trim().is_empty() {
        return Err(AtlasError::InvalidInput("id_token is required".to_string()));
    }

    let auth = AuthService::google_login(
        pool.get_ref(),
        jwt.get_ref(),
        http.get_ref(),
        config.get_ref(),
        req.id_token.trim(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(auth))
}

/// GET /api/auth/me
pub async fn me(user: AuthUser, pool: web::Data<PgPool>) -> Result<impl Responder, AtlasError> {
    let account = AuthService::me(pool.get_ref(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(account.to_response()))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/google", web::post().to(google_login))
            .route("/me", web::get().to(me)),
    );
}
