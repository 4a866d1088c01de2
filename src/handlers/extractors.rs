// src/handlers/extractors.rs
// DOCUMENTATION: Request guards for authenticated and admin routes
// PURPOSE: Resolve the caller from a Bearer JWT or the X-Admin-Token header

use crate::config::Config;
use crate::errors::AtlasError;
use crate::services::{Claims, JwtService};
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Signed-in user taken from `Authorization: Bearer <jwt>`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == crate::models::ROLE_ADMIN
    }
}

/// Caller allowed on admin routes
#[derive(Debug, Clone)]
pub enum AdminAccess {
    /// Static token from configuration
    Token,
    /// Admin-role session
    User(Uuid),
}

impl AdminAccess {
    /// Label stored as `created_by` on ingest jobs
    pub fn actor(&self) -> String {
        match self {
            AdminAccess::Token => "admin-token".to_string(),
            AdminAccess::User(id) => id.to_string(),
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn session_claims(req: &HttpRequest, token: &str) -> Result<Claims, AtlasError> {
    let jwt = req.app_data::<web::Data<JwtService>>().ok_or_else(|| {
        log::error!("JwtService missing from app data");
        AtlasError::InternalError("authentication not configured".to_string())
    })?;
    jwt.verify(token)
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AtlasError> {
    let token = bearer_token(req).ok_or(AtlasError::Unauthorized)?;
    let claims = session_claims(req, token)?;

    Ok(AuthUser {
        user_id: claims.user_id()?,
        role: claims.role,
    })
}

/// X-Admin-Token first, then an admin-role Bearer token
fn authorize_admin(req: &HttpRequest) -> Result<AdminAccess, AtlasError> {
    if let Some(provided) = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        let config = req.app_data::<web::Data<Config>>().ok_or_else(|| {
            log::error!("Config missing from app data");
            AtlasError::InternalError("admin access not configured".to_string())
        })?;

        if !config.admin_token.is_empty() && provided == config.admin_token {
            return Ok(AdminAccess::Token);
        }
        log::warn!("Invalid admin token attempt from {:?}", req.peer_addr());
        return Err(AtlasError::Forbidden);
    }

    let user = authenticate(req)?;
    if user.is_admin() {
        Ok(AdminAccess::User(user.user_id))
    } else {
        log::warn!("User {} attempted an admin route", user.user_id);
        Err(AtlasError::Forbidden)
    }
}

impl FromRequest for AuthUser {
    type Error = AtlasError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

impl FromRequest for AdminAccess {
    type Error = AtlasError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authorize_admin(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ROLE_ADMIN, ROLE_USER};
    use actix_web::test::TestRequest;

    fn request() -> (TestRequest, JwtService) {
        let config = Config::for_tests();
        let jwt = JwtService::from_config(&config);
        let req = TestRequest::default()
            .app_data(web::Data::new(config))
            .app_data(web::Data::new(jwt.clone()));
        (req, jwt)
    }

    #[actix_rt::test]
    async fn test_missing_credentials_unauthorized() {
        let (req, _) = request();
        let req = req.to_http_request();
        assert!(matches!(authenticate(&req), Err(AtlasError::Unauthorized)));
        assert!(matches!(authorize_admin(&req), Err(AtlasError::Unauthorized)));
    }

    #[actix_rt::test]
    async fn test_bearer_token_resolves_user() {
        let (req, jwt) = request();
        let user_id = Uuid::new_v4();
        let token = jwt.issue(user_id, ROLE_USER).unwrap();
        let req = req
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_http_request();

        let user = authenticate(&req).unwrap();
        assert_eq!(user.user_id, user_id);
        assert!(!user.is_admin());
        assert!(matches!(authorize_admin(&req), Err(AtlasError::Forbidden)));
    }

    #[actix_rt::test]
    async fn test_admin_role_passes_admin_guard() {
        let (req, jwt) = request();
        let user_id = Uuid::new_v4();
        let token = jwt.issue(user_id, ROLE_ADMIN).unwrap();
        let req = req
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_http_request();

        match authorize_admin(&req).unwrap() {
            AdminAccess::User(id) => assert_eq!(id, user_id),
            other => panic!("unexpected access {:?}", other),
        }
    }

    #[actix_rt::test]
    async fn test_admin_token_header() {
        let (req, _) = request();
        let req = req
            .insert_header((ADMIN_TOKEN_HEADER, "test-admin-token"))
            .to_http_request();
        assert!(matches!(authorize_admin(&req), Ok(AdminAccess::Token)));

        let (req, _) = request();
        let req = req
            .insert_header((ADMIN_TOKEN_HEADER, "wrong"))
            .to_http_request();
        assert!(matches!(authorize_admin(&req), Err(AtlasError::Forbidden)));
    }

    #[actix_rt::test]
    async fn test_garbage_bearer_rejected() {
        let (req, _) = request();
        let req = req
            .insert_header((header::AUTHORIZATION, "Bearer not-a-jwt"))
            .to_http_request();
        assert!(matches!(authenticate(&req), Err(AtlasError::Unauthorized)));
    }
}
