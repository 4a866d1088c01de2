// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for entire application

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

/// Application-specific error types
/// DOCUMENTATION: Each variant maps to one HTTP status code and error code
#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden access")]
    Forbidden,

    #[error("Internal server error")]
    InternalError(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
}

impl AtlasError {
    /// Stable machine-readable code used in the JSON error body
    pub fn code(&self) -> &'static str {
        match self {
            AtlasError::NotFound(_) => "NOT_FOUND",
            AtlasError::AlreadyExists(_) => "ALREADY_EXISTS",
            AtlasError::Conflict(_) => "CONFLICT",
            AtlasError::DatabaseError(_) => "DATABASE_ERROR",
            AtlasError::InvalidInput(_) => "INVALID_INPUT",
            AtlasError::ValidationError(_) => "VALIDATION_ERROR",
            AtlasError::Unauthorized => "UNAUTHORIZED",
            AtlasError::InvalidCredentials => "INVALID_CREDENTIALS",
            AtlasError::Forbidden => "FORBIDDEN",
            AtlasError::InternalError(_) => "INTERNAL_ERROR",
            AtlasError::ExternalApiError(_) => "EXTERNAL_API_ERROR",
            AtlasError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            AtlasError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

impl From<sqlx::Error> for AtlasError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AtlasError::NotFound("record".to_string()),
            other => AtlasError::DatabaseError(other.to_string()),
        }
    }
}

/// Convert AtlasError to HTTP response
impl ResponseError for AtlasError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AtlasError::NotFound(_) => StatusCode::NOT_FOUND,
            AtlasError::AlreadyExists(_) | AtlasError::Conflict(_) => StatusCode::CONFLICT,
            AtlasError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AtlasError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AtlasError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AtlasError::Unauthorized | AtlasError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AtlasError::Forbidden => StatusCode::FORBIDDEN,
            AtlasError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AtlasError::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            AtlasError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AtlasError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AtlasError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AtlasError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AtlasError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AtlasError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AtlasError::ValidationError("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AtlasError::ExternalApiError("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AtlasError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AtlasError::NotFound(_)));
    }

    #[actix_rt::test]
    async fn test_error_body_shape() {
        let resp = AtlasError::InvalidInput("missing name".into()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("missing name"));
        assert!(body["error"]["timestamp"].is_string());
    }
}
