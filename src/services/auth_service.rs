// src/services/auth_service.rs
// DOCUMENTATION: Accounts, password hashing and session tokens
// PURPOSE: Register/login with credentials or Google, issue HS256 JWTs

use crate::config::Config;
use crate::db::UserRepository;
use crate::errors::AtlasError;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, User, ROLE_ADMIN};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AtlasError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AtlasError::InternalError(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AtlasError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AtlasError::InternalError(format!("Invalid password hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// At least 8 characters with one letter and one digit
pub fn check_password_strength(password: &str) -> Result<(), AtlasError> {
    let long_enough = password.chars().count() >= 8;
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_letter && has_digit {
        Ok(())
    } else {
        Err(AtlasError::ValidationError(
            "password must be at least 8 characters and contain a letter and a digit".to_string(),
        ))
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AtlasError> {
        Uuid::parse_str(&self.sub).map_err(|_| AtlasError::Unauthorized)
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Signs and checks session tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: i64,
}

impl JwtService {
    pub fn new(secret: &str, expiry_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expiry_seconds)
    }

    pub fn expiry_seconds(&self) -> i64 {
        self.expiry_seconds
    }

    pub fn issue(&self, user_id: Uuid, role: &str) -> Result<String, AtlasError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.expiry_seconds)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AtlasError::InternalError(format!("Failed to encode JWT: {}", e)))
    }

    /// Decode and validate signature and expiry
    pub fn verify(&self, token: &str) -> Result<Claims, AtlasError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                log::warn!("Rejected session token: {}", e);
                AtlasError::Unauthorized
            })
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("expiry_seconds", &self.expiry_seconds)
            .finish_non_exhaustive()
    }
}

/// Subset of Google's tokeninfo response
#[derive(Debug, Deserialize)]
pub struct GoogleTokenInfo {
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub aud: String,
    pub iss: Option<String>,
}

impl GoogleTokenInfo {
    /// Audience, issuer and verified-email checks
    pub fn check(&self, client_id: &str) -> Result<&str, AtlasError> {
        if client_id.is_empty() {
            return Err(AtlasError::ServiceUnavailable);
        }
        if self.aud != client_id {
            log::warn!("Google token for foreign audience {}", self.aud);
            return Err(AtlasError::Unauthorized);
        }
        if let Some(iss) = &self.iss {
            if !GOOGLE_ISSUERS.contains(&iss.as_str()) {
                log::warn!("Google token with unexpected issuer {}", iss);
                return Err(AtlasError::Unauthorized);
            }
        }
        if self.email_verified.as_deref() != Some("true") {
            return Err(AtlasError::Unauthorized);
        }
        self.email.as_deref().ok_or(AtlasError::Unauthorized)
    }
}

pub struct AuthService;

impl AuthService {
    fn respond(jwt: &JwtService, user: &User) -> Result<AuthResponse, AtlasError> {
        Ok(AuthResponse {
            token: jwt.issue(user.id, &user.role)?,
            token_type: "Bearer".to_string(),
            expires_in: jwt.expiry_seconds(),
            user: user.to_response(),
        })
    }

    pub async fn register(
        pool: &PgPool,
        jwt: &JwtService,
        req: RegisterRequest,
    ) -> Result<AuthResponse, AtlasError> {
        check_password_strength(&req.password)?;

        if UserRepository::find_by_email(pool, &req.email).await?.is_some() {
            return Err(AtlasError::AlreadyExists(
                "an account with this email".to_string(),
            ));
        }

        let hash = hash_password(&req.password)?;
        let user =
            UserRepository::create_with_password(pool, &req.email, req.name.as_deref(), &hash)
                .await?;

        log::info!("Registered user {}", user.id);
        Self::respond(jwt, &user)
    }

    pub async fn login(
        pool: &PgPool,
        jwt: &JwtService,
        req: LoginRequest,
    ) -> Result<AuthResponse, AtlasError> {
        let user = UserRepository::find_by_email(pool, &req.email)
            .await?
            .ok_or(AtlasError::InvalidCredentials)?;

        let Some(hash) = user.password_hash.as_deref() else {
            log::warn!("Password login attempted for Google-only account {}", user.id);
            return Err(AtlasError::InvalidCredentials);
        };

        if !verify_password(&req.password, hash)? {
            log::warn!("Failed login for user {}", user.id);
            return Err(AtlasError::InvalidCredentials);
        }

        Self::respond(jwt, &user)
    }

    /// Sign in with a Google ID token
    /// DOCUMENTATION: Links by google_sub, then by email, else creates the user
    pub async fn google_login(
        pool: &PgPool,
        jwt: &JwtService,
        http: &reqwest::Client,
        config: &Config,
        id_token: &str,
    ) -> Result<AuthResponse, AtlasError> {
        let response = http
            .get(GOOGLE_TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AtlasError::ExternalApiError(format!("tokeninfo request failed: {}", e)))?;

        if !response.status().is_success() {
            log::warn!("Google tokeninfo rejected token: {}", response.status());
            return Err(AtlasError::Unauthorized);
        }

        let info: GoogleTokenInfo = response
            .json()
            .await
            .map_err(|e| AtlasError::ExternalApiError(format!("tokeninfo parse failed: {}", e)))?;
        let email = info.check(&config.google_client_id)?;

        let user = match UserRepository::find_by_google_sub(pool, &info.sub).await? {
            Some(user) => user,
            None => match UserRepository::find_by_email(pool, email).await? {
                Some(existing) => {
                    log::info!("Linking Google account to user {}", existing.id);
                    UserRepository::link_google(pool, existing.id, &info.sub, info.picture.as_deref())
                        .await?
                }
                None => {
                    let user = UserRepository::create_with_google(
                        pool,
                        email,
                        info.name.as_deref(),
                        info.picture.as_deref(),
                        &info.sub,
                    )
                    .await?;
                    log::info!("Created user {} from Google sign-in", user.id);
                    user
                }
            },
        };

        Self::respond(jwt, &user)
    }

    pub async fn me(pool: &PgPool, user_id: Uuid) -> Result<User, AtlasError> {
        UserRepository::get_by_id(pool, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROLE_USER;

    fn service() -> JwtService {
        JwtService::new("test-secret-key-that-is-long-enough", 3600)
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("walkies123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("walkies123", &hash).unwrap());
        assert!(!verify_password("walkies124", &hash).unwrap());
    }

    #[test]
    fn test_password_strength() {
        assert!(check_password_strength("abcdefg1").is_ok());
        assert!(check_password_strength("abcdefgh").is_err());
        assert!(check_password_strength("12345678").is_err());
        assert!(check_password_strength("abc1").is_err());
    }

    #[test]
    fn test_issue_and_verify_token() {
        let jwt = service();
        let user_id = Uuid::new_v4();
        let token = jwt.issue(user_id, "admin").unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert!(claims.is_admin());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = JwtService::new("another-secret-key-entirely", 3600)
            .issue(Uuid::new_v4(), ROLE_USER)
            .unwrap();
        assert!(matches!(service().verify(&token), Err(AtlasError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Beyond the default 60 s leeway
        let token = JwtService::new("test-secret-key-that-is-long-enough", -120)
            .issue(Uuid::new_v4(), ROLE_USER)
            .unwrap();
        assert!(service().verify(&token).is_err());
    }

    fn token_info(aud: &str) -> GoogleTokenInfo {
        GoogleTokenInfo {
            sub: "1234".into(),
            email: Some("rex@example.com".into()),
            email_verified: Some("true".into()),
            name: Some("Rex".into()),
            picture: None,
            aud: aud.into(),
            iss: Some("https://accounts.google.com".into()),
        }
    }

    #[test]
    fn test_google_token_audience_checked() {
        assert_eq!(token_info("client-a").check("client-a").unwrap(), "rex@example.com");
        assert!(matches!(
            token_info("client-b").check("client-a"),
            Err(AtlasError::Unauthorized)
        ));
        assert!(matches!(
            token_info("client-a").check(""),
            Err(AtlasError::ServiceUnavailable)
        ));
    }

    #[test]
    fn test_google_token_requires_verified_email() {
        let mut info = token_info("client-a");
        info.email_verified = Some("false".into());
        assert!(info.check("client-a").is_err());
    }
}
