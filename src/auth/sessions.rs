//! Session boundary: JWT bearer tokens.
//!
//! The user/session provider is an external collaborator; all this crate
//! needs from it is "current user or none", carried as a signed bearer
//! token on each request.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using development default");
        "parley-dev-secret-change-in-production".to_string()
    })
}

/// Create a session token for a user. Expires in 30 days.
pub fn create_token(user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 30 * 24 * 60 * 60,
        iat: now,
    };
    let key = EncodingKey::from_secret(jwt_secret().as_ref());
    encode(&Header::default(), &claims, &key)
}

/// Verify and decode a session token.
pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(jwt_secret().as_ref());
    let token_data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(token_data.claims)
}

/// Resolve the current user from request headers.
///
/// Expects `Authorization: Bearer <token>`; any missing or invalid piece is
/// `Unauthorized`.
pub fn current_user(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;
    let claims = verify_token(token).map_err(|e| {
        tracing::warn!("invalid session token: {e:?}");
        ApiError::Unauthorized
    })?;
    Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)
}
