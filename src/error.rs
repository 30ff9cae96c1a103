//! API error taxonomy.
//!
//! Validation failures become structured 4xx JSON bodies; upstream store
//! failures are logged and collapse to a generic 500 so internal detail
//! never leaks to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// No or invalid session
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated but not a room participant
    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    /// Missing or malformed request field
    #[error("{0}")]
    InvalidInput(String),

    /// Attachment larger than the configured limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Attachment type outside the configured allowlist
    #[error("{0}")]
    UnsupportedMediaType(String),

    /// Durable store, change-feed, or blob storage failure
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_)
            | ApiError::PayloadTooLarge(_)
            | ApiError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Never echo upstream error detail to the client.
            ApiError::Upstream(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotParticipant { .. } => ApiError::Forbidden,
            StoreError::RoomNotFound(_) => ApiError::NotFound("room".to_string()),
            StoreError::UserNotFound(_) => ApiError::NotFound("user".to_string()),
            StoreError::InvalidRoom(reason) => ApiError::InvalidInput(reason),
            StoreError::Database(_) => {
                tracing::error!("store failure: {err:?}");
                ApiError::Upstream(err.to_string())
            }
        }
    }
}

impl From<crate::storage::BlobError> for ApiError {
    fn from(err: crate::storage::BlobError) -> Self {
        tracing::error!("blob storage failure: {err:?}");
        ApiError::Upstream(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
