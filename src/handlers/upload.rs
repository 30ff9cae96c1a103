//! Attachment upload handler.
//!
//! Oversized uploads are rejected from the declared Content-Length before
//! the body is drained, so no storage write happens for them. The content
//! type allowlist is checked the same way. Stored objects get a random
//! name; the original filename never reaches storage.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::sessions;
use crate::error::ApiError;
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub path: String,
    pub size: usize,
    pub content_type: String,
}

/// POST /chat/upload
///
/// Raw body upload; the type comes from the Content-Type header.
pub async fn upload(State(state): State<AppState>, request: Request) -> Result<Json<UploadResponse>, ApiError> {
    let (parts, body) = request.into_parts();
    let user = sessions::current_user(&parts.headers)?;

    let max_bytes = state.config.max_upload_bytes;
    if let Some(declared) = content_length(&parts.headers) {
        if declared > max_bytes {
            return Err(too_large(max_bytes));
        }
    }

    let content_type = content_type(&parts.headers)
        .ok_or_else(|| ApiError::InvalidInput("Content-Type header is required".to_string()))?;
    if !state.config.allowed_upload_types.iter().any(|t| t == &content_type) {
        return Err(ApiError::UnsupportedMediaType(format!(
            "File type {content_type} is not allowed"
        )));
    }

    // Chunked bodies have no Content-Length; the limit still applies while
    // draining.
    let bytes = axum::body::to_bytes(body, max_bytes as usize)
        .await
        .map_err(|_| too_large(max_bytes))?;
    if bytes.is_empty() {
        return Err(ApiError::InvalidInput("upload body is empty".to_string()));
    }

    let size = bytes.len();
    let path = format!("{user}/{}{}", Uuid::new_v4(), extension_for(&content_type));
    let url = state.blobs.put(&path, bytes).await?;
    tracing::info!("stored upload {path} ({size} bytes) for user {user}");

    Ok(Json(UploadResponse { url, path, size, content_type }))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    Some(raw.split(';').next().unwrap_or(raw).trim().to_ascii_lowercase())
}

fn too_large(max_bytes: u64) -> ApiError {
    ApiError::PayloadTooLarge(format!(
        "File size must be less than {}MB",
        max_bytes / (1024 * 1024)
    ))
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "application/pdf" => ".pdf",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_rejection_names_the_limit_in_megabytes() {
        let err = too_large(50 * 1024 * 1024);
        assert_eq!(err.to_string(), "File size must be less than 50MB");
    }

    #[test]
    fn content_type_parameters_are_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "image/PNG; charset=binary".parse().unwrap(),
        );
        assert_eq!(content_type(&headers).as_deref(), Some("image/png"));
    }

    #[test]
    fn extensions_follow_the_allowlist() {
        assert_eq!(extension_for("image/jpeg"), ".jpg");
        assert_eq!(extension_for("application/pdf"), ".pdf");
        assert_eq!(extension_for("text/plain"), "");
    }
}
