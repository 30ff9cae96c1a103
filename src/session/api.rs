//! HTTP client for the chat endpoints.
//!
//! Thin typed wrapper over reqwest used by the session controller. Wire
//! shapes are shared with the handlers so client and server cannot drift.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::handlers::messages::{MarkReadResponse, MessagePage};
use crate::handlers::typing::TypingResponse;
use crate::handlers::unread::UnreadSummaryBody;
use crate::shared::message::ChatMessage;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {0}")]
    Status(StatusCode),
}

/// Typed client for one authenticated session
#[derive(Debug, Clone)]
pub struct ChatApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ChatApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// URL for the room's event stream, for the caller's SSE consumer.
    pub fn events_url(&self, room: Uuid) -> String {
        format!("{}/chat/events?roomId={room}", self.base_url)
    }

    pub async fn send_message(
        &self,
        room: Uuid,
        content: &str,
    ) -> Result<ChatMessage, ApiClientError> {
        let response = self
            .client
            .post(format!("{}/chat/messages", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "room_id": room, "content": content }))
            .send()
            .await?;
        Ok(checked(response)?.json().await?)
    }

    pub async fn messages_since(
        &self,
        room: Uuid,
        after: Option<DateTime<Utc>>,
    ) -> Result<MessagePage, ApiClientError> {
        let mut request = self
            .client
            .get(format!("{}/chat/messages", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("room_id", room.to_string())]);
        if let Some(after) = after {
            request = request.query(&[("after", after.to_rfc3339())]);
        }
        Ok(checked(request.send().await?)?.json().await?)
    }

    pub async fn mark_read(
        &self,
        room: Uuid,
        upto: DateTime<Utc>,
    ) -> Result<MarkReadResponse, ApiClientError> {
        let response = self
            .client
            .post(format!("{}/chat/messages/read", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "room_id": room, "upto": upto }))
            .send()
            .await?;
        Ok(checked(response)?.json().await?)
    }

    pub async fn set_typing(&self, room: Uuid, is_typing: bool) -> Result<(), ApiClientError> {
        let response = self
            .client
            .post(format!("{}/chat/typing", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "room_id": room, "is_typing": is_typing }))
            .send()
            .await?;
        checked(response)?;
        Ok(())
    }

    pub async fn typing_peers(&self, room: Uuid) -> Result<TypingResponse, ApiClientError> {
        let response = self
            .client
            .get(format!("{}/chat/typing", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("room_id", room.to_string())])
            .send()
            .await?;
        Ok(checked(response)?.json().await?)
    }

    pub async fn unread_summary(&self) -> Result<UnreadSummaryBody, ApiClientError> {
        let response = self
            .client
            .get(format!("{}/chat/unread", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(checked(response)?.json().await?)
    }
}

fn checked(response: reqwest::Response) -> Result<reqwest::Response, ApiClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ApiClientError::Status(response.status()))
    }
}
