//! Server configuration.
//!
//! Timing constants (typing liveness, ping interval, unread cache window)
//! are product-tuned, not structural, so they live here as environment
//! overrides with defaults. Configuration problems are logged and degrade
//! rather than prevent startup: a missing or unreachable database leaves
//! the server running on the in-memory store.

use std::time::Duration;

use sqlx::PgPool;

/// Tunable chat behavior
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Typing rows older than this are treated as expired by all readers.
    pub typing_window: Duration,
    /// Keep-alive interval on the SSE stream.
    pub ping_interval: Duration,
    /// `max-age` for unread responses; bounds acceptable staleness.
    pub unread_cache_max_age: u64,
    /// Cap on rooms in an unread summary.
    pub unread_page_size: i64,
    /// Cap on messages per list request.
    pub message_page_limit: i64,
    /// Upload size ceiling in bytes.
    pub max_upload_bytes: u64,
    /// Allowed upload content types.
    pub allowed_upload_types: Vec<String>,
    /// How often the background task purges stale typing rows.
    pub typing_purge_interval: Duration,
    /// Typing rows idle longer than this are purged.
    pub typing_purge_age: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_window: Duration::from_secs(5),
            ping_interval: Duration::from_secs(30),
            unread_cache_max_age: 10,
            unread_page_size: 50,
            message_page_limit: 100,
            max_upload_bytes: 50 * 1024 * 1024,
            allowed_upload_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
                "application/pdf".to_string(),
            ],
            typing_purge_interval: Duration::from_secs(300),
            typing_purge_age: Duration::from_secs(60),
        }
    }
}

impl ChatConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            typing_window: env_secs("TYPING_WINDOW_SECS", defaults.typing_window),
            ping_interval: env_secs("SSE_PING_INTERVAL_SECS", defaults.ping_interval),
            unread_cache_max_age: env_u64("UNREAD_CACHE_MAX_AGE_SECS", defaults.unread_cache_max_age),
            unread_page_size: env_u64("UNREAD_PAGE_SIZE", defaults.unread_page_size as u64) as i64,
            message_page_limit: env_u64("MESSAGE_PAGE_LIMIT", defaults.message_page_limit as u64) as i64,
            max_upload_bytes: env_u64("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            allowed_upload_types: defaults.allowed_upload_types,
            typing_purge_interval: env_secs("TYPING_PURGE_INTERVAL_SECS", defaults.typing_purge_interval),
            typing_purge_age: env_secs("TYPING_PURGE_AGE_SECS", defaults.typing_purge_age),
        }
    }

    /// Typing window as a chrono duration for timestamp arithmetic.
    pub fn typing_window_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.typing_window).unwrap_or(chrono::Duration::seconds(5))
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("invalid {name}={raw}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    Duration::from_secs(env_u64(name, default.as_secs()))
}

/// Load and initialize the database connection pool.
///
/// Returns `None` when `DATABASE_URL` is unset or the connection fails;
/// the caller falls back to the in-memory store.
pub async fn load_database() -> Option<PgPool> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, chat state will not survive restarts");
            return None;
        }
    };

    let pool = match PgPool::connect(&database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("failed to create database connection pool: {e:?}");
            tracing::warn!("falling back to the in-memory store");
            return None;
        }
    };

    match sqlx::migrate!().run(&pool).await {
        Ok(_) => tracing::info!("database migrations complete"),
        Err(e) => {
            // Migrations may already have been applied by an earlier deploy.
            tracing::warn!("migration run failed, continuing: {e:?}");
        }
    }

    Some(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_constants() {
        let config = ChatConfig::default();
        assert_eq!(config.typing_window, Duration::from_secs(5));
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert_eq!(config.unread_cache_max_age, 10);
        assert_eq!(config.unread_page_size, 50);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert!(config.allowed_upload_types.iter().any(|t| t == "image/png"));
    }

    #[test]
    fn typing_window_converts_to_chrono() {
        let config = ChatConfig::default();
        assert_eq!(config.typing_window_chrono(), chrono::Duration::seconds(5));
    }
}
