//! Read-time liveness expiry for typing rows.
//!
//! Every reader filters rows to those refreshed within the liveness window,
//! so a crashed client that never sent a stop signal simply ages out of the
//! results. The periodic purge task only bounds row accumulation; no reader
//! depends on it.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::TypingStatus;

/// Filter raw typing rows down to live peers.
///
/// Keeps rows that are flagged typing, refreshed within `window` of `now`
/// (inclusive), and not authored by `caller`; a user never sees their own
/// typing status reflected back.
pub fn active_peers(
    rows: Vec<TypingStatus>,
    caller: Uuid,
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<TypingStatus> {
    rows.into_iter()
        .filter(|row| {
            row.user_id != caller
                && row.is_typing
                && now.signed_duration_since(row.last_activity) <= window
        })
        .collect()
}
