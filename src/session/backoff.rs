//! Reconnect backoff policy for the event stream.

use std::time::Duration;

const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Exponential backoff: 1s doubling to a 30s cap, reset on a successful
/// connection.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Backoff {
    pub fn new() -> Self {
        Self { next: BASE_DELAY }
    }

    /// Delay to wait before the next reconnect attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_DELAY);
        delay
    }

    /// Call after a connection is established.
    pub fn reset(&mut self) {
        self.next = BASE_DELAY;
    }
}
