//! Per-relay connection state machine and the exponential back-off schedule.
//!
//! ```text
//! [disconnected] --connect()--> [connecting] --ok--> [connected]
//!      ^                              |
//!      |                              +--err--> [backoff(d)] --d elapsed--> [connecting]
//!      |                                              |
//!      |                                              +-- desired=false --> [closed]
//!      +-- observed loss --------- [connected]
//! ```

use std::time::Duration;

/// The back-off delay sequence, in seconds: 1, 2, 4, 8, 16, then 30 forever.
const BACKOFF_SCHEDULE_SECS: &[u64] = &[1, 2, 4, 8, 16, 30];

/// Observed/desired connection status for one relay endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting out a back-off delay before the next connect attempt.
    /// `attempt` is the 1-indexed count of consecutive failures so far.
    Backoff { attempt: u32 },
    /// Terminal: `disconnect()` was called. Never reconnects from here.
    Closed,
}

impl RelayState {
    pub fn is_connected(&self) -> bool {
        matches!(self, RelayState::Connected)
    }
}

/// The back-off delay for the `attempt`-th consecutive failure (1-indexed).
///
/// `1 => 1s, 2 => 2s, 3 => 4s, 4 => 8s, 5 => 16s, 6.. => 30s`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let idx = (attempt.saturating_sub(1)) as usize;
    let secs = BACKOFF_SCHEDULE_SECS
        .get(idx)
        .copied()
        .unwrap_or(*BACKOFF_SCHEDULE_SECS.last().unwrap());
    Duration::from_secs(secs)
}

/// Normalize a relay URL: ensure the path component ends with `/`.
///
/// `"wss://relay.example.com"` -> `"wss://relay.example.com/"`;
/// `"wss://relay.example.com/"` is left unchanged.
pub fn normalize_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule_matches_spec() {
        let expected = [1, 2, 4, 8, 16, 30, 30, 30];
        for (i, secs) in expected.iter().enumerate() {
            let attempt = (i + 1) as u32;
            assert_eq!(backoff_delay(attempt), Duration::from_secs(*secs), "attempt {attempt}");
        }
    }

    #[test]
    fn test_normalize_adds_trailing_slash() {
        assert_eq!(normalize_url("wss://relay.damus.io"), "wss://relay.damus.io/");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        assert_eq!(normalize_url("wss://relay.damus.io/"), "wss://relay.damus.io/");
    }

    #[test]
    fn test_normalize_preserves_path() {
        assert_eq!(normalize_url("wss://relay.example.com/v1"), "wss://relay.example.com/v1/");
    }
}
