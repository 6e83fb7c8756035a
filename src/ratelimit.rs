//! Per-client request admission control.
//!
//! Fixed windows with lazy reset: a counter restarts the first time a key is
//! seen after its window expired, no background sweeper. Two independent
//! classes exist per client: `General` covers every inbound request, `Send`
//! is charged additionally for message sends, so a send must pass both.
//! Entries are created on first observation and live for the process
//! lifetime.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Requests admitted per key per window for the `General` class.
pub const GENERAL_LIMIT: u32 = 60;
/// Requests admitted per key per window for the `Send` class.
pub const SEND_LIMIT: u32 = 30;
/// Window length shared by both classes.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Admission class, each with its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// Every inbound request.
    General,
    /// Message-send requests, charged on top of `General`.
    Send,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

struct Window {
    count: u32,
    reset_at: Instant,
}

/// Admission controller keyed by `(client, class)`.
///
/// The dashmap entry guard gives per-key mutual exclusion, so concurrent
/// handlers cannot lose increments for the same client.
pub struct RateLimiter {
    windows: DashMap<(String, Class), Window>,
    window: Duration,
    general_limit: u32,
    send_limit: u32,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_config(WINDOW, GENERAL_LIMIT, SEND_LIMIT)
    }

    /// Custom window and limits, used by tests with short windows.
    pub fn with_config(window: Duration, general_limit: u32, send_limit: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            general_limit,
            send_limit,
        }
    }

    fn limit(&self, class: Class) -> u32 {
        match class {
            Class::General => self.general_limit,
            Class::Send => self.send_limit,
        }
    }

    /// Charge one request against `(key, class)` and decide admission.
    pub fn check(&self, key: &str, class: Class) -> Decision {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry((key.to_string(), class))
            .or_insert_with(|| Window {
                count: 0,
                reset_at: now + self.window,
            });

        if now > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        entry.count += 1;

        if entry.count > self.limit(class) {
            Decision::Reject {
                retry_after: entry.reset_at.saturating_duration_since(now),
            }
        } else {
            Decision::Allow
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
