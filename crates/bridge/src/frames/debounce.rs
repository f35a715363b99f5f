// Mutation-burst debouncer for the frame observer.
//
// Coalesces rapid notifications within a configurable time window (default
// 40ms, range 0-500ms). Each notification resets the timer; draining yields
// the number of coalesced notifications.

use std::time::Duration;

use tokio::time::Instant;

/// Default debounce window.
pub const DEFAULT_DEBOUNCE_MS: u64 = 40;
/// Maximum allowed debounce window.
const MAX_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    pub window: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self { window: Duration::from_millis(DEFAULT_DEBOUNCE_MS) }
    }
}

impl DebounceConfig {
    /// Window of `ms` milliseconds, clamped to at most 500.
    pub fn with_millis(ms: u64) -> Self {
        Self { window: Duration::from_millis(ms.min(MAX_DEBOUNCE_MS)) }
    }
}

struct PendingBurst {
    count: usize,
    last_seen: Instant,
}

/// Coalesces a burst of notifications into one.
pub struct Debouncer {
    config: DebounceConfig,
    pending: Option<PendingBurst>,
}

impl Debouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self { config, pending: None }
    }

    pub fn push(&mut self) {
        self.push_at(Instant::now());
    }

    fn push_at(&mut self, now: Instant) {
        let burst = self.pending.get_or_insert(PendingBurst { count: 0, last_seen: now });
        burst.count += 1;
        burst.last_seen = now;
    }

    /// Size of the pending burst, if its window has elapsed.
    pub fn drain_ready(&mut self) -> Option<usize> {
        self.drain_ready_at(Instant::now())
    }

    fn drain_ready_at(&mut self, now: Instant) -> Option<usize> {
        if self.next_deadline().is_some_and(|deadline| now >= deadline) {
            self.pending.take().map(|burst| burst.count)
        } else {
            None
        }
    }

    /// When the pending burst becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|burst| burst.last_seen + self.config.window)
    }
}
