//! Time sources for the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use agora_types::Timestamp;

/// Supplies the current logical time in seconds.
///
/// Readings should be nonzero; the engine treats a zero reading as 1.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time (Unix seconds).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp().max(1) as Timestamp
    }
}

/// A manually driven clock for simulations and tests.
///
/// Only moves forward: [`ManualClock::set`] ignores readings earlier than the
/// current one.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Advance by `seconds`, returning the new reading.
    pub fn advance(&self, seconds: u64) -> Timestamp {
        let previous = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(seconds))
            })
            .unwrap_or_else(|t| t);
        previous.saturating_add(seconds)
    }

    pub fn set(&self, to: Timestamp) {
        self.now.fetch_max(to, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
