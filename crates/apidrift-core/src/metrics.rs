//! Atomic batch counters.
//!
//! Updated by every finishing unit from any worker. Call
//! [`BatchCounters::flush`] to emit the current values as a single
//! `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// One completed unit, in the high half of the packed word.
const COMPLETED_ONE: u64 = 1 << 32;
const SUCCEEDED_MASK: u64 = COMPLETED_ONE - 1;

/// Completed and succeeded units of one run. No locking.
///
/// Both counts share one word, so every update and every read sees a pair
/// in which `succeeded <= completed`.
#[derive(Debug, Default)]
pub struct BatchCounters {
    packed: AtomicU64,
}

impl BatchCounters {
    pub const fn new() -> Self {
        Self {
            packed: AtomicU64::new(0),
        }
    }

    /// Record one finished unit. Returns `(completed, succeeded)` after the
    /// update.
    pub fn record(&self, success: bool) -> (u64, u64) {
        let delta = COMPLETED_ONE + u64::from(success);
        let after = self.packed.fetch_add(delta, Ordering::AcqRel) + delta;
        let (completed, succeeded) = unpack(after);
        tracing::trace!(completed, succeeded, "counter incremented");
        (completed, succeeded)
    }

    /// Both counts from one load.
    pub fn snapshot(&self) -> (u64, u64) {
        unpack(self.packed.load(Ordering::Acquire))
    }

    pub fn completed(&self) -> u64 {
        self.snapshot().0
    }

    pub fn succeeded(&self) -> u64 {
        self.snapshot().1
    }

    /// Emit both counters as one `info!` event.
    pub fn flush(&self) {
        let (completed, succeeded) = self.snapshot();
        tracing::info!(metric = "flush", completed, succeeded);
    }

    /// Reset both counters to zero.
    pub fn reset(&self) {
        self.packed.store(0, Ordering::Release);
    }
}

fn unpack(packed: u64) -> (u64, u64) {
    (packed >> 32, packed & SUCCEEDED_MASK)
}
