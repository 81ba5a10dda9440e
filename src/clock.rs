//! Monotonic millisecond time sources.
//!
//! The protocol engine never reads wall-clock time directly. All timing
//! (liveness, sync period, parameter timeouts) goes through an injected
//! [`MonotonicClock`], which keeps the engine deterministic under test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic millisecond counter. Must never go backwards.
pub trait MonotonicClock: Send {
    /// Milliseconds since an arbitrary fixed origin.
    fn millis(&self) -> u64;
}

/// Real clock backed by [`Instant`], origin at construction.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for tests and simulation.
///
/// Clones share the same underlying counter, so a test can keep one handle
/// to advance time while the node owns another.
#[derive(Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `ms` milliseconds.
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }
}

impl MonotonicClock for ManualClock {
    fn millis(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}
