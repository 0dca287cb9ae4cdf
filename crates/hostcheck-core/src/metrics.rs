//! Global atomic counters for check and repair activity.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a repair pass).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    checks_run: AtomicU64,
    checks_failed: AtomicU64,
    repairs_attempted: AtomicU64,
    repairs_succeeded: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            checks_run: AtomicU64::new(0),
            checks_failed: AtomicU64::new(0),
            repairs_attempted: AtomicU64::new(0),
            repairs_succeeded: AtomicU64::new(0),
        }
    }

    /// A checker's `verify` was invoked.
    pub fn inc_checks_run(&self) {
        self.checks_run.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "checks_run", "counter incremented");
    }

    pub fn inc_checks_failed(&self) {
        self.checks_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "checks_failed", "counter incremented");
    }

    /// A fixer's `repair` was invoked.
    pub fn inc_repairs_attempted(&self) {
        self.repairs_attempted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "repairs_attempted", "counter incremented");
    }

    pub fn inc_repairs_succeeded(&self) {
        self.repairs_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "repairs_succeeded", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            checks_run = self.checks_run(),
            checks_failed = self.checks_failed(),
            repairs_attempted = self.repairs_attempted(),
            repairs_succeeded = self.repairs_succeeded(),
        );
    }

    pub fn checks_run(&self) -> u64 {
        self.checks_run.load(Ordering::Relaxed)
    }

    pub fn checks_failed(&self) -> u64 {
        self.checks_failed.load(Ordering::Relaxed)
    }

    pub fn repairs_attempted(&self) -> u64 {
        self.repairs_attempted.load(Ordering::Relaxed)
    }

    pub fn repairs_succeeded(&self) -> u64 {
        self.repairs_succeeded.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.checks_run.store(0, Ordering::Relaxed);
        self.checks_failed.store(0, Ordering::Relaxed);
        self.repairs_attempted.store(0, Ordering::Relaxed);
        self.repairs_succeeded.store(0, Ordering::Relaxed);
    }
}
