//! Global atomic counters for critique engine observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    variations_evaluated: AtomicU64,
    evaluator_failures: AtomicU64,
    regenerations: AtomicU64,
    enhancements: AtomicU64,
    runs_approved: AtomicU64,
    runs_rejected: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            variations_evaluated: AtomicU64::new(0),
            evaluator_failures: AtomicU64::new(0),
            regenerations: AtomicU64::new(0),
            enhancements: AtomicU64::new(0),
            runs_approved: AtomicU64::new(0),
            runs_rejected: AtomicU64::new(0),
        }
    }

    /// Increment the variations-evaluated counter by one.
    pub fn inc_variations_evaluated(&self) {
        self.variations_evaluated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "variations_evaluated", "counter incremented");
    }

    pub fn inc_evaluator_failures(&self) {
        self.evaluator_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluator_failures", "counter incremented");
    }

    pub fn inc_regenerations(&self) {
        self.regenerations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "regenerations", "counter incremented");
    }

    pub fn inc_enhancements(&self) {
        self.enhancements.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "enhancements", "counter incremented");
    }

    pub fn inc_runs_approved(&self) {
        self.runs_approved.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_approved", "counter incremented");
    }

    pub fn inc_runs_rejected(&self) {
        self.runs_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_rejected", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a run, CLI exit)
    /// rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            variations_evaluated = self.variations_evaluated(),
            evaluator_failures = self.evaluator_failures(),
            regenerations = self.regenerations(),
            enhancements = self.enhancements(),
            runs_approved = self.runs_approved(),
            runs_rejected = self.runs_rejected(),
        );
    }

    pub fn variations_evaluated(&self) -> u64 {
        self.variations_evaluated.load(Ordering::Relaxed)
    }

    pub fn evaluator_failures(&self) -> u64 {
        self.evaluator_failures.load(Ordering::Relaxed)
    }

    pub fn regenerations(&self) -> u64 {
        self.regenerations.load(Ordering::Relaxed)
    }

    pub fn enhancements(&self) -> u64 {
        self.enhancements.load(Ordering::Relaxed)
    }

    pub fn runs_approved(&self) -> u64 {
        self.runs_approved.load(Ordering::Relaxed)
    }

    pub fn runs_rejected(&self) -> u64 {
        self.runs_rejected.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.variations_evaluated.store(0, Ordering::Relaxed);
        self.evaluator_failures.store(0, Ordering::Relaxed);
        self.regenerations.store(0, Ordering::Relaxed);
        self.enhancements.store(0, Ordering::Relaxed);
        self.runs_approved.store(0, Ordering::Relaxed);
        self.runs_rejected.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.variations_evaluated(), 0);
        m.inc_variations_evaluated();
        m.inc_variations_evaluated();
        assert_eq!(m.variations_evaluated(), 2);

        m.inc_evaluator_failures();
        assert_eq!(m.evaluator_failures(), 1);

        m.inc_regenerations();
        m.inc_enhancements();
        m.inc_runs_approved();
        m.inc_runs_rejected();
        m.inc_runs_rejected();
        assert_eq!(m.regenerations(), 1);
        assert_eq!(m.enhancements(), 1);
        assert_eq!(m.runs_approved(), 1);
        assert_eq!(m.runs_rejected(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_variations_evaluated();
        m.inc_regenerations();
        m.inc_runs_approved();
        m.reset();
        assert_eq!(m.variations_evaluated(), 0);
        assert_eq!(m.regenerations(), 0);
        assert_eq!(m.runs_approved(), 0);
    }
}
