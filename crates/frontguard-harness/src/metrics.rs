//! Global counters for a corpus pass.
//!
//! Counters are bumped at the call site; [`Metrics::flush`] emits them as one
//! `tracing::info!` event at the end of a pass.

use frontguard_domain::Outcome;
use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    fixtures_run: AtomicU64,
    crashes_observed: AtomicU64,
    timeouts_observed: AtomicU64,
    harness_errors: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            fixtures_run: AtomicU64::new(0),
            crashes_observed: AtomicU64::new(0),
            timeouts_observed: AtomicU64::new(0),
            harness_errors: AtomicU64::new(0),
        }
    }

    /// Count one finished fixture under its observed outcome.
    pub fn record_outcome(&self, outcome: Outcome) {
        self.fixtures_run.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            Outcome::Crash => &self.crashes_observed,
            Outcome::Timeout => &self.timeouts_observed,
            Outcome::HarnessError => &self.harness_errors,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = outcome.name(), "counter incremented");
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            fixtures_run = self.fixtures_run(),
            crashes_observed = self.crashes_observed(),
            timeouts_observed = self.timeouts_observed(),
            harness_errors = self.harness_errors(),
        );
    }

    pub fn fixtures_run(&self) -> u64 {
        self.fixtures_run.load(Ordering::Relaxed)
    }

    pub fn crashes_observed(&self) -> u64 {
        self.crashes_observed.load(Ordering::Relaxed)
    }

    pub fn timeouts_observed(&self) -> u64 {
        self.timeouts_observed.load(Ordering::Relaxed)
    }

    pub fn harness_errors(&self) -> u64 {
        self.harness_errors.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.fixtures_run.store(0, Ordering::Relaxed);
        self.crashes_observed.store(0, Ordering::Relaxed);
        self.timeouts_observed.store(0, Ordering::Relaxed);
        self.harness_errors.store(0, Ordering::Relaxed);
    }
}
