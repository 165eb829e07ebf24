//! Global atomic counters for MarkGuard.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the batch driver does so at the end).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations, no locking.
pub struct Metrics {
    pairs_analyzed: AtomicU64,
    reports_approved: AtomicU64,
    query_rewrites: AtomicU64,
    web_searches: AtomicU64,
    report_regenerations: AtomicU64,
    node_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            pairs_analyzed: AtomicU64::new(0),
            reports_approved: AtomicU64::new(0),
            query_rewrites: AtomicU64::new(0),
            web_searches: AtomicU64::new(0),
            report_regenerations: AtomicU64::new(0),
            node_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_pairs_analyzed(&self) {
        self.pairs_analyzed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "pairs_analyzed", "counter incremented");
    }

    pub fn inc_reports_approved(&self) {
        self.reports_approved.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "reports_approved", "counter incremented");
    }

    pub fn inc_query_rewrites(&self) {
        self.query_rewrites.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "query_rewrites", "counter incremented");
    }

    pub fn inc_web_searches(&self) {
        self.web_searches.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "web_searches", "counter incremented");
    }

    pub fn inc_report_regenerations(&self) {
        self.report_regenerations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "report_regenerations", "counter incremented");
    }

    /// A node fell back to its safe default.
    pub fn inc_node_failures(&self) {
        self.node_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "node_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            pairs_analyzed = self.pairs_analyzed(),
            reports_approved = self.reports_approved(),
            query_rewrites = self.query_rewrites(),
            web_searches = self.web_searches(),
            report_regenerations = self.report_regenerations(),
            node_failures = self.node_failures(),
        );
    }

    pub fn pairs_analyzed(&self) -> u64 {
        self.pairs_analyzed.load(Ordering::Relaxed)
    }

    pub fn reports_approved(&self) -> u64 {
        self.reports_approved.load(Ordering::Relaxed)
    }

    pub fn query_rewrites(&self) -> u64 {
        self.query_rewrites.load(Ordering::Relaxed)
    }

    pub fn web_searches(&self) -> u64 {
        self.web_searches.load(Ordering::Relaxed)
    }

    pub fn report_regenerations(&self) -> u64 {
        self.report_regenerations.load(Ordering::Relaxed)
    }

    pub fn node_failures(&self) -> u64 {
        self.node_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.pairs_analyzed.store(0, Ordering::Relaxed);
        self.reports_approved.store(0, Ordering::Relaxed);
        self.query_rewrites.store(0, Ordering::Relaxed);
        self.web_searches.store(0, Ordering::Relaxed);
        self.report_regenerations.store(0, Ordering::Relaxed);
        self.node_failures.store(0, Ordering::Relaxed);
    }
}
