//! Metrics collection for observability
//!
//! Prometheus metrics for the purchase path.
//!
//! # Metrics
//!
//! - `market_purchases_total` - Completed purchases
//! - `market_purchase_failures_total` - Rejected purchases (typed failures)
//! - `market_purchase_conflicts_total` - Optimistic conflicts retried
//! - `market_purchase_duration_seconds` - Histogram of settlement latencies
//! - `market_ownership_records_total` - Ownership record count estimate

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Completed purchases
    pub purchases_total: IntCounter,

    /// Rejected purchases
    pub purchase_failures_total: IntCounter,

    /// Conflicts retried
    pub purchase_conflicts_total: IntCounter,

    /// Settlement latency histogram
    pub purchase_duration: Histogram,

    /// Ownership record count estimate
    pub records_total: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let purchases_total = IntCounter::with_opts(Opts::new(
            "market_purchases_total",
            "Completed purchases",
        ))?;
        registry.register(Box::new(purchases_total.clone()))?;

        let purchase_failures_total = IntCounter::with_opts(Opts::new(
            "market_purchase_failures_total",
            "Rejected purchases",
        ))?;
        registry.register(Box::new(purchase_failures_total.clone()))?;

        let purchase_conflicts_total = IntCounter::with_opts(Opts::new(
            "market_purchase_conflicts_total",
            "Optimistic conflicts retried",
        ))?;
        registry.register(Box::new(purchase_conflicts_total.clone()))?;

        let purchase_duration = Histogram::with_opts(
            HistogramOpts::new(
                "market_purchase_duration_seconds",
                "Histogram of settlement latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(purchase_duration.clone()))?;

        let records_total = IntGauge::with_opts(Opts::new(
            "market_ownership_records_total",
            "Ownership record count estimate",
        ))?;
        registry.register(Box::new(records_total.clone()))?;

        Ok(Self {
            purchases_total,
            purchase_failures_total,
            purchase_conflicts_total,
            purchase_duration,
            records_total,
            registry,
        })
    }

    /// Record a completed purchase
    pub fn record_purchase(&self, duration_seconds: f64) {
        self.purchases_total.inc();
        self.purchase_duration.observe(duration_seconds);
    }

    /// Record a rejected purchase
    pub fn record_failure(&self) {
        self.purchase_failures_total.inc();
    }

    /// Record an optimistic conflict
    pub fn record_conflict(&self) {
        self.purchase_conflicts_total.inc();
    }

    /// Update the record count estimate
    pub fn update_records_total(&self, count: i64) {
        self.records_total.set(count);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.purchases_total.get(), 0);
        assert_eq!(metrics.purchase_failures_total.get(), 0);
    }

    #[test]
    fn test_record_purchase() {
        let metrics = Metrics::new().unwrap();
        metrics.record_purchase(0.002);
        metrics.record_purchase(0.004);
        assert_eq!(metrics.purchases_total.get(), 2);
    }

    #[test]
    fn test_record_failure_and_conflict() {
        let metrics = Metrics::new().unwrap();
        metrics.record_failure();
        metrics.record_conflict();
        metrics.record_conflict();
        assert_eq!(metrics.purchase_failures_total.get(), 1);
        assert_eq!(metrics.purchase_conflicts_total.get(), 2);
    }

    #[test]
    fn test_update_records_total() {
        let metrics = Metrics::new().unwrap();
        metrics.update_records_total(42);
        assert_eq!(metrics.records_total.get(), 42);
    }
}
