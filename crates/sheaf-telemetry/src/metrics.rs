//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters that describe submissions, status reads, and batch flushes.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{CollectorStage, Result, TelemetryError};

/// Why a batching consumer handed its buffer to the processing hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The buffer reached the configured batch size.
    Size,
    /// The batch latency deadline elapsed.
    Timer,
    /// A control record requested an immediate flush.
    Forced,
    /// The consumer was stopping with flush-on-shutdown enabled.
    Shutdown,
}

impl FlushReason {
    /// Label value used in metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Timer => "timer",
            Self::Forced => "forced",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    bulk_actions_submitted_total: IntCounter,
    bulk_actions_rejected_total: IntCounter,
    bulk_status_reads_total: IntCounterVec,
    batch_flushes_total: IntCounterVec,
    batch_entries_total: IntCounter,
    consumer_partitions_active: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Bulk actions accepted and logged.
    pub bulk_actions_submitted_total: u64,
    /// Bulk actions rejected before submission.
    pub bulk_actions_rejected_total: u64,
    /// Entries handed to processing hooks.
    pub batch_entries_total: u64,
    /// Partition consumers currently running.
    pub consumer_partitions_active: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let bulk_actions_submitted_total = register(
            &registry,
            "bulk_actions_submitted_total",
            IntCounter::with_opts(Opts::new(
                "bulk_actions_submitted_total",
                "Bulk actions persisted and appended to the command stream",
            )),
        )?;
        let bulk_actions_rejected_total = register(
            &registry,
            "bulk_actions_rejected_total",
            IntCounter::with_opts(Opts::new(
                "bulk_actions_rejected_total",
                "Bulk actions rejected before any state was persisted",
            )),
        )?;
        let bulk_status_reads_total = register(
            &registry,
            "bulk_status_reads_total",
            IntCounterVec::new(
                Opts::new("bulk_status_reads_total", "Bulk status lookups by outcome"),
                &["outcome"],
            ),
        )?;
        let batch_flushes_total = register(
            &registry,
            "batch_flushes_total",
            IntCounterVec::new(
                Opts::new("batch_flushes_total", "Batch flushes by trigger"),
                &["reason"],
            ),
        )?;
        let batch_entries_total = register(
            &registry,
            "batch_entries_total",
            IntCounter::with_opts(Opts::new(
                "batch_entries_total",
                "Entries delivered to batch processing hooks",
            )),
        )?;
        let consumer_partitions_active = register(
            &registry,
            "consumer_partitions_active",
            IntGauge::with_opts(Opts::new(
                "consumer_partitions_active",
                "Partition consumers currently running",
            )),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                bulk_actions_submitted_total,
                bulk_actions_rejected_total,
                bulk_status_reads_total,
                batch_flushes_total,
                batch_entries_total,
                consumer_partitions_active,
            }),
        })
    }

    /// Increment the accepted submission counter.
    pub fn inc_bulk_submitted(&self) {
        self.inner.bulk_actions_submitted_total.inc();
    }

    /// Increment the rejected submission counter.
    pub fn inc_bulk_rejected(&self) {
        self.inner.bulk_actions_rejected_total.inc();
    }

    /// Increment the status lookup counter for the given outcome.
    pub fn inc_status_read(&self, outcome: &str) {
        self.inner
            .bulk_status_reads_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a batch flush and the number of entries it carried.
    pub fn observe_flush(&self, reason: FlushReason, entries: usize) {
        self.inner
            .batch_flushes_total
            .with_label_values(&[reason.as_str()])
            .inc();
        self.inner
            .batch_entries_total
            .inc_by(u64::try_from(entries).unwrap_or(u64::MAX));
    }

    /// Count a partition consumer as started.
    pub fn inc_active_partitions(&self) {
        self.inner.consumer_partitions_active.inc();
    }

    /// Count a partition consumer as stopped.
    pub fn dec_active_partitions(&self) {
        self.inner.consumer_partitions_active.dec();
    }

    /// Number of flushes recorded for `reason`.
    #[must_use]
    pub fn flushes(&self, reason: FlushReason) -> u64 {
        self.inner
            .batch_flushes_total
            .with_label_values(&[reason.as_str()])
            .get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Exposition {
                source: Box::new(source),
            })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::Exposition {
            source: Box::new(source),
        })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bulk_actions_submitted_total: self.inner.bulk_actions_submitted_total.get(),
            bulk_actions_rejected_total: self.inner.bulk_actions_rejected_total.get(),
            batch_entries_total: self.inner.batch_entries_total.get(),
            consumer_partitions_active: self.inner.consumer_partitions_active.get(),
        }
    }
}

fn register<C>(
    registry: &Registry,
    name: &'static str,
    collector: prometheus::Result<C>,
) -> Result<C>
where
    C: Collector + Clone + 'static,
{
    let collector = collector.map_err(|source| TelemetryError::Collector {
        metric: name,
        stage: CollectorStage::Build,
        source,
    })?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::Collector {
            metric: name,
            stage: CollectorStage::Register,
            source,
        })?;
    Ok(collector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_bulk_submitted();
        metrics.inc_bulk_submitted();
        metrics.inc_bulk_rejected();
        metrics.inc_status_read("found");
        metrics.observe_flush(FlushReason::Size, 10);
        metrics.observe_flush(FlushReason::Timer, 3);
        metrics.observe_flush(FlushReason::Timer, 0);
        metrics.inc_active_partitions();
        metrics.inc_active_partitions();
        metrics.dec_active_partitions();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.bulk_actions_submitted_total, 2);
        assert_eq!(snapshot.bulk_actions_rejected_total, 1);
        assert_eq!(snapshot.batch_entries_total, 13);
        assert_eq!(snapshot.consumer_partitions_active, 1);
        assert_eq!(metrics.flushes(FlushReason::Timer), 2);
        assert_eq!(metrics.flushes(FlushReason::Forced), 0);

        let rendered = metrics.render()?;
        assert!(rendered.contains("bulk_actions_submitted_total"));
        assert!(rendered.contains("batch_flushes_total{reason=\"size\"} 1"));
        Ok(())
    }

    #[test]
    fn registries_are_independent() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_bulk_submitted();
        assert_eq!(second.snapshot().bulk_actions_submitted_total, 0);
        Ok(())
    }

    #[test]
    fn collector_setup_failures_carry_the_metric() {
        let registry = Registry::new();
        register(
            &registry,
            "bulk_actions_submitted_total",
            IntCounter::new("bulk_actions_submitted_total", "help"),
        )
        .unwrap();

        let duplicate = register(
            &registry,
            "bulk_actions_submitted_total",
            IntCounter::new("bulk_actions_submitted_total", "help"),
        )
        .unwrap_err();
        assert!(matches!(
            duplicate,
            TelemetryError::Collector {
                stage: CollectorStage::Register,
                ..
            }
        ));
        assert_eq!(duplicate.metric(), Some("bulk_actions_submitted_total"));

        let invalid = register(&registry, "bad name", IntCounter::new("bad name", "help"))
            .unwrap_err();
        assert!(matches!(
            invalid,
            TelemetryError::Collector {
                stage: CollectorStage::Build,
                metric: "bad name",
                ..
            }
        ));
    }
}
