//! Size and latency bounded batching over one log partition.
//!
//! A consumer accumulates entries extracted from records and hands them to a
//! [`BatchProcessor`] when either the buffer reaches `batch_size` or the timer
//! deadline passes. The deadline is re-armed after every timer flush and is
//! not moved by size or forced flushes.

use std::future::Future;

use async_trait::async_trait;
use sheaf_config::BatchOptions;
use sheaf_telemetry::{FlushReason, Metrics};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::error::{StreamError, StreamResult};
use crate::log::RecordSource;
use crate::record::Record;

/// Action-specific processing hook driven by a [`BatchingConsumer`].
///
/// Errors from either method stop the partition's consumer; the consumer does
/// not retry. Hooks that need retries or poison-record handling implement
/// them internally.
#[async_trait]
pub trait BatchProcessor: Send {
    /// Logical unit accumulated into batches.
    type Entry: Send;

    /// Extract zero or more entries from a record.
    ///
    /// # Errors
    ///
    /// Returns an error when the record cannot be interpreted.
    fn entries_from_record(&mut self, record: &Record) -> anyhow::Result<Vec<Self::Entry>>;

    /// Whether `record` is a control record that flushes the buffer at once.
    ///
    /// A forcing record contributes no entries of its own.
    fn force_flush(&self, _record: &Record) -> bool {
        false
    }

    /// Handle one batch, in buffer order. Timer flushes may pass an empty batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch could not be processed.
    async fn process_batch(&mut self, entries: Vec<Self::Entry>) -> anyhow::Result<()>;
}

/// Counters describing one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerSummary {
    /// Partition that was consumed.
    pub partition: u32,
    /// Records read from the source.
    pub records: u64,
    /// Calls made to [`BatchProcessor::process_batch`].
    pub flushes: u64,
    /// Entries handed to the processor.
    pub entries_flushed: u64,
    /// Buffered entries dropped at shutdown.
    pub entries_discarded: usize,
}

/// Single-partition batching loop.
#[derive(Clone)]
pub struct BatchingConsumer {
    partition: u32,
    options: BatchOptions,
    metrics: Option<Metrics>,
}

impl BatchingConsumer {
    /// Consumer for `partition` using the given flush policy.
    #[must_use]
    pub const fn new(partition: u32, options: BatchOptions) -> Self {
        Self {
            partition,
            options,
            metrics: None,
        }
    }

    /// Report flushes and liveness to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Flush policy in effect.
    #[must_use]
    pub const fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Drain `source` into `processor` until `shutdown` resolves or the source ends.
    ///
    /// Buffered entries left at the end are discarded unless
    /// `flush_on_shutdown` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Extract`] or [`StreamError::Processing`] when the
    /// processor fails; the consumer stops at the first failure.
    pub async fn run<S, P, F>(
        &self,
        mut source: S,
        mut processor: P,
        shutdown: F,
    ) -> StreamResult<ConsumerSummary>
    where
        S: RecordSource,
        P: BatchProcessor,
        F: Future + Send,
    {
        if let Some(metrics) = &self.metrics {
            metrics.inc_active_partitions();
        }
        info!(
            partition = self.partition,
            batch_size = self.options.batch_size,
            batch_threshold = ?self.options.batch_threshold,
            "batching consumer started"
        );

        let result = self.drive(&mut source, &mut processor, shutdown).await;

        if let Some(metrics) = &self.metrics {
            metrics.dec_active_partitions();
        }
        match &result {
            Ok(summary) => info!(
                partition = self.partition,
                records = summary.records,
                flushes = summary.flushes,
                "batching consumer stopped"
            ),
            Err(err) => warn!(partition = self.partition, error = %err, "batching consumer failed"),
        }
        result
    }

    async fn drive<S, P, F>(
        &self,
        source: &mut S,
        processor: &mut P,
        shutdown: F,
    ) -> StreamResult<ConsumerSummary>
    where
        S: RecordSource,
        P: BatchProcessor,
        F: Future + Send,
    {
        let threshold = self.options.batch_threshold;
        let mut buffer = Vec::with_capacity(self.options.batch_size);
        let mut summary = ConsumerSummary {
            partition: self.partition,
            ..ConsumerSummary::default()
        };
        let mut deadline = Instant::now() + threshold;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                () = sleep_until(deadline) => {
                    self.flush(processor, &mut buffer, FlushReason::Timer, &mut summary)
                        .await?;
                    deadline = Instant::now() + threshold;
                }
                next = source.next_record() => {
                    let Some(read) = next else { break };
                    summary.records += 1;
                    if processor.force_flush(&read.record) {
                        debug!(partition = self.partition, offset = read.offset, "control record forces flush");
                        self.flush(processor, &mut buffer, FlushReason::Forced, &mut summary)
                            .await?;
                        continue;
                    }
                    let entries = processor.entries_from_record(&read.record).map_err(|source| {
                        StreamError::Extract {
                            partition: self.partition,
                            offset: read.offset,
                            source: source.into(),
                        }
                    })?;
                    buffer.extend(entries);
                    if buffer.len() >= self.options.batch_size {
                        self.flush(processor, &mut buffer, FlushReason::Size, &mut summary)
                            .await?;
                    }
                }
            }
        }

        if buffer.is_empty() {
            return Ok(summary);
        }
        if self.options.flush_on_shutdown {
            self.flush(processor, &mut buffer, FlushReason::Shutdown, &mut summary)
                .await?;
        } else {
            warn!(
                partition = self.partition,
                entries = buffer.len(),
                "discarding unflushed batch entries"
            );
            summary.entries_discarded = buffer.len();
        }
        Ok(summary)
    }

    async fn flush<P>(
        &self,
        processor: &mut P,
        buffer: &mut Vec<P::Entry>,
        reason: FlushReason,
        summary: &mut ConsumerSummary,
    ) -> StreamResult<()>
    where
        P: BatchProcessor,
    {
        let batch = std::mem::replace(buffer, Vec::with_capacity(self.options.batch_size));
        let entries = batch.len();
        if entries > 0 {
            debug!(
                partition = self.partition,
                entries,
                reason = reason.as_str(),
                "flushing batch"
            );
        }
        processor
            .process_batch(batch)
            .await
            .map_err(|source| StreamError::Processing {
                partition: self.partition,
                entries,
                source: source.into(),
            })?;

        summary.flushes += 1;
        summary.entries_flushed += u64::try_from(entries).unwrap_or(u64::MAX);
        if let Some(metrics) = &self.metrics {
            metrics.observe_flush(reason, entries);
        }
        Ok(())
    }
}
