//! One batching consumer task per log partition.

use sheaf_config::BatchOptions;
use sheaf_telemetry::Metrics;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::batch::{BatchProcessor, BatchingConsumer, ConsumerSummary};
use crate::error::{StreamError, StreamResult};
use crate::log::MemoryLog;

/// Handle to a running partition consumer.
///
/// Dropping the handle also stops the consumer.
pub struct ConsumerHandle {
    partition: u32,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<StreamResult<ConsumerSummary>>,
}

impl ConsumerHandle {
    /// Partition consumed by this task.
    #[must_use]
    pub const fn partition(&self) -> u32 {
        self.partition
    }

    /// `true` once the consumer task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the consumer to stop and wait for its outcome.
    ///
    /// # Errors
    ///
    /// Returns the consumer's own failure, or [`StreamError::Join`] if the
    /// task panicked.
    pub async fn shutdown(mut self) -> StreamResult<ConsumerSummary> {
        if let Some(stop) = self.stop.take() {
            // the task may already have exited on its own
            let _ = stop.send(());
        }
        let partition = self.partition;
        (&mut self.task)
            .await
            .map_err(|source| StreamError::Join { partition, source })?
    }

    /// Wait for the consumer to finish on its own, typically after the log
    /// was closed, without signalling it to stop.
    ///
    /// # Errors
    ///
    /// Same as [`ConsumerHandle::shutdown`].
    pub async fn join(self) -> StreamResult<ConsumerSummary> {
        let Self {
            partition,
            stop,
            task,
        } = self;
        let outcome = task.await;
        drop(stop);
        outcome.map_err(|source| StreamError::Join { partition, source })?
    }
}

/// Start one consumer per partition of `log`, building each processor with `factory`.
///
/// # Errors
///
/// Returns [`StreamError::UnknownPartition`] if a tailer cannot be opened.
pub fn spawn_partition_consumers<F, P>(
    log: &MemoryLog,
    options: BatchOptions,
    metrics: Option<&Metrics>,
    mut factory: F,
) -> StreamResult<Vec<ConsumerHandle>>
where
    F: FnMut(u32) -> P,
    P: BatchProcessor + 'static,
    P::Entry: 'static,
{
    (0..log.partitions())
        .map(|partition| {
            let tailer = log.tailer(partition)?;
            let processor = factory(partition);
            let mut consumer = BatchingConsumer::new(partition, options);
            if let Some(metrics) = metrics {
                consumer = consumer.with_metrics(metrics.clone());
            }
            let (stop, stopped) = oneshot::channel::<()>();
            let task = tokio::spawn(async move {
                consumer
                    .run(tailer, processor, async move {
                        let _ = stopped.await;
                    })
                    .await
            });
            debug!(stream = log.name(), partition, "partition consumer spawned");
            Ok(ConsumerHandle {
                partition,
                stop: Some(stop),
                task,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct KeyCollector {
        partition: u32,
        seen: Arc<Mutex<Vec<(u32, String)>>>,
    }

    #[async_trait]
    impl BatchProcessor for KeyCollector {
        type Entry = String;

        fn entries_from_record(&mut self, record: &Record) -> anyhow::Result<Vec<String>> {
            Ok(vec![record.key.clone()])
        }

        async fn process_batch(&mut self, entries: Vec<String>) -> anyhow::Result<()> {
            let mut seen = self.seen.lock().unwrap();
            seen.extend(entries.into_iter().map(|key| (self.partition, key)));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_partition_gets_its_own_consumer() {
        let log = MemoryLog::new("documentSet", 3);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let metrics = Metrics::new().unwrap();
        let handles = spawn_partition_consumers(
            &log,
            BatchOptions::default(),
            Some(&metrics),
            |partition| KeyCollector {
                partition,
                seen: Arc::clone(&seen),
            },
        )
        .unwrap();
        assert_eq!(handles.len(), 3);

        let keys: Vec<String> = (0..30).map(|n| format!("action-{n}")).collect();
        for key in &keys {
            log.append_record(key, Vec::new()).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(metrics.snapshot().consumer_partitions_active, 3);

        let mut total = 0;
        for handle in handles {
            let partition = handle.partition();
            let summary = handle.shutdown().await.unwrap();
            assert_eq!(summary.partition, partition);
            total += summary.records;
        }
        assert_eq!(total, 30);
        assert_eq!(metrics.snapshot().consumer_partitions_active, 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 30);
        for (partition, key) in seen.iter() {
            assert_eq!(log.partition_for(key), *partition);
        }
    }

    #[tokio::test]
    async fn closed_log_lets_consumers_finish() {
        let log = MemoryLog::new("documentSet", 2);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handles = spawn_partition_consumers(&log, BatchOptions::default(), None, |partition| {
            KeyCollector {
                partition,
                seen: Arc::clone(&seen),
            }
        })
        .unwrap();

        log.close();
        while !handles.iter().all(ConsumerHandle::is_finished) {
            tokio::task::yield_now().await;
        }
        for handle in handles {
            let summary = handle.join().await.unwrap();
            assert_eq!(summary.records, 0);
        }
    }

    #[tokio::test]
    async fn join_drains_a_closed_log() {
        let log = MemoryLog::new("documentSet", 1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let options = BatchOptions {
            flush_on_shutdown: true,
            ..BatchOptions::default()
        };
        let handles = spawn_partition_consumers(&log, options, None, |partition| KeyCollector {
            partition,
            seen: Arc::clone(&seen),
        })
        .unwrap();

        for n in 0..5 {
            log.append_record(&format!("action-{n}"), Vec::new()).unwrap();
        }
        log.close();

        let summaries: Vec<ConsumerSummary> = {
            let mut summaries = Vec::new();
            for handle in handles {
                summaries.push(handle.join().await.unwrap());
            }
            summaries
        };
        assert_eq!(summaries[0].records, 5);
        assert_eq!(seen.lock().unwrap().len(), 5);
    }
}
