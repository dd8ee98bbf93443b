//! Processing hook for the command stream.
//!
//! Decodes each logged command and records its receipt. Executing the action
//! itself belongs to downstream executors.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use sheaf_core::{BulkActionId, BulkCommand, decode_command};
use sheaf_stream::{BatchProcessor, Record};
use tracing::info;

/// A command read back from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledCommand {
    /// Action the command belongs to.
    pub id: BulkActionId,
    /// The decoded command.
    pub command: BulkCommand,
}

/// Shared count of commands handed to the hook across partitions.
#[derive(Debug, Clone, Default)]
pub struct ReceiptCounter(Arc<AtomicU64>);

impl ReceiptCounter {
    /// Commands received so far.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn record(&self, count: u64) {
        self.0.fetch_add(count, Ordering::Relaxed);
    }
}

/// Hook that logs every scheduled command batch.
pub struct ScheduledCommandHook {
    partition: u32,
    receipts: ReceiptCounter,
}

impl ScheduledCommandHook {
    /// Hook for `partition` reporting into `receipts`.
    #[must_use]
    pub const fn new(partition: u32, receipts: ReceiptCounter) -> Self {
        Self {
            partition,
            receipts,
        }
    }
}

#[async_trait]
impl BatchProcessor for ScheduledCommandHook {
    type Entry = ScheduledCommand;

    fn entries_from_record(&mut self, record: &Record) -> anyhow::Result<Vec<ScheduledCommand>> {
        let id = record
            .key
            .parse::<BulkActionId>()
            .context("record key is not a bulk action id")?;
        let command = decode_command(&record.payload).context("record payload is not a command")?;
        Ok(vec![ScheduledCommand { id, command }])
    }

    async fn process_batch(&mut self, entries: Vec<ScheduledCommand>) -> anyhow::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        for entry in &entries {
            info!(
                partition = self.partition,
                bulk_action_id = %entry.id,
                repository = %entry.command.repository,
                action = entry.command.action.as_deref().unwrap_or("-"),
                "bulk command received"
            );
        }
        self.receipts
            .record(u64::try_from(entries.len()).unwrap_or(u64::MAX));
        Ok(())
    }
}
