//! Errors raised by the log and its consumers.

use std::error::Error;

use thiserror::Error;

/// Failures of the partitioned log or a partition consumer.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A partition index outside the log's range was requested.
    #[error("unknown log partition")]
    UnknownPartition {
        /// Stream name.
        stream: String,
        /// Requested partition.
        partition: u32,
        /// Number of partitions the stream has.
        partitions: u32,
    },
    /// The log no longer accepts appends.
    #[error("log is closed")]
    Closed {
        /// Stream name.
        stream: String,
    },
    /// Extracting entries from a record failed.
    #[error("failed to extract batch entries")]
    Extract {
        /// Partition being consumed.
        partition: u32,
        /// Offset of the offending record.
        offset: u64,
        /// Underlying failure reported by the processor.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The processing hook rejected a batch.
    #[error("batch processing failed")]
    Processing {
        /// Partition being consumed.
        partition: u32,
        /// Entries in the rejected batch.
        entries: usize,
        /// Underlying failure reported by the processor.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The consumer task panicked or was aborted.
    #[error("consumer task failed")]
    Join {
        /// Partition the task was consuming.
        partition: u32,
        /// Runtime join failure.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl StreamError {
    /// Partition associated with the failure, when there is one.
    #[must_use]
    pub const fn partition(&self) -> Option<u32> {
        match self {
            Self::UnknownPartition { partition, .. }
            | Self::Extract { partition, .. }
            | Self::Processing { partition, .. }
            | Self::Join { partition, .. } => Some(*partition),
            Self::Closed { .. } => None,
        }
    }
}

/// Convenience alias for stream results.
pub type StreamResult<T> = Result<T, StreamError>;
