//! Records as appended to and read back from the log.

use chrono::{DateTime, Utc};

/// Keyed payload stored in one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Routing key; equal keys share a partition.
    pub key: String,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
    /// Wall-clock time the record was appended.
    pub appended_at: DateTime<Utc>,
}

impl Record {
    /// Build a record stamped with the current time.
    #[must_use]
    pub fn new(key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            payload,
            appended_at: Utc::now(),
        }
    }
}

/// A record together with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    /// Partition the record was read from.
    pub partition: u32,
    /// Zero-based offset within the partition.
    pub offset: u64,
    /// The record itself.
    pub record: Record,
}
