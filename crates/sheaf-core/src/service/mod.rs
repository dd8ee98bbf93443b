//! Collaborator contracts: the status key/value store and the partitioned log.
//!
//! Both are consumed only through these traits. Implementations guarantee
//! atomicity per single key (store) and per single append (log); nothing
//! spans the two.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Durable key/value store holding bulk status fields.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Store `value` under `key`; `None` removes the key.
    async fn put(&self, key: &str, value: Option<Vec<u8>>) -> anyhow::Result<()>;

    /// Fetch the value stored under `key`.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Store a UTF-8 string.
    async fn put_string(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.put(key, Some(value.as_bytes().to_vec())).await
    }

    /// Fetch a UTF-8 string.
    async fn get_string(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.get(key)
            .await?
            .map(|bytes| {
                String::from_utf8(bytes).with_context(|| format!("value for '{key}' is not utf-8"))
            })
            .transpose()
    }

    /// Store an integer as decimal text.
    async fn put_long(&self, key: &str, value: u64) -> anyhow::Result<()> {
        self.put_string(key, &value.to_string()).await
    }

    /// Fetch an integer stored as decimal text.
    async fn get_long(&self, key: &str) -> anyhow::Result<Option<u64>> {
        match self.get_string(key).await? {
            Some(text) => text
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| anyhow!("value for '{key}' is not an integer")),
            None => Ok(None),
        }
    }
}

/// Position of an appended record within the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogOffset {
    /// Partition the record was routed to.
    pub partition: u32,
    /// Zero-based position within that partition.
    pub offset: u64,
}

/// Append side of a durable, partitioned log.
///
/// Records sharing a key are always routed to the same partition.
#[async_trait]
pub trait LogAppender: Send + Sync {
    /// Append `payload` under `key`, returning where it landed.
    async fn append(&self, key: &str, payload: Vec<u8>) -> anyhow::Result<LogOffset>;
}
