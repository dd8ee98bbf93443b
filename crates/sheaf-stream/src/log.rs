//! In-memory partitioned append log.
//!
//! Appends land on the partition selected by a stable hash of the record key.
//! Each partition is an append-only vector guarded by its own mutex; a watch
//! channel per partition wakes tailers waiting at the end of the log.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use sheaf_core::{LogAppender, LogOffset};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{StreamError, StreamResult};
use crate::record::{ReadRecord, Record};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Ordered supply of records for one partition consumer.
#[async_trait]
pub trait RecordSource: Send {
    /// Wait for the next record; `None` once the source is exhausted.
    async fn next_record(&mut self) -> Option<ReadRecord>;
}

/// Append-only log split into a fixed number of partitions.
///
/// Clones share the same underlying partitions.
#[derive(Clone)]
pub struct MemoryLog {
    inner: Arc<LogInner>,
}

struct LogInner {
    name: String,
    partitions: Vec<Partition>,
}

struct Partition {
    state: Mutex<PartitionState>,
    signal: watch::Sender<u64>,
}

#[derive(Default)]
struct PartitionState {
    records: Vec<Record>,
    closed: bool,
}

enum Poll {
    Ready(Record),
    Pending,
    Closed,
}

impl Partition {
    fn new() -> Self {
        let (signal, _) = watch::channel(0);
        Self {
            state: Mutex::new(PartitionState::default()),
            signal,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PartitionState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn poll(&self, offset: u64) -> Poll {
        let state = self.lock();
        let record = usize::try_from(offset)
            .ok()
            .and_then(|index| state.records.get(index));
        match record {
            Some(record) => Poll::Ready(record.clone()),
            None if state.closed => Poll::Closed,
            None => Poll::Pending,
        }
    }
}

impl MemoryLog {
    /// Create a log named `name` with `partitions` partitions (at least one).
    #[must_use]
    pub fn new(name: impl Into<String>, partitions: u32) -> Self {
        let partitions = (0..partitions.max(1)).map(|_| Partition::new()).collect();
        Self {
            inner: Arc::new(LogInner {
                name: name.into(),
                partitions,
            }),
        }
    }

    /// Stream name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of partitions.
    #[must_use]
    pub fn partitions(&self) -> u32 {
        u32::try_from(self.inner.partitions.len()).unwrap_or(u32::MAX)
    }

    /// Partition that records keyed `key` are routed to.
    #[must_use]
    pub fn partition_for(&self, key: &str) -> u32 {
        let hash = key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        });
        u32::try_from(hash % u64::from(self.partitions())).unwrap_or(0)
    }

    /// Number of records stored in `partition`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UnknownPartition`] if `partition` is out of range.
    pub fn len(&self, partition: u32) -> StreamResult<u64> {
        let records = self.partition(partition)?.lock().records.len();
        Ok(u64::try_from(records).unwrap_or(u64::MAX))
    }

    /// Append a record, returning the partition and offset it landed on.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Closed`] once [`MemoryLog::close`] has been called.
    pub fn append_record(&self, key: &str, payload: Vec<u8>) -> StreamResult<LogOffset> {
        let partition = self.partition_for(key);
        let target = self.partition(partition)?;
        let offset = {
            let mut state = target.lock();
            if state.closed {
                return Err(StreamError::Closed {
                    stream: self.inner.name.clone(),
                });
            }
            state.records.push(Record::new(key, payload));
            u64::try_from(state.records.len()).unwrap_or(u64::MAX)
        };
        target.signal.send_replace(offset);
        debug!(stream = %self.inner.name, partition, offset = offset - 1, "record appended");
        Ok(LogOffset {
            partition,
            offset: offset - 1,
        })
    }

    /// Tail `partition` from its first record.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UnknownPartition`] if `partition` is out of range.
    pub fn tailer(&self, partition: u32) -> StreamResult<LogTailer> {
        self.tailer_from(partition, 0)
    }

    /// Tail `partition` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UnknownPartition`] if `partition` is out of range.
    pub fn tailer_from(&self, partition: u32, offset: u64) -> StreamResult<LogTailer> {
        let signal = self.partition(partition)?.signal.subscribe();
        Ok(LogTailer {
            log: self.clone(),
            partition,
            next: offset,
            signal,
        })
    }

    /// Stop accepting appends; tailers end after draining what was stored.
    pub fn close(&self) {
        for partition in &self.inner.partitions {
            partition.lock().closed = true;
            partition.signal.send_modify(|_| {});
        }
        debug!(stream = %self.inner.name, "log closed");
    }

    fn partition(&self, partition: u32) -> StreamResult<&Partition> {
        usize::try_from(partition)
            .ok()
            .and_then(|index| self.inner.partitions.get(index))
            .ok_or_else(|| StreamError::UnknownPartition {
                stream: self.inner.name.clone(),
                partition,
                partitions: self.partitions(),
            })
    }
}

#[async_trait]
impl LogAppender for MemoryLog {
    async fn append(&self, key: &str, payload: Vec<u8>) -> anyhow::Result<LogOffset> {
        Ok(self.append_record(key, payload)?)
    }
}

/// Cursor over one partition that waits for new appends at the end.
pub struct LogTailer {
    log: MemoryLog,
    partition: u32,
    next: u64,
    signal: watch::Receiver<u64>,
}

impl LogTailer {
    /// Partition this tailer reads.
    #[must_use]
    pub const fn partition(&self) -> u32 {
        self.partition
    }

    /// Offset of the next record to be returned.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.next
    }
}

#[async_trait]
impl RecordSource for LogTailer {
    async fn next_record(&mut self) -> Option<ReadRecord> {
        loop {
            self.signal.mark_unchanged();
            let poll = match self.log.partition(self.partition) {
                Ok(partition) => partition.poll(self.next),
                Err(_) => return None,
            };
            match poll {
                Poll::Ready(record) => {
                    let offset = self.next;
                    self.next += 1;
                    return Some(ReadRecord {
                        partition: self.partition,
                        offset,
                        record,
                    });
                }
                Poll::Closed => return None,
                Poll::Pending => {
                    if self.signal.changed().await.is_err() {
                        return None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn equal_keys_share_a_partition() {
        let log = MemoryLog::new("documentSet", 8);
        let key = "6f1c9e0a-3b7d-4d55-9a2e-0c1f4b7e9d21";
        let first = log.partition_for(key);
        for _ in 0..16 {
            assert_eq!(log.partition_for(key), first);
        }
        assert!(first < 8);
        assert_eq!(MemoryLog::new("other", 8).partition_for(key), first);
    }

    #[test]
    fn keys_spread_across_partitions() {
        let log = MemoryLog::new("documentSet", 4);
        let used: std::collections::HashSet<u32> = (0..64)
            .map(|n| log.partition_for(&format!("action-{n}")))
            .collect();
        assert_eq!(used.len(), 4);
    }

    #[test]
    fn zero_partitions_falls_back_to_one() {
        let log = MemoryLog::new("documentSet", 0);
        assert_eq!(log.partitions(), 1);
        assert_eq!(log.partition_for("anything"), 0);
    }

    #[tokio::test]
    async fn appends_are_offset_ordered_per_partition() -> anyhow::Result<()> {
        let log = MemoryLog::new("documentSet", 2);
        let a = log.append("same", b"a".to_vec()).await?;
        let b = log.append("same", b"b".to_vec()).await?;
        assert_eq!(a.partition, b.partition);
        assert_eq!((a.offset, b.offset), (0, 1));
        assert_eq!(log.len(a.partition)?, 2);

        let mut tailer = log.tailer(a.partition)?;
        let first = tailer.next_record().await.expect("first record");
        let second = tailer.next_record().await.expect("second record");
        assert_eq!(first.record.payload, b"a");
        assert_eq!(second.offset, 1);
        assert_eq!(tailer.position(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn tailer_wakes_on_append() -> anyhow::Result<()> {
        let log = MemoryLog::new("documentSet", 1);
        let mut tailer = log.tailer(0)?;
        let writer = log.clone();
        let pending = tokio::spawn(async move { tailer.next_record().await });
        tokio::task::yield_now().await;
        writer.append_record("k", b"late".to_vec())?;

        let read = timeout(Duration::from_secs(1), pending).await??;
        assert_eq!(read.map(|read| read.record.payload), Some(b"late".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn close_drains_then_ends_tailers() -> anyhow::Result<()> {
        let log = MemoryLog::new("documentSet", 1);
        log.append_record("k", b"kept".to_vec())?;
        log.close();

        assert!(matches!(
            log.append_record("k", Vec::new()),
            Err(StreamError::Closed { .. })
        ));
        let mut tailer = log.tailer_from(0, 0)?;
        assert!(tailer.next_record().await.is_some());
        assert!(tailer.next_record().await.is_none());
        Ok(())
    }

    #[test]
    fn unknown_partition_is_rejected() {
        let log = MemoryLog::new("documentSet", 2);
        assert!(matches!(
            log.tailer(2),
            Err(StreamError::UnknownPartition {
                partition: 2,
                partitions: 2,
                ..
            })
        ));
    }
}
