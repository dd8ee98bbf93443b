//! Collaborator doubles that record calls or fail on demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::bail;
use async_trait::async_trait;
use sheaf_core::{LogAppender, LogOffset, StatusStore};

/// Status store that starts failing writes after a fixed number of puts.
#[derive(Clone, Default)]
pub struct FailingStore {
    state: Arc<Mutex<FailingStoreState>>,
}

#[derive(Default)]
struct FailingStoreState {
    entries: HashMap<String, Vec<u8>>,
    puts_before_failure: Option<usize>,
    fail_reads: bool,
    puts: usize,
}

impl FailingStore {
    /// Store that accepts `count` puts and rejects every later one.
    #[must_use]
    pub fn fail_puts_after(count: usize) -> Self {
        let store = Self::default();
        store.lock().puts_before_failure = Some(count);
        store
    }

    /// Store whose reads always fail.
    #[must_use]
    pub fn fail_reads() -> Self {
        let store = Self::default();
        store.lock().fail_reads = true;
        store
    }

    /// Number of keys that were successfully written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// `true` when no write has succeeded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Total puts attempted, including rejected ones.
    #[must_use]
    pub fn put_attempts(&self) -> usize {
        self.lock().puts
    }

    fn lock(&self) -> MutexGuard<'_, FailingStoreState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl StatusStore for FailingStore {
    async fn put(&self, key: &str, value: Option<Vec<u8>>) -> anyhow::Result<()> {
        let mut state = self.lock();
        state.puts += 1;
        if state
            .puts_before_failure
            .is_some_and(|allowed| state.puts > allowed)
        {
            bail!("injected put failure for '{key}'");
        }
        match value {
            Some(value) => {
                state.entries.insert(key.to_string(), value);
            }
            None => {
                state.entries.remove(key);
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let state = self.lock();
        if state.fail_reads {
            bail!("injected read failure for '{key}'");
        }
        Ok(state.entries.get(key).cloned())
    }
}

/// Log appender that records every append on a single partition.
#[derive(Clone, Default)]
pub struct RecordingLog {
    appended: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl RecordingLog {
    /// Construct an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appended `(key, payload)` pairs in order.
    #[must_use]
    pub fn appended(&self) -> Vec<(String, Vec<u8>)> {
        self.appended
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LogAppender for RecordingLog {
    async fn append(&self, key: &str, payload: Vec<u8>) -> anyhow::Result<LogOffset> {
        let mut appended = self
            .appended
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        appended.push((key.to_string(), payload));
        Ok(LogOffset {
            partition: 0,
            offset: u64::try_from(appended.len() - 1).unwrap_or(u64::MAX),
        })
    }
}

/// Log appender whose appends always fail.
#[derive(Clone, Copy, Default)]
pub struct FailingLog;

#[async_trait]
impl LogAppender for FailingLog {
    async fn append(&self, key: &str, _payload: Vec<u8>) -> anyhow::Result<LogOffset> {
        bail!("injected append failure for '{key}'")
    }
}
