//! Executor-side status updates.
//!
//! Updates are single-key writes with no compare-and-set: two executors
//! racing on the same action can interleave. Executors own an action through
//! its log partition, which keeps that case out of normal operation.

use std::sync::Arc;

use sheaf_core::{BulkActionId, BulkError, BulkResult, BulkState, StatusStore};
use tracing::{debug, info};

use crate::keys::StatusKeys;
use crate::service::read_state;

/// Moves bulk actions forward through their lifecycle and reports counts.
#[derive(Clone)]
pub struct StatusUpdater {
    store: Arc<dyn StatusStore>,
}

impl StatusUpdater {
    /// Updater writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Move `id` to `next`. Re-asserting the current state is a no-op.
    ///
    /// # Errors
    ///
    /// - [`BulkError::NotFound`] when `id` was never scheduled.
    /// - [`BulkError::InvalidTransition`] when `next` is behind the current state.
    /// - [`BulkError::Corrupt`] or [`BulkError::Store`] on unreadable or failed storage.
    pub async fn advance(&self, id: BulkActionId, next: BulkState) -> BulkResult<BulkState> {
        let keys = StatusKeys::for_id(&id);
        let current = read_state(self.store.as_ref(), id, &keys).await?;
        if current == next {
            return Ok(current);
        }
        if !current.can_advance_to(next) {
            return Err(BulkError::InvalidTransition {
                id,
                from: current,
                to: next,
            });
        }
        self.store
            .put_string(&keys.state, next.as_str())
            .await
            .map_err(|err| BulkError::store("put_state", id, err))?;
        info!(bulk_action_id = %id, from = %current, to = %next, "bulk action advanced");
        Ok(next)
    }

    /// Record the number of items discovered or processed for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BulkError::NotFound`] when `id` was never scheduled, or
    /// [`BulkError::Store`] when the write fails.
    pub async fn record_count(&self, id: BulkActionId, count: u64) -> BulkResult<()> {
        let keys = StatusKeys::for_id(&id);
        read_state(self.store.as_ref(), id, &keys).await?;
        self.store
            .put_long(&keys.count, count)
            .await
            .map_err(|err| BulkError::store("put_count", id, err))?;
        debug!(bulk_action_id = %id, count, "bulk action count recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::BulkService;
    use sheaf_data::MemoryStatusStore;
    use sheaf_test_support::fixtures::sample_command;
    use sheaf_test_support::mocks::RecordingLog;

    async fn scheduled(store: &MemoryStatusStore) -> BulkActionId {
        BulkService::new(Arc::new(store.clone()), Arc::new(RecordingLog::new()))
            .run_action(sample_command())
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn states_only_move_forward() {
        let store = MemoryStatusStore::new();
        let updater = StatusUpdater::new(Arc::new(store.clone()));
        let id = scheduled(&store).await;

        assert_eq!(
            updater.advance(id, BulkState::Building).await.unwrap(),
            BulkState::Building
        );
        assert_eq!(
            updater.advance(id, BulkState::Building).await.unwrap(),
            BulkState::Building
        );

        let err = updater
            .advance(id, BulkState::Scheduled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BulkError::InvalidTransition {
                from: BulkState::Building,
                to: BulkState::Scheduled,
                ..
            }
        ));

        updater.advance(id, BulkState::Completed).await.unwrap();
        assert!(updater.advance(id, BulkState::Building).await.is_err());
        assert_eq!(
            store.get_string(&StatusKeys::for_id(&id).state).await.unwrap().as_deref(),
            Some("COMPLETED")
        );
    }

    #[tokio::test]
    async fn scheduled_may_jump_to_completed() {
        let store = MemoryStatusStore::new();
        let updater = StatusUpdater::new(Arc::new(store.clone()));
        let id = scheduled(&store).await;
        assert_eq!(
            updater.advance(id, BulkState::Completed).await.unwrap(),
            BulkState::Completed
        );
    }

    #[tokio::test]
    async fn unknown_actions_are_not_updated() {
        let store = MemoryStatusStore::new();
        let updater = StatusUpdater::new(Arc::new(store.clone()));
        let id = BulkActionId::generate();

        assert!(matches!(
            updater.advance(id, BulkState::Building).await,
            Err(BulkError::NotFound { .. })
        ));
        assert!(matches!(
            updater.record_count(id, 5).await,
            Err(BulkError::NotFound { .. })
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn counts_overwrite_previous_values() {
        let store = MemoryStatusStore::new();
        let updater = StatusUpdater::new(Arc::new(store.clone()));
        let id = scheduled(&store).await;
        let key = StatusKeys::for_id(&id).count;

        updater.record_count(id, 10).await.unwrap();
        updater.record_count(id, 25).await.unwrap();
        assert_eq!(store.get_long(&key).await.unwrap(), Some(25));
    }
}
