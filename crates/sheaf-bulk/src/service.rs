//! Bulk action submission and status lookup.
//!
//! # Design
//! - The command is validated and serialized before any write, so every
//!   rejection is free of side effects.
//! - Status fields live under separate keys and are written one at a time;
//!   a store or log failure part way through leaves the earlier fields in
//!   place and is reported as [`BulkError::Store`] or [`BulkError::Log`].
//! - Reads assemble a best-effort snapshot; concurrent executor updates may be
//!   observed partially applied.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use sheaf_core::{
    BulkActionId, BulkCommand, BulkError, BulkResult, BulkState, BulkStatus, LogAppender,
    StatusStore, decode_command, encode_command, format_instant, parse_instant,
};
use sheaf_telemetry::Metrics;
use tracing::{debug, warn};

use crate::keys::StatusKeys;

/// Stateless front door for submitting bulk actions and polling their status.
#[derive(Clone)]
pub struct BulkService {
    store: Arc<dyn StatusStore>,
    log: Arc<dyn LogAppender>,
    metrics: Option<Metrics>,
}

impl BulkService {
    /// Service writing status to `store` and commands to `log`.
    #[must_use]
    pub fn new(store: Arc<dyn StatusStore>, log: Arc<dyn LogAppender>) -> Self {
        Self {
            store,
            log,
            metrics: None,
        }
    }

    /// Count submissions and lookups in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Record a new bulk action and append its command to the log.
    ///
    /// The returned status is `SCHEDULED`. The log record is keyed by the new
    /// identifier so every record of one action shares a partition. Retrying
    /// after a non-rejected failure may schedule the action twice.
    ///
    /// # Errors
    ///
    /// - [`BulkError::InvalidCommand`] or [`BulkError::Serialization`] before
    ///   anything is written.
    /// - [`BulkError::Store`] or [`BulkError::Log`] when a collaborator fails;
    ///   status fields written before the failure are kept.
    pub async fn run_action(&self, command: BulkCommand) -> BulkResult<BulkStatus> {
        let result = self.submit(command).await;
        match &result {
            Ok(status) => {
                debug!(bulk_action_id = %status.id, "bulk action scheduled");
                if let Some(metrics) = &self.metrics {
                    metrics.inc_bulk_submitted();
                }
            }
            Err(err) if err.is_rejected() => {
                debug!(error = %err, "bulk action rejected");
                if let Some(metrics) = &self.metrics {
                    metrics.inc_bulk_rejected();
                }
            }
            Err(err) => warn!(error = %err, "bulk action submission failed"),
        }
        result
    }

    /// Read back the status recorded for `id`.
    ///
    /// # Errors
    ///
    /// - [`BulkError::NotFound`] when no state is stored for `id`.
    /// - [`BulkError::Corrupt`] when a stored field cannot be interpreted.
    /// - [`BulkError::Serialization`] when the stored command does not decode.
    /// - [`BulkError::Store`] when the store read fails.
    pub async fn get_status(&self, id: BulkActionId) -> BulkResult<BulkStatus> {
        let result = self.read_status(id).await;
        if let Some(metrics) = &self.metrics {
            metrics.inc_status_read(read_outcome(&result));
        }
        result
    }

    /// [`BulkService::get_status`] for an identifier in textual form.
    ///
    /// # Errors
    ///
    /// Returns [`BulkError::InvalidId`] when `id` is not a UUID, otherwise the
    /// errors of [`BulkService::get_status`].
    pub async fn get_status_by_str(&self, id: &str) -> BulkResult<BulkStatus> {
        let id = id.parse::<BulkActionId>()?;
        self.get_status(id).await
    }

    async fn submit(&self, command: BulkCommand) -> BulkResult<BulkStatus> {
        command.validate()?;
        let payload = encode_command(&command)?;

        let id = BulkActionId::generate();
        let status = BulkStatus::scheduled(id, command, Utc::now().trunc_subsecs(6));
        let keys = StatusKeys::for_id(&id);

        self.store
            .put_string(&keys.state, status.state.as_str())
            .await
            .map_err(|err| BulkError::store("put_state", id, err))?;
        self.store
            .put_string(&keys.creation_date, &format_instant(&status.creation_instant))
            .await
            .map_err(|err| BulkError::store("put_creation_date", id, err))?;
        self.store
            .put(&keys.command, Some(payload.clone()))
            .await
            .map_err(|err| BulkError::store("put_command", id, err))?;

        let offset = self
            .log
            .append(&id.to_string(), payload)
            .await
            .map_err(|err| BulkError::log("append_command", id, err))?;
        debug!(
            bulk_action_id = %id,
            partition = offset.partition,
            offset = offset.offset,
            "bulk command appended"
        );
        Ok(status)
    }

    async fn read_status(&self, id: BulkActionId) -> BulkResult<BulkStatus> {
        let keys = StatusKeys::for_id(&id);
        let state = read_state(self.store.as_ref(), id, &keys).await?;

        let creation_instant = match self
            .fetch(id, &keys.creation_date, "get_creation_date")
            .await?
        {
            Some(bytes) => std::str::from_utf8(&bytes)
                .ok()
                .and_then(parse_instant)
                .ok_or_else(|| corrupt(id, "creationDate", Some(bytes.as_slice())))?,
            None => return Err(corrupt(id, "creationDate", None)),
        };
        let command = match self.fetch(id, &keys.command, "get_command").await? {
            Some(bytes) => decode_command(&bytes)?,
            None => return Err(corrupt(id, "command", None)),
        };
        let count = match self.fetch(id, &keys.count, "get_count").await? {
            Some(bytes) => Some(
                std::str::from_utf8(&bytes)
                    .ok()
                    .and_then(|text| text.trim().parse::<u64>().ok())
                    .ok_or_else(|| corrupt(id, "count", Some(bytes.as_slice())))?,
            ),
            None => None,
        };

        Ok(BulkStatus {
            id,
            command,
            state,
            creation_instant,
            count,
        })
    }

    async fn fetch(
        &self,
        id: BulkActionId,
        key: &str,
        operation: &'static str,
    ) -> BulkResult<Option<Vec<u8>>> {
        self.store
            .get(key)
            .await
            .map_err(|err| BulkError::store(operation, id, err))
    }
}

/// Current state of `id`; absent state means the action is unknown.
pub(crate) async fn read_state(
    store: &dyn StatusStore,
    id: BulkActionId,
    keys: &StatusKeys,
) -> BulkResult<BulkState> {
    let bytes = store
        .get(&keys.state)
        .await
        .map_err(|err| BulkError::store("get_state", id, err))?
        .ok_or(BulkError::NotFound { id })?;
    std::str::from_utf8(&bytes)
        .ok()
        .and_then(|text| text.parse::<BulkState>().ok())
        .ok_or_else(|| corrupt(id, "state", Some(bytes.as_slice())))
}

fn corrupt(id: BulkActionId, field: &'static str, raw: Option<&[u8]>) -> BulkError {
    BulkError::Corrupt {
        id,
        field,
        value: raw.and_then(|bytes| std::str::from_utf8(bytes).ok().map(str::to_string)),
    }
}

const fn read_outcome(result: &BulkResult<BulkStatus>) -> &'static str {
    match result {
        Ok(_) => "found",
        Err(BulkError::NotFound { .. }) => "not_found",
        Err(BulkError::Corrupt { .. } | BulkError::Serialization { .. }) => "corrupt",
        Err(_) => "error",
    }
}
