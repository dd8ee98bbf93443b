//! Error types for bulk action submission and status tracking.
//!
//! # Design
//!
//! - Keep error messages constant while carrying context fields for debugging.
//! - Separate failures raised before any durable write from failures that may
//!   leave partial status state behind.

use std::error::Error;

use thiserror::Error;

use crate::model::{BulkActionId, BulkState};

/// Primary error type for bulk operations.
#[derive(Debug, Error)]
pub enum BulkError {
    /// The submitted command is missing a mandatory value.
    #[error("invalid bulk command")]
    InvalidCommand {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A textual bulk action identifier could not be parsed.
    #[error("invalid bulk action id")]
    InvalidId {
        /// Identifier payload provided by the caller.
        value: String,
    },
    /// Encoding or decoding a command failed.
    #[error("bulk command serialization failed")]
    Serialization {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying serde error.
        source: serde_json::Error,
    },
    /// No status is recorded for the requested identifier.
    #[error("bulk status not found")]
    NotFound {
        /// Identifier that was looked up.
        id: BulkActionId,
    },
    /// A stored status field could not be interpreted.
    #[error("bulk status is corrupt")]
    Corrupt {
        /// Identifier whose status is corrupt.
        id: BulkActionId,
        /// Status field that failed to decode.
        field: &'static str,
        /// Raw stored value when it could be read as text.
        value: Option<String>,
    },
    /// A state change would move a status backwards.
    #[error("invalid bulk state transition")]
    InvalidTransition {
        /// Identifier of the bulk action.
        id: BulkActionId,
        /// State currently recorded.
        from: BulkState,
        /// State that was requested.
        to: BulkState,
    },
    /// The status store rejected a read or write.
    #[error("status store operation failed")]
    Store {
        /// Operation identifier.
        operation: &'static str,
        /// Identifier of the bulk action.
        id: BulkActionId,
        /// Underlying store failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Appending the command to the log failed.
    #[error("log append failed")]
    Log {
        /// Operation identifier.
        operation: &'static str,
        /// Identifier of the bulk action.
        id: BulkActionId,
        /// Underlying log failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl BulkError {
    /// Returns `true` when the error was raised before anything was persisted.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(
            self,
            Self::InvalidCommand { .. } | Self::InvalidId { .. } | Self::Serialization { .. }
        )
    }

    pub(crate) const fn serialization(operation: &'static str, source: serde_json::Error) -> Self {
        Self::Serialization { operation, source }
    }

    /// Wrap a status store failure.
    #[must_use]
    pub fn store(operation: &'static str, id: BulkActionId, source: anyhow::Error) -> Self {
        Self::Store {
            operation,
            id,
            source: source.into(),
        }
    }

    /// Wrap a log append failure.
    #[must_use]
    pub fn log(operation: &'static str, id: BulkActionId, source: anyhow::Error) -> Self {
        Self::Log {
            operation,
            id,
            source: source.into(),
        }
    }
}

/// Convenience alias for bulk operation results.
pub type BulkResult<T> = Result<T, BulkError>;
