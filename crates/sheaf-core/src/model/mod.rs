//! Bulk action commands, statuses, and identifiers.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BulkError, BulkResult};

/// Globally unique identifier assigned to a bulk action at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulkActionId(Uuid);

impl BulkActionId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

}

impl Display for BulkActionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0.hyphenated(), formatter)
    }
}

impl FromStr for BulkActionId {
    type Err = BulkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| BulkError::InvalidId {
                value: value.to_string(),
            })
    }
}

/// Immutable description of a requested bulk operation.
///
/// Only `repository` is interpreted here; the remaining fields are carried
/// verbatim for the executor that eventually runs the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCommand {
    /// Target data source identifier.
    pub repository: String,
    /// Submitting user, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Selection query resolving the items to process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Action identifier understood by the executor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Free-form action parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl BulkCommand {
    /// Start a command targeting the given repository.
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            username: None,
            query: None,
            action: None,
            params: BTreeMap::new(),
        }
    }

    /// Attach the submitting user.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Attach the selection query.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Attach the action identifier.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Attach a single action parameter, replacing any previous value.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Check mandatory values before anything is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`BulkError::InvalidCommand`] when `repository` is empty.
    pub fn validate(&self) -> BulkResult<()> {
        if self.repository.is_empty() {
            return Err(BulkError::InvalidCommand {
                field: "repository",
                reason: "empty",
            });
        }
        Ok(())
    }
}

/// Lifecycle of a bulk action. Moves strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkState {
    /// Command recorded and logged; items not yet enumerated.
    Scheduled,
    /// Executor is enumerating and processing items.
    Building,
    /// Enumeration and processing finished.
    Completed,
}

impl BulkState {
    /// Stored textual name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Building => "BUILDING",
            Self::Completed => "COMPLETED",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Scheduled => 0,
            Self::Building => 1,
            Self::Completed => 2,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }

    /// `true` once no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl Display for BulkState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for BulkState {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SCHEDULED" => Ok(Self::Scheduled),
            "BUILDING" => Ok(Self::Building),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(()),
        }
    }
}

/// Observable progress record for one submitted command.
///
/// Reads are best-effort snapshots: the fields live under separate store keys
/// and may be observed mid-update (for example `state` advanced before
/// `count` is written).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatus {
    /// Identifier assigned at submission.
    pub id: BulkActionId,
    /// Originating command.
    pub command: BulkCommand,
    /// Current lifecycle state.
    pub state: BulkState,
    /// Wall-clock time of submission.
    pub creation_instant: DateTime<Utc>,
    /// Items discovered or processed so far; absent until reported.
    pub count: Option<u64>,
}

impl BulkStatus {
    /// Initial status for a freshly submitted command.
    #[must_use]
    pub fn scheduled(id: BulkActionId, command: BulkCommand, creation_instant: DateTime<Utc>) -> Self {
        Self {
            id,
            command,
            state: BulkState::Scheduled,
            creation_instant,
            count: None,
        }
    }
}
