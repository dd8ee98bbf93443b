//! Byte and text encodings for persisted command and status fields.
//!
//! Commands travel as JSON objects; instants as RFC 3339 UTC strings with a
//! fixed microsecond precision so lexical order matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{BulkError, BulkResult};
use crate::model::BulkCommand;

/// Serialize a command into its stored/logged byte form.
///
/// # Errors
///
/// Returns [`BulkError::Serialization`] if the command cannot be encoded.
pub fn encode_command(command: &BulkCommand) -> BulkResult<Vec<u8>> {
    serde_json::to_vec(command).map_err(|err| BulkError::serialization("encode_command", err))
}

/// Deserialize a command previously produced by [`encode_command`].
///
/// # Errors
///
/// Returns [`BulkError::Serialization`] if the payload is not a valid command.
pub fn decode_command(bytes: &[u8]) -> BulkResult<BulkCommand> {
    serde_json::from_slice(bytes).map_err(|err| BulkError::serialization("decode_command", err))
}

/// Render an instant in the sortable stored form.
#[must_use]
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an instant rendered by [`format_instant`] (any RFC 3339 offset is accepted).
#[must_use]
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}
