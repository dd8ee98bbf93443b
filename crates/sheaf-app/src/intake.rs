//! Newline-delimited JSON intake.
//!
//! Each input line is either a command to submit or a status lookup of the
//! form `{"status": "<id>"}`. Every line produces exactly one output line:
//! the status JSON, or an error object carrying a machine-readable `kind`.

use std::future::Future;

use serde::{Deserialize, Serialize};
use sheaf_bulk::BulkService;
use sheaf_core::{BulkCommand, BulkError, BulkStatus};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// One parsed input line.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Request {
    /// Look up a previously submitted action.
    Status(StatusLookup),
    /// Submit a new bulk command.
    Submit(BulkCommand),
}

/// Body of a status lookup line.
///
/// Any field besides `status` makes the line a submission instead.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusLookup {
    /// Textual action identifier.
    pub status: String,
}

/// Error object written in place of a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable failure class.
    pub kind: &'static str,
    /// Human-readable description.
    pub message: String,
    /// `true` when nothing was persisted for the request.
    pub rejected: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Response {
    Status(Box<BulkStatus>),
    Error { error: ErrorResponse },
}

/// Lines handled before the intake stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeSummary {
    /// Non-blank lines answered.
    pub requests: u64,
    /// `true` when the shutdown signal ended the intake before end of input.
    pub interrupted: bool,
}

/// Answer one input line.
///
/// # Errors
///
/// Returns [`AppError::Encode`] if the response cannot be serialized.
pub async fn handle_line(service: &BulkService, line: &str) -> AppResult<String> {
    let response = match serde_json::from_str::<Request>(line) {
        Ok(Request::Submit(command)) => respond(service.run_action(command).await),
        Ok(Request::Status(lookup)) => respond(service.get_status_by_str(&lookup.status).await),
        Err(err) => Response::Error {
            error: ErrorResponse {
                kind: "invalid_request",
                message: err.to_string(),
                rejected: true,
            },
        },
    };
    serde_json::to_string(&response).map_err(|source| AppError::encode("response.encode", source))
}

/// Answer every line of `input` on `output` until end of input or `shutdown`.
///
/// # Errors
///
/// Returns [`AppError::Io`] when reading or writing fails.
pub async fn serve_lines<R, W, F>(
    service: &BulkService,
    input: R,
    output: &mut W,
    shutdown: F,
) -> AppResult<IntakeSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future,
{
    let mut lines = input.lines();
    let mut summary = IntakeSummary::default();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.map_err(|source| AppError::io("input.read", source))?,
            _ = &mut shutdown => {
                info!("shutdown requested; closing intake");
                summary.interrupted = true;
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let mut response = handle_line(service, &line).await?;
        response.push('\n');
        output
            .write_all(response.as_bytes())
            .await
            .map_err(|source| AppError::io("output.write", source))?;
        output
            .flush()
            .await
            .map_err(|source| AppError::io("output.flush", source))?;
        summary.requests += 1;
    }

    debug!(requests = summary.requests, "intake finished");
    Ok(summary)
}

fn respond(result: Result<BulkStatus, BulkError>) -> Response {
    match result {
        Ok(status) => Response::Status(Box::new(status)),
        Err(err) => Response::Error {
            error: ErrorResponse {
                kind: error_kind(&err),
                message: err.to_string(),
                rejected: err.is_rejected(),
            },
        },
    }
}

const fn error_kind(err: &BulkError) -> &'static str {
    match err {
        BulkError::InvalidCommand { .. } => "invalid_command",
        BulkError::InvalidId { .. } => "invalid_id",
        BulkError::Serialization { .. } => "serialization",
        BulkError::NotFound { .. } => "not_found",
        BulkError::Corrupt { .. } => "corrupt",
        BulkError::InvalidTransition { .. } => "invalid_transition",
        BulkError::Store { .. } => "store",
        BulkError::Log { .. } => "log",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use sheaf_data::MemoryStatusStore;
    use sheaf_test_support::mocks::RecordingLog;
    use std::sync::Arc;

    fn service() -> BulkService {
        BulkService::new(
            Arc::new(MemoryStatusStore::new()),
            Arc::new(RecordingLog::new()),
        )
    }

    #[tokio::test]
    async fn submit_then_lookup() -> anyhow::Result<()> {
        let service = service();
        let submitted: Value =
            serde_json::from_str(&handle_line(&service, r#"{"repository":"default"}"#).await?)?;
        assert_eq!(submitted["state"], "SCHEDULED");
        let id = submitted["id"].as_str().unwrap_or_default().to_string();

        let lookup = format!(r#"{{"status":"{id}"}}"#);
        let read: Value = serde_json::from_str(&handle_line(&service, &lookup).await?)?;
        assert_eq!(read, submitted);
        Ok(())
    }

    #[tokio::test]
    async fn command_with_status_field_is_submitted() -> anyhow::Result<()> {
        let service = service();
        let line = r#"{"repository":"default","status":"draft"}"#;

        let answered: Value = serde_json::from_str(&handle_line(&service, line).await?)?;

        assert_eq!(answered["state"], "SCHEDULED");
        assert_eq!(answered["command"]["repository"], "default");
        Ok(())
    }

    #[tokio::test]
    async fn failures_are_answered_inline() -> anyhow::Result<()> {
        let service = service();

        let invalid: Value =
            serde_json::from_str(&handle_line(&service, r#"{"repository":""}"#).await?)?;
        assert_eq!(invalid["error"]["kind"], "invalid_command");
        assert_eq!(invalid["error"]["rejected"], true);

        let unknown = format!(r#"{{"status":"{}"}}"#, sheaf_core::BulkActionId::generate());
        let missing: Value = serde_json::from_str(&handle_line(&service, &unknown).await?)?;
        assert_eq!(missing["error"]["kind"], "not_found");
        assert_eq!(missing["error"]["rejected"], false);

        let garbage: Value = serde_json::from_str(&handle_line(&service, "not json").await?)?;
        assert_eq!(garbage["error"]["kind"], "invalid_request");
        Ok(())
    }

    #[tokio::test]
    async fn serve_lines_answers_each_non_blank_line() -> anyhow::Result<()> {
        let service = service();
        let input: &[u8] = b"{\"repository\":\"a\"}\n\n{\"repository\":\"b\"}\n";
        let mut output = Vec::new();

        let summary =
            serve_lines(&service, input, &mut output, std::future::pending::<()>()).await?;

        assert_eq!(summary.requests, 2);
        assert!(!summary.interrupted);
        let text = String::from_utf8(output)?;
        assert_eq!(text.lines().count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_interrupts_waiting_intake() -> anyhow::Result<()> {
        let service = service();
        let (_writer, reader) = tokio::io::duplex(64);
        let mut output = Vec::new();

        let summary = serve_lines(
            &service,
            tokio::io::BufReader::new(reader),
            &mut output,
            std::future::ready(()),
        )
        .await?;

        assert!(summary.interrupted);
        assert_eq!(summary.requests, 0);
        Ok(())
    }
}
