use std::future::Future;
use std::sync::Arc;

use sheaf_bulk::BulkService;
use sheaf_config::WorkerSettings;
use sheaf_core::StatusStore;
use sheaf_data::{MemoryStatusStore, PgStatusStore};
use sheaf_stream::{ConsumerHandle, MemoryLog, spawn_partition_consumers};
use sheaf_telemetry::{LogFormat, LoggingConfig, Metrics, build_sha, log_format_from_name};
use sqlx::postgres::PgPoolOptions;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::hook::{ReceiptCounter, ScheduledCommandHook};
use crate::intake::serve_lines;

const DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Dependencies required to run the worker.
pub(crate) struct BootstrapDependencies {
    settings: WorkerSettings,
    store: Arc<dyn StatusStore>,
    log: MemoryLog,
    metrics: Metrics,
}

impl BootstrapDependencies {
    /// Build production dependencies from loaded settings.
    pub(crate) async fn from_settings(settings: WorkerSettings) -> AppResult<Self> {
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

        let store: Arc<dyn StatusStore> = match settings.database_url.as_deref() {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(DATABASE_MAX_CONNECTIONS)
                    .connect(url)
                    .await
                    .map_err(|err| AppError::database("pool.connect", err))?;
                let store = PgStatusStore::new(pool)
                    .await
                    .map_err(|err| AppError::data("status_store.new", err))?;
                info!("using postgres status store");
                Arc::new(store)
            }
            None => {
                info!("using in-memory status store");
                Arc::new(MemoryStatusStore::new())
            }
        };

        let log = MemoryLog::new(settings.stream_name.clone(), settings.partitions);
        Ok(Self {
            settings,
            store,
            log,
            metrics,
        })
    }

    /// In-memory dependencies, bypassing any database.
    #[cfg(test)]
    pub(crate) fn in_memory(settings: WorkerSettings) -> AppResult<Self> {
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let log = MemoryLog::new(settings.stream_name.clone(), settings.partitions);
        Ok(Self {
            settings,
            store: Arc::new(MemoryStatusStore::new()),
            log,
            metrics,
        })
    }
}

/// Outcome of one worker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppReport {
    /// Input lines answered.
    pub requests: u64,
    /// Commands handed to the processing hook.
    pub received: u64,
    /// Buffered entries dropped when consumers stopped.
    pub discarded: usize,
}

/// Entry point for the Sheaf worker boot sequence.
///
/// # Errors
///
/// Returns an error if settings, logging, the status store, or a consumer fail.
pub async fn run_app() -> AppResult<()> {
    let settings =
        WorkerSettings::from_env().map_err(|err| AppError::config("settings.from_env", err))?;
    let format =
        log_format_from_name(settings.log_format.as_deref()).unwrap_or_else(LogFormat::infer);
    sheaf_telemetry::init_logging(&LoggingConfig {
        level: &settings.log_level,
        format,
        build_sha: build_sha(),
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    let dependencies = BootstrapDependencies::from_settings(settings).await?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let report = run_app_with(dependencies, stdin, &mut stdout, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await?;

    info!(
        requests = report.requests,
        received = report.received,
        discarded = report.discarded,
        "sheaf worker stopped"
    );
    Ok(())
}

/// Boot sequence over injected dependencies and IO.
///
/// At end of input the log is closed and consumers drain what was appended.
/// On `shutdown` consumers stop at once and buffered entries follow the
/// flush-on-shutdown policy.
pub(crate) async fn run_app_with<R, W, F>(
    dependencies: BootstrapDependencies,
    input: R,
    output: &mut W,
    shutdown: F,
) -> AppResult<AppReport>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future,
{
    let BootstrapDependencies {
        settings,
        store,
        log,
        metrics,
    } = dependencies;

    info!(
        stream = %settings.stream_name,
        partitions = log.partitions(),
        build_sha = build_sha(),
        "sheaf worker starting"
    );

    let receipts = ReceiptCounter::default();
    let handles = spawn_partition_consumers(&log, settings.batch, Some(&metrics), |partition| {
        ScheduledCommandHook::new(partition, receipts.clone())
    })
    .map_err(|err| AppError::stream("consumers.spawn", err))?;

    let service =
        BulkService::new(store, Arc::new(log.clone())).with_metrics(metrics.clone());
    let intake = serve_lines(&service, input, output, shutdown).await;

    log.close();
    let drain = intake.as_ref().is_ok_and(|summary| !summary.interrupted);
    let discarded = stop_consumers(handles, drain).await?;
    let intake = intake?;

    let snapshot = metrics.snapshot();
    info!(
        submitted = snapshot.bulk_actions_submitted_total,
        rejected = snapshot.bulk_actions_rejected_total,
        batch_entries = snapshot.batch_entries_total,
        "sheaf worker totals"
    );

    Ok(AppReport {
        requests: intake.requests,
        received: receipts.get(),
        discarded,
    })
}

async fn stop_consumers(handles: Vec<ConsumerHandle>, drain: bool) -> AppResult<usize> {
    let mut discarded = 0;
    let mut first_error = None;
    for handle in handles {
        let outcome = if drain {
            handle.join().await
        } else {
            handle.shutdown().await
        };
        match outcome {
            Ok(summary) => discarded += summary.entries_discarded,
            Err(err) => {
                warn!(error = %err, "partition consumer failed");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }
    first_error.map_or(Ok(discarded), |err| {
        Err(AppError::stream("consumers.stop", err))
    })
}
