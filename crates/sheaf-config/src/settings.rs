//! Worker process settings sourced from the environment.

use std::collections::HashMap;

use tracing::debug;

use crate::batch::BatchOptions;
use crate::defaults::{
    BATCH_SIZE_OPT, BATCH_THRESHOLD_MS_OPT, DEFAULT_LOG_LEVEL, DEFAULT_PARTITIONS,
    DEFAULT_STREAM_NAME, FLUSH_ON_SHUTDOWN_OPT,
};
use crate::error::{ConfigError, ConfigResult};

const STREAM_NAME_ENV: &str = "SHEAF_STREAM_NAME";
const PARTITIONS_ENV: &str = "SHEAF_PARTITIONS";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const BATCH_SIZE_ENV: &str = "SHEAF_BATCH_SIZE";
const BATCH_THRESHOLD_MS_ENV: &str = "SHEAF_BATCH_THRESHOLD_MS";
const FLUSH_ON_SHUTDOWN_ENV: &str = "SHEAF_FLUSH_ON_SHUTDOWN";
const LOG_LEVEL_ENV: &str = "SHEAF_LOG_LEVEL";
const LOG_FORMAT_ENV: &str = "SHEAF_LOG_FORMAT";

/// Settings required to boot a worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Name of the command stream.
    pub stream_name: String,
    /// Number of partitions in the command stream.
    pub partitions: u32,
    /// Postgres connection string; the in-memory status store is used when absent.
    pub database_url: Option<String>,
    /// Batching policy applied to every partition consumer.
    pub batch: BatchOptions,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Requested log output format (`json` or `pretty`).
    pub log_format: Option<String>,
}

impl WorkerSettings {
    /// Load settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any variable carries an invalid value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any variable carries an invalid value.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let stream_name = lookup(STREAM_NAME_ENV)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STREAM_NAME.to_string());

        let partitions = match lookup(PARTITIONS_ENV) {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(count) if count > 0 => count,
                Ok(_) => return Err(invalid_env(PARTITIONS_ENV, value, "must_be_positive")),
                Err(_) => return Err(invalid_env(PARTITIONS_ENV, value, "not_an_integer")),
            },
            None => DEFAULT_PARTITIONS,
        };

        let database_url = lookup(DATABASE_URL_ENV).filter(|value| !value.trim().is_empty());

        let mut options = HashMap::new();
        for (env, option) in [
            (BATCH_SIZE_ENV, BATCH_SIZE_OPT),
            (BATCH_THRESHOLD_MS_ENV, BATCH_THRESHOLD_MS_OPT),
            (FLUSH_ON_SHUTDOWN_ENV, FLUSH_ON_SHUTDOWN_OPT),
        ] {
            if let Some(value) = lookup(env) {
                options.insert(option.to_string(), value);
            }
        }
        let batch = BatchOptions::from_options(&options)?;

        let log_level = lookup(LOG_LEVEL_ENV).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let log_format = match lookup(LOG_FORMAT_ENV) {
            Some(value) if matches!(value.trim(), "json" | "pretty") => {
                Some(value.trim().to_string())
            }
            Some(value) => return Err(invalid_env(LOG_FORMAT_ENV, value, "unknown_format")),
            None => None,
        };

        debug!(
            stream = %stream_name,
            partitions,
            postgres = database_url.is_some(),
            batch_size = batch.batch_size,
            "worker settings loaded"
        );

        Ok(Self {
            stream_name,
            partitions,
            database_url,
            batch,
            log_level,
            log_format,
        })
    }
}

fn invalid_env(name: &'static str, value: String, reason: &'static str) -> ConfigError {
    ConfigError::InvalidEnv {
        name,
        value,
        reason,
    }
}
