//! # Design
//!
//! - Centralize application-level errors for bootstrap and shutdown.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Per-request failures are reported on the output stream and never end the process.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: sheaf_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: sheaf_telemetry::TelemetryError,
    },
    /// Connecting to the database failed.
    #[error("database connection failed")]
    Database {
        /// Operation identifier.
        operation: &'static str,
        /// Source SQL error.
        source: sqlx::Error,
    },
    /// Status store initialisation failed.
    #[error("status store operation failed")]
    Data {
        /// Operation identifier.
        operation: &'static str,
        /// Source data error.
        source: sheaf_data::DataError,
    },
    /// A partition consumer failed.
    #[error("stream operation failed")]
    Stream {
        /// Operation identifier.
        operation: &'static str,
        /// Source stream error.
        source: sheaf_stream::StreamError,
    },
    /// A response could not be encoded.
    #[error("response encoding failed")]
    Encode {
        /// Operation identifier.
        operation: &'static str,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: sheaf_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: sheaf_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn database(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Database { operation, source }
    }

    pub(crate) const fn data(operation: &'static str, source: sheaf_data::DataError) -> Self {
        Self::Data { operation, source }
    }

    pub(crate) const fn stream(operation: &'static str, source: sheaf_stream::StreamError) -> Self {
        Self::Stream { operation, source }
    }

    pub(crate) const fn encode(operation: &'static str, source: serde_json::Error) -> Self {
        Self::Encode { operation, source }
    }

    pub(crate) const fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "settings.from_env",
            sheaf_config::ConfigError::InvalidEnv {
                name: "SHEAF_PARTITIONS",
                value: "zero".to_string(),
                reason: "not_an_integer",
            },
        );
        assert!(matches!(
            config,
            AppError::Config {
                operation: "settings.from_env",
                ..
            }
        ));
        assert_eq!(config.to_string(), "configuration operation failed");
        assert!(config.source().is_some());

        let stream = AppError::stream(
            "consumer.join",
            sheaf_stream::StreamError::Closed {
                stream: "documentSet".to_string(),
            },
        );
        assert_eq!(stream.to_string(), "stream operation failed");

        let io = AppError::io("stdout.write", io::Error::other("broken pipe"));
        assert!(matches!(io, AppError::Io { .. }));
        assert!(io.source().is_some());

        let database = AppError::database("pool.connect", sqlx::Error::PoolTimedOut);
        assert_eq!(database.to_string(), "database connection failed");
    }
}
