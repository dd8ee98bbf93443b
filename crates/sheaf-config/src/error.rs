//! Error types for configuration parsing.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A consumer option carried an invalid value.
    #[error("invalid consumer option")]
    InvalidOption {
        /// Option key.
        option: &'static str,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// An environment variable carried an invalid value.
    #[error("invalid environment configuration")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
