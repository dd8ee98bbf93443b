//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use prometheus::Error as PrometheusError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Step of collector setup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStage {
    /// Constructing the collector from its options.
    Build,
    /// Adding the collector to the registry.
    Register,
}

impl CollectorStage {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Register => "register",
        }
    }
}

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed.
    Subscriber {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A Prometheus collector could not be set up.
    Collector {
        /// Metric the collector exposes.
        metric: &'static str,
        /// Setup step that failed.
        stage: CollectorStage,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Rendering the text exposition failed.
    Exposition {
        /// Encoder or UTF-8 failure.
        source: Box<dyn Error + Send + Sync>,
    },
}

impl TelemetryError {
    /// Metric tied to the failure, when there is one.
    #[must_use]
    pub const fn metric(&self) -> Option<&'static str> {
        match self {
            Self::Collector { metric, .. } => Some(metric),
            Self::Subscriber { .. } | Self::Exposition { .. } => None,
        }
    }
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscriber { .. } => formatter.write_str("log subscriber already installed"),
            Self::Collector { stage, .. } => {
                write!(formatter, "metrics collector {} failed", stage.as_str())
            }
            Self::Exposition { .. } => formatter.write_str("metrics exposition failed"),
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Subscriber { source } => Some(source),
            Self::Collector { source, .. } => Some(source),
            Self::Exposition { source } => Some(source.as_ref()),
        }
    }
}
