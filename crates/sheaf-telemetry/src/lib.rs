#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Telemetry primitives shared across the Sheaf workspace.
//!
//! Layout: `init.rs` (tracing subscriber installation), `metrics.rs`
//! (Prometheus registry for submissions and batch flushes), `error.rs`.

pub mod error;
pub mod init;
pub mod metrics;

pub use error::{CollectorStage, Result, TelemetryError};
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging, log_format_from_name,
};
pub use metrics::{FlushReason, Metrics, MetricsSnapshot};
