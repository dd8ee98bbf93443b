//! Default values and option names for consumers and the worker process.
//!
//! # Design
//! - Centralize defaults so option parsing and env loading agree.
//! - Keep option names identical to the keys accepted at consumer start-up.

/// Option key for the maximum number of buffered entries.
pub const BATCH_SIZE_OPT: &str = "batchSize";
/// Option key for the batch latency bound in milliseconds.
pub const BATCH_THRESHOLD_MS_OPT: &str = "batchThresholdMs";
/// Option key selecting whether buffered entries are flushed on shutdown.
pub const FLUSH_ON_SHUTDOWN_OPT: &str = "flushOnShutdown";

/// Default maximum number of buffered entries.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Default batch latency bound in milliseconds.
pub const DEFAULT_BATCH_THRESHOLD_MS: u64 = 200;

/// Stream that carries submitted bulk commands.
pub const DEFAULT_STREAM_NAME: &str = "documentSet";
/// Default partition count for the command stream.
pub const DEFAULT_PARTITIONS: u32 = 4;
/// Default log level when neither `RUST_LOG` nor settings override it.
pub const DEFAULT_LOG_LEVEL: &str = "info";
