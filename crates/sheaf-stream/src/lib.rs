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

//! Partitioned append log and the batching consumer that drains it.
//!
//! Layout: `record.rs` (log records), `log.rs` (in-memory partitioned log and
//! tailers), `batch.rs` (size/time batching consumer), `pool.rs` (one task
//! per partition), `error.rs`.
//!
//! Each partition is drained by exactly one task; the batch buffer and timer
//! deadline are locals of that task and never shared.

pub mod batch;
pub mod error;
pub mod log;
pub mod pool;
pub mod record;

pub use batch::{BatchProcessor, BatchingConsumer, ConsumerSummary};
pub use error::{StreamError, StreamResult};
pub use log::{LogTailer, MemoryLog, RecordSource};
pub use pool::{ConsumerHandle, spawn_partition_consumers};
pub use record::{ReadRecord, Record};
