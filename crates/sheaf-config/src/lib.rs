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

//! Configuration for batching consumers and the worker process.
//!
//! Layout: `batch.rs` (string-keyed consumer options), `settings.rs`
//! (environment-driven worker settings), `defaults.rs` (shared defaults).

pub mod batch;
pub mod defaults;
pub mod error;
pub mod settings;

pub use batch::BatchOptions;
pub use error::{ConfigError, ConfigResult};
pub use settings::WorkerSettings;
