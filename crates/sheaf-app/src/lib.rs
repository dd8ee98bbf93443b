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

//! Sheaf worker wiring.
//!
//! Layout: `bootstrap.rs` (settings, store, log, consumers), `intake.rs`
//! (newline-delimited JSON requests), `hook.rs` (processing hook for
//! scheduled commands), `error.rs`.

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level error type.
pub mod error;
/// Processing hook run by each partition consumer.
pub mod hook;
/// Line-oriented request handling.
pub mod intake;

pub use bootstrap::{AppReport, run_app};
pub use error::{AppError, AppResult};
