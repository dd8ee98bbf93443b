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

//! Bulk action submission, status lookup, and executor-side status updates.
//!
//! Layout: `keys.rs` (status key namespace), `service.rs` (submission and
//! lookup), `updater.rs` (forward-only state changes and counts).

pub mod keys;
pub mod service;
pub mod updater;

pub use keys::StatusKeys;
pub use service::BulkService;
pub use updater::StatusUpdater;
