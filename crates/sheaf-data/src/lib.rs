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
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::multiple_crate_versions)]

//! Status store adapters: an in-memory map and a Postgres key/value table.

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{DataError, Result as DataResult};
pub use memory::MemoryStatusStore;
pub use postgres::PgStatusStore;
