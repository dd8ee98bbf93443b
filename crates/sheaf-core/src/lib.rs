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

//! Bulk action data model and collaborator contracts shared across Sheaf.
//!
//! Layout: `model/` (commands, statuses, identifiers), `codec.rs` (JSON and
//! timestamp encoding), `service/` (status store and log contracts).

pub mod codec;
pub mod error;
pub mod model;
pub mod service;

pub use codec::{decode_command, encode_command, format_instant, parse_instant};
pub use error::{BulkError, BulkResult};
pub use model::{BulkActionId, BulkCommand, BulkState, BulkStatus};
pub use service::{LogAppender, LogOffset, StatusStore};
