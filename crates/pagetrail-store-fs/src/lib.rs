//! Filesystem backends for pagetrail.
//!
//! - [`FsLedger`]: the version ledger as a data package, a CSV table plus a
//!   JSON manifest carrying resource schemas and `updated`.
//! - [`FsBlobStore`]: page content and diff artifacts, one file per
//!   `(page_id, version_id)`.
//!
//! Blocking work runs on tokio's blocking pool so callers never stall the
//! async runtime.

mod encode;
mod schema;

pub mod blob;
pub mod error;
pub mod ledger;

pub use blob::FsBlobStore;
pub use error::{Error, Result};
pub use ledger::FsLedger;
pub use schema::{Manifest, PAGES_RESOURCE, VERSIONS_RESOURCE};
