//! Error type for `pagetrail-store-fs`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] pagetrail_core::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("no data package at {0}; run `pagetrail init` first")]
  NotInitialised(PathBuf),

  #[error("manifest has no resource named {0:?}")]
  MissingResource(String),

  /// A ledger batch may only hold versions of the page it was built for.
  #[error("batch for page {expected:?} contains a version of page {found:?}")]
  ForeignPage { expected: String, found: String },

  #[error("background task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
