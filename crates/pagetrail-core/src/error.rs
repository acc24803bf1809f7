//! Error types for `pagetrail-core`.

use thiserror::Error;

/// A type-erased error from a backend or source implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// The version source failed (network error, unexpected status, bad
  /// payload). Recovered at page granularity.
  #[error("source error: {0}")]
  Source(#[source] BoxError),

  /// The source answered, but the content could not be decoded as text.
  #[error("malformed content for {page_id}@{version_id}: {reason}")]
  MalformedContent {
    page_id:    String,
    version_id: String,
    reason:     String,
  },

  /// A local storage operation failed. Fatal to the current invocation.
  #[error("storage error: {0}")]
  Storage(#[source] BoxError),

  #[error("invalid identifier: {0:?}")]
  InvalidId(String),
}

impl Error {
  pub fn source_error(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Source(Box::new(e))
  }

  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }

  /// Whether the failure only affects the page being processed, so the run
  /// can continue with the next page.
  pub fn is_recoverable(&self) -> bool {
    matches!(self, Self::Source(_) | Self::MalformedContent { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
