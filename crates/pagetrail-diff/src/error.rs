//! Error type for `pagetrail-diff`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("html rewrite failed: {0}")]
  Rewrite(#[from] lol_html::errors::RewritingError),

  #[error(transparent)]
  Core(#[from] pagetrail_core::Error),
}

impl Error {
  /// Storage failures end the run; a page that fails to render does not.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::Core(e) if !e.is_recoverable())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
