//! Error type for `pagetrail-github`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{url} returned {status}")]
  Status { url: String, status: reqwest::StatusCode },

  #[error("malformed response from {url}: {reason}")]
  Malformed { url: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
