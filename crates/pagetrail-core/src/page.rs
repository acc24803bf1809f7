//! Tracked pages and blob addressing.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A page whose revision history is monitored. Read-only input sourced from
/// the data package manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackedPage {
  pub id: String,
}

impl TrackedPage {
  pub fn new(id: impl Into<String>) -> Self { Self { id: id.into() } }

  pub fn validate(&self) -> Result<()> { validate_id(&self.id) }
}

/// Address of a stored blob: the raw content of one version of one page, or
/// the diff artifact of that version against its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey {
  pub page_id:    String,
  pub version_id: String,
}

impl BlobKey {
  pub fn new(page_id: impl Into<String>, version_id: impl Into<String>) -> Self {
    Self { page_id: page_id.into(), version_id: version_id.into() }
  }

  /// Reject identifiers that cannot safely become a single path component.
  pub fn validate(&self) -> Result<()> {
    validate_id(&self.page_id)?;
    validate_id(&self.version_id)
  }
}

fn validate_id(id: &str) -> Result<()> {
  let bad = id.is_empty()
    || id == "."
    || id.contains("..")
    || id.contains(['/', '\\'])
    || id.chars().any(char::is_control);
  if bad {
    return Err(Error::InvalidId(id.to_owned()));
  }
  Ok(())
}
