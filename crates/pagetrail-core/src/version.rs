//! Version types, the unit recorded in the ledger.
//!
//! A version is created exactly once per discovered content change and is
//! never mutated. Ordering within a page is chronological by `recorded_at`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::page::BlobKey;

// ─── Remote descriptor ───────────────────────────────────────────────────────

/// A version as described by the external source, before collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVersion {
  /// Opaque content-addressed identifier (a commit hash).
  pub version_id:   String,
  /// `None` for the root of the history.
  pub parent_id:    Option<String>,
  pub committed_at: DateTime<Utc>,
}

// ─── Version ─────────────────────────────────────────────────────────────────

/// An immutable ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
  pub page_id:     String,
  pub version_id:  String,
  /// The parent version id. Its content may legitimately be absent locally
  /// (collection started mid-history, truncated ledger).
  pub parent_id:   Option<String>,
  pub recorded_at: DateTime<Utc>,
}

impl Version {
  /// Build the ledger record for a descriptor discovered for `page_id`.
  pub fn from_remote(page_id: &str, remote: RemoteVersion) -> Self {
    Self {
      page_id:     page_id.to_owned(),
      version_id:  remote.version_id,
      parent_id:   remote.parent_id.filter(|p| !p.is_empty()),
      recorded_at: remote.committed_at,
    }
  }

  pub fn has_parent(&self) -> bool { self.parent_id.is_some() }

  /// Blob key of this version's own content (and of its diff artifact).
  pub fn key(&self) -> BlobKey { BlobKey::new(&self.page_id, &self.version_id) }

  /// Blob key of the parent's content, if there is a parent.
  pub fn parent_key(&self) -> Option<BlobKey> {
    self
      .parent_id
      .as_deref()
      .map(|parent| BlobKey::new(&self.page_id, parent))
  }
}

// ─── Derived collected set ───────────────────────────────────────────────────

/// The set of already-collected `(page_id, version_id)` pairs, derived from
/// the ledger for O(1) duplicate checks.
#[derive(Debug, Clone, Default)]
pub struct CollectedSet {
  seen: HashSet<(String, String)>,
}

impl CollectedSet {
  pub fn from_versions<'a>(versions: impl IntoIterator<Item = &'a Version>) -> Self {
    let seen = versions
      .into_iter()
      .map(|v| (v.page_id.clone(), v.version_id.clone()))
      .collect();
    Self { seen }
  }

  pub fn contains(&self, page_id: &str, version_id: &str) -> bool {
    self.seen.contains(&(page_id.to_owned(), version_id.to_owned()))
  }

  /// Returns `false` if the pair was already present.
  pub fn insert(&mut self, page_id: &str, version_id: &str) -> bool {
    self.seen.insert((page_id.to_owned(), version_id.to_owned()))
  }

  pub fn len(&self) -> usize { self.seen.len() }

  pub fn is_empty(&self) -> bool { self.seen.is_empty() }
}

// ─── Commit unit ─────────────────────────────────────────────────────────────

/// All versions collected for one page in one run. Committed to the ledger
/// as a single all-or-nothing append.
#[derive(Debug, Clone)]
pub struct LedgerBatch {
  pub page_id:      String,
  /// Chronological order; stored as given.
  pub versions:     Vec<Version>,
  /// Becomes the ledger's `last_updated` when anything is appended.
  pub committed_at: DateTime<Utc>,
}

/// What a ledger commit actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOutcome {
  pub appended:   usize,
  /// Rows skipped because the ledger already held them.
  pub duplicates: usize,
}
