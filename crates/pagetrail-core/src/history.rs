//! Read model consumed by the presentation layer.
//!
//! Never stored, always derived from the ledger and the content store: each
//! page's versions ordered newest first, plus the set of versions whose
//! parent content exists locally (which drives the conditional "view
//! previous version" link).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  Error, Result,
  store::{BlobStore, Ledger},
  version::Version,
};

#[derive(Debug, Clone, Serialize)]
pub struct PageHistory {
  pub page_id:          String,
  /// Newest first.
  pub versions:         Vec<Version>,
  /// Version ids whose parent blob is present in the content store.
  pub has_local_parent: BTreeSet<String>,
}

impl PageHistory {
  pub fn parent_exists_locally(&self, version_id: &str) -> bool {
    self.has_local_parent.contains(version_id)
  }

  pub fn latest(&self) -> Option<&Version> { self.versions.first() }
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteHistory {
  pub last_updated: Option<DateTime<Utc>>,
  pub pages:        Vec<PageHistory>,
}

/// Build the history of one page from already-loaded ledger rows.
pub async fn build_page_history<B: BlobStore>(
  page_id: &str,
  rows: &[Version],
  content: &B,
) -> Result<PageHistory> {
  let mut versions: Vec<Version> = rows
    .iter()
    .filter(|v| v.page_id == page_id)
    .cloned()
    .collect();

  let mut has_local_parent = BTreeSet::new();
  for v in &versions {
    let Some(parent) = v.parent_key() else { continue };
    if parent.validate().is_err() {
      continue;
    }
    if content.exists(&parent).await.map_err(Error::storage)? {
      has_local_parent.insert(v.version_id.clone());
    }
  }

  // Reverse first so the stable sort puts later appends first among ties.
  versions.reverse();
  versions.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

  Ok(PageHistory { page_id: page_id.to_owned(), versions, has_local_parent })
}

/// History of a single page.
pub async fn page_history<L, B>(ledger: &L, content: &B, page_id: &str) -> Result<PageHistory>
where
  L: Ledger,
  B: BlobStore,
{
  let rows = ledger.versions().await.map_err(Error::storage)?;
  build_page_history(page_id, &rows, content).await
}

/// History of every tracked page, in manifest order.
pub async fn site_history<L, B>(ledger: &L, content: &B) -> Result<SiteHistory>
where
  L: Ledger,
  B: BlobStore,
{
  let pages = ledger.tracked_pages().await.map_err(Error::storage)?;
  let rows = ledger.versions().await.map_err(Error::storage)?;
  let last_updated = ledger.last_updated().await.map_err(Error::storage)?;

  let mut histories = Vec::with_capacity(pages.len());
  for page in &pages {
    histories.push(build_page_history(&page.id, &rows, content).await?);
  }
  Ok(SiteHistory { last_updated, pages: histories })
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::TimeZone;

  use super::*;
  use crate::{
    page::BlobKey,
    store::{WriteMode, WriteOutcome},
  };

  #[derive(Debug, thiserror::Error)]
  #[error("unreachable")]
  struct Never;

  struct Present(BTreeMap<BlobKey, String>);

  impl BlobStore for Present {
    type Error = Never;

    async fn exists(&self, key: &BlobKey) -> Result<bool, Never> { Ok(self.0.contains_key(key)) }

    async fn read(&self, key: &BlobKey) -> Result<Option<String>, Never> {
      Ok(self.0.get(key).cloned())
    }

    async fn write(&self, _: &BlobKey, _: &str, _: WriteMode) -> Result<WriteOutcome, Never> {
      Ok(WriteOutcome::Kept)
    }
  }

  fn version(page: &str, id: &str, parent: Option<&str>, secs: i64) -> Version {
    Version {
      page_id:     page.into(),
      version_id:  id.into(),
      parent_id:   parent.map(Into::into),
      recorded_at: Utc.timestamp_opt(secs, 0).unwrap(),
    }
  }

  #[tokio::test]
  async fn versions_are_newest_first_and_filtered_by_page() {
    let rows = vec![
      version("home", "c1", None, 1),
      version("about", "a1", None, 1),
      version("home", "c2", Some("c1"), 2),
      version("home", "c3", Some("c2"), 3),
    ];
    let store = Present(BTreeMap::new());

    let history = build_page_history("home", &rows, &store).await.unwrap();
    let ids: Vec<_> = history.versions.iter().map(|v| v.version_id.as_str()).collect();
    assert_eq!(ids, ["c3", "c2", "c1"]);
    assert_eq!(history.latest().map(|v| v.version_id.as_str()), Some("c3"));
  }

  #[tokio::test]
  async fn equal_timestamps_show_the_later_append_first() {
    let rows = vec![version("home", "c1", None, 5), version("home", "c2", Some("c1"), 5)];
    let store = Present(BTreeMap::new());

    let history = build_page_history("home", &rows, &store).await.unwrap();
    let ids: Vec<_> = history.versions.iter().map(|v| v.version_id.as_str()).collect();
    assert_eq!(ids, ["c2", "c1"]);
  }

  #[tokio::test]
  async fn has_local_parent_reflects_content_store() {
    let rows = vec![
      version("home", "c1", Some("c0"), 1),
      version("home", "c2", Some("c1"), 2),
    ];
    let mut blobs = BTreeMap::new();
    blobs.insert(BlobKey::new("home", "c1"), "<html></html>".to_owned());
    blobs.insert(BlobKey::new("home", "c2"), "<html></html>".to_owned());
    let store = Present(blobs);

    let history = build_page_history("home", &rows, &store).await.unwrap();
    assert!(history.parent_exists_locally("c2"));
    assert!(!history.parent_exists_locally("c1"));
  }

  #[tokio::test]
  async fn unstorable_parent_id_has_no_local_parent() {
    struct Strict;

    impl BlobStore for Strict {
      type Error = crate::Error;

      async fn exists(&self, key: &BlobKey) -> Result<bool> {
        key.validate()?;
        Ok(true)
      }

      async fn read(&self, _: &BlobKey) -> Result<Option<String>> { Ok(None) }

      async fn write(&self, _: &BlobKey, _: &str, _: WriteMode) -> Result<WriteOutcome> {
        Ok(WriteOutcome::Kept)
      }
    }

    let rows = vec![
      version("home", "c1", Some("old/branch"), 1),
      version("home", "c2", Some("c1"), 2),
    ];
    let history = build_page_history("home", &rows, &Strict).await.unwrap();
    assert!(!history.parent_exists_locally("c1"));
    assert!(history.parent_exists_locally("c2"));
  }
}
