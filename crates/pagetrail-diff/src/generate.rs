//! Cached diff generation over the ledger.

use pagetrail_core::{
  page::BlobKey,
  store::{BlobStore, Ledger, WriteMode, WriteOutcome},
  version::Version,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{DiffMeta, Error, Result, render_diff};

/// A diff artifact written by this call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffArtifact {
  pub key:       BlobKey,
  pub parent_id: String,
}

/// Totals for one [`generate_diffs`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
  pub written:         usize,
  /// An artifact already existed.
  pub cached:          usize,
  /// Root versions, and versions whose own or parent content is not stored.
  pub missing_content: usize,
  /// Rendering failed; retried next run.
  pub failed:          usize,
}

enum Outcome {
  Written(DiffArtifact),
  Cached,
  MissingContent,
}

/// Diff `version` against its parent unless an artifact already exists or
/// either document is missing. Returns the artifact only when one was
/// written by this call.
pub async fn generate_diff<C, D>(
  content: &C,
  diffs: &D,
  version: &Version,
) -> Result<Option<DiffArtifact>>
where
  C: BlobStore,
  D: BlobStore,
{
  Ok(match diff_version(content, diffs, version).await? {
    Outcome::Written(artifact) => Some(artifact),
    Outcome::Cached | Outcome::MissingContent => None,
  })
}

async fn diff_version<C, D>(content: &C, diffs: &D, version: &Version) -> Result<Outcome>
where
  C: BlobStore,
  D: BlobStore,
{
  let key = version.key();
  let Some(meta) = DiffMeta::for_version(version) else {
    debug!(page = %key.page_id, version = %key.version_id, "root version, nothing to diff");
    return Ok(Outcome::MissingContent);
  };

  // An id that cannot name a blob has no stored content.
  let parent_key = BlobKey::new(meta.page_id, meta.parent_id);
  if key.validate().is_err() || parent_key.validate().is_err() {
    debug!(
      page = %key.page_id,
      version = %key.version_id,
      parent = %meta.parent_id,
      "unstorable id, skipping diff"
    );
    return Ok(Outcome::MissingContent);
  }

  if diffs.exists(&key).await.map_err(storage)? {
    debug!(page = %key.page_id, version = %key.version_id, "diff already exists");
    return Ok(Outcome::Cached);
  }

  let current = content.read(&key).await.map_err(storage)?;
  let parent = content.read(&parent_key).await.map_err(storage)?;
  let (Some(current), Some(parent)) = (current, parent) else {
    debug!(
      page = %key.page_id,
      version = %key.version_id,
      parent = %meta.parent_id,
      "content missing locally, skipping diff"
    );
    return Ok(Outcome::MissingContent);
  };

  let html = render_diff(&current, &parent, &meta)?;
  match diffs.write(&key, &html, WriteMode::CreateOnly).await.map_err(storage)? {
    WriteOutcome::Kept => Ok(Outcome::Cached),
    _ => {
      info!(page = %key.page_id, version = %key.version_id, "wrote diff");
      Ok(Outcome::Written(DiffArtifact { parent_id: meta.parent_id.to_owned(), key }))
    }
  }
}

/// Generate every missing diff, page by page in ledger order.
///
/// Storage failures abort the run; a version that fails to render is logged,
/// counted, and left for the next run.
pub async fn generate_diffs<L, C, D>(ledger: &L, content: &C, diffs: &D) -> Result<DiffReport>
where
  L: Ledger,
  C: BlobStore,
  D: BlobStore,
{
  let rows = ledger.versions().await.map_err(storage)?;
  let mut report = DiffReport::default();

  for version in &rows {
    match diff_version(content, diffs, version).await {
      Ok(Outcome::Written(_)) => report.written += 1,
      Ok(Outcome::Cached) => report.cached += 1,
      Ok(Outcome::MissingContent) => report.missing_content += 1,
      Err(e) if e.is_fatal() => return Err(e),
      Err(e) => {
        warn!(page = %version.page_id, version = %version.version_id, "diff failed: {e}");
        report.failed += 1;
      }
    }
  }
  Ok(report)
}

fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Error {
  pagetrail_core::Error::storage(e).into()
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use pagetrail_core::{page::TrackedPage, version::LedgerBatch};
  use pagetrail_store_fs::{FsBlobStore, FsLedger};

  use super::*;

  fn version(id: &str, parent: Option<&str>, secs: i64) -> Version {
    Version {
      page_id:     "home".into(),
      version_id:  id.into(),
      parent_id:   parent.map(Into::into),
      recorded_at: Utc.timestamp_opt(secs, 0).unwrap(),
    }
  }

  async fn put(store: &FsBlobStore, id: &str, body: &str) {
    store
      .write(&BlobKey::new("home", id), body, WriteMode::CreateOnly)
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn writes_once_then_hits_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let content = FsBlobStore::content(dir.path());
    let diffs = FsBlobStore::diffs(dir.path());
    put(&content, "c1", "<p>one</p>").await;
    put(&content, "c2", "<p>two</p>").await;

    let c2 = version("c2", Some("c1"), 2);
    let artifact = generate_diff(&content, &diffs, &c2).await.unwrap().unwrap();
    assert_eq!(artifact.key, BlobKey::new("home", "c2"));
    assert_eq!(artifact.parent_id, "c1");

    let first = std::fs::read(dir.path().join("pages/home/changes/c2.html")).unwrap();
    assert!(generate_diff(&content, &diffs, &c2).await.unwrap().is_none());
    let second = std::fs::read(dir.path().join("pages/home/changes/c2.html")).unwrap();
    assert_eq!(first, second);
  }

  #[tokio::test]
  async fn missing_parent_content_is_skipped_silently() {
    let dir = tempfile::tempdir().unwrap();
    let content = FsBlobStore::content(dir.path());
    let diffs = FsBlobStore::diffs(dir.path());
    put(&content, "c3", "<p>three</p>").await;

    let c3 = version("c3", Some("c0"), 3);
    assert!(generate_diff(&content, &diffs, &c3).await.unwrap().is_none());
    assert!(!diffs.exists(&c3.key()).await.unwrap());
  }

  #[tokio::test]
  async fn generate_diffs_covers_the_whole_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = FsLedger::init(dir.path(), &[TrackedPage::new("home")]).await.unwrap();
    let content = FsBlobStore::content(dir.path());
    let diffs = FsBlobStore::diffs(dir.path());

    ledger
      .commit(LedgerBatch {
        page_id:      "home".into(),
        versions:     vec![
          version("c1", None, 1),
          version("c2", Some("c1"), 2),
          version("c3", Some("c2"), 3),
          version("c5", Some("c4"), 5),
        ],
        committed_at: Utc.timestamp_opt(10, 0).unwrap(),
      })
      .await
      .unwrap();
    for (id, body) in [("c1", "<p>a</p>"), ("c2", "<p>a b</p>"), ("c3", "<p>b</p>"), ("c5", "<p>c</p>")] {
      put(&content, id, body).await;
    }

    let first = generate_diffs(&ledger, &content, &diffs).await.unwrap();
    assert_eq!(first, DiffReport { written: 2, cached: 0, missing_content: 2, failed: 0 });

    let second = generate_diffs(&ledger, &content, &diffs).await.unwrap();
    assert_eq!(second, DiffReport { written: 0, cached: 2, missing_content: 2, failed: 0 });
  }

  #[tokio::test]
  async fn unstorable_parent_id_is_missing_content() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = FsLedger::init(dir.path(), &[TrackedPage::new("home")]).await.unwrap();
    let content = FsBlobStore::content(dir.path());
    let diffs = FsBlobStore::diffs(dir.path());

    ledger
      .commit(LedgerBatch {
        page_id:      "home".into(),
        versions:     vec![version("c1", Some("old/branch"), 1), version("c2", Some("c1"), 2)],
        committed_at: Utc.timestamp_opt(10, 0).unwrap(),
      })
      .await
      .unwrap();
    put(&content, "c1", "<p>a</p>").await;
    put(&content, "c2", "<p>b</p>").await;

    let report = generate_diffs(&ledger, &content, &diffs).await.unwrap();
    assert_eq!(report, DiffReport { written: 1, cached: 0, missing_content: 1, failed: 0 });
    assert!(diffs.exists(&BlobKey::new("home", "c2")).await.unwrap());
  }
}
