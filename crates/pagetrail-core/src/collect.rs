//! The collector: discovers new versions of every tracked page, stores their
//! content, and commits them to the ledger in chronological order.
//!
//! Pages are independent. A page whose scan fails with a recoverable error is
//! reported and skipped; nothing is committed for it, so the next run will
//! discover the same versions again. Storage failures abort the run.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  page::{BlobKey, TrackedPage},
  source::VersionSource,
  store::{BlobStore, Ledger, WriteMode},
  version::{CollectedSet, LedgerBatch, RemoteVersion, Version},
};

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageStatus {
  /// No undiscovered versions; no side effects.
  UpToDate,
  Collected { count: usize },
  /// Skipped for this run; retried on the next one.
  Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
  pub page_id:           String,
  /// Listed versions the ledger already had.
  pub already_collected: usize,
  #[serde(flatten)]
  pub status:            PageStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionReport {
  pub pages: Vec<PageReport>,
}

impl CollectionReport {
  /// Total number of versions collected across all pages.
  pub fn collected(&self) -> usize {
    self
      .pages
      .iter()
      .map(|p| match p.status {
        PageStatus::Collected { count } => count,
        _ => 0,
      })
      .sum()
  }

  pub fn failed(&self) -> impl Iterator<Item = &PageReport> {
    self
      .pages
      .iter()
      .filter(|p| matches!(p.status, PageStatus::Failed { .. }))
  }
}

/// The result of a successful scan of one page.
#[derive(Debug, Clone)]
pub struct PageOutcome {
  /// Newly committed versions, chronological.
  pub collected:         Vec<Version>,
  /// Listed versions skipped because the ledger already had them.
  pub already_collected: usize,
}

// ─── Orchestration ───────────────────────────────────────────────────────────

/// Collect new versions for every page in `pages`.
///
/// Returns `Err` only for unrecoverable (storage) failures; per-page source
/// failures are recorded in the report.
pub async fn collect<L, B, S>(
  pages: &[TrackedPage],
  ledger: &L,
  content: &B,
  source: &S,
) -> Result<CollectionReport>
where
  L: Ledger,
  B: BlobStore,
  S: VersionSource,
{
  let existing = ledger.versions().await.map_err(Error::storage)?;
  let mut collected = CollectedSet::from_versions(&existing);
  let mut report = CollectionReport::default();

  for page in pages {
    let (status, already_collected) =
      match collect_page(page, &collected, ledger, content, source).await {
        Ok(outcome) => {
          for v in &outcome.collected {
            collected.insert(&v.page_id, &v.version_id);
          }
          let status = if outcome.collected.is_empty() {
            PageStatus::UpToDate
          } else {
            PageStatus::Collected { count: outcome.collected.len() }
          };
          (status, outcome.already_collected)
        }
        Err(e) if e.is_recoverable() => {
          warn!(page = %page.id, error = %e, "page skipped for this run");
          (PageStatus::Failed { reason: e.to_string() }, 0)
        }
        Err(e) => return Err(e),
      };
    report.pages.push(PageReport { page_id: page.id.clone(), already_collected, status });
  }

  Ok(report)
}

/// Scan one page: fetch and store every undiscovered version, then commit the
/// staged versions to the ledger as one batch.
pub async fn collect_page<L, B, S>(
  page: &TrackedPage,
  collected: &CollectedSet,
  ledger: &L,
  content: &B,
  source: &S,
) -> Result<PageOutcome>
where
  L: Ledger,
  B: BlobStore,
  S: VersionSource,
{
  let mut remote = source
    .list_versions(&page.id)
    .await
    .map_err(Error::source_error)?;
  order_chronologically(&mut remote);

  let mut staged: Vec<Version> = Vec::new();
  let mut staged_ids: HashSet<String> = HashSet::new();
  let mut already_collected = 0;

  for descriptor in remote {
    if collected.contains(&page.id, &descriptor.version_id) {
      debug!(page = %page.id, version = %descriptor.version_id, "version already collected");
      already_collected += 1;
      continue;
    }
    if !staged_ids.insert(descriptor.version_id.clone()) {
      continue;
    }

    let key = BlobKey::new(&page.id, &descriptor.version_id);
    key.validate().map_err(|e| Error::MalformedContent {
      page_id:    page.id.clone(),
      version_id: descriptor.version_id.clone(),
      reason:     e.to_string(),
    })?;

    let bytes = source
      .fetch_content(&page.id, &descriptor.version_id)
      .await
      .map_err(Error::source_error)?;
    let text = String::from_utf8(bytes).map_err(|e| Error::MalformedContent {
      page_id:    page.id.clone(),
      version_id: descriptor.version_id.clone(),
      reason:     e.to_string(),
    })?;

    // A blob may survive from a run that died before committing.
    let written = content
      .write(&key, &text, WriteMode::ReplaceIfDifferent)
      .await
      .map_err(Error::storage)?;
    debug!(page = %page.id, version = %descriptor.version_id, ?written, "stored content");

    staged.push(Version::from_remote(&page.id, descriptor));
  }

  if staged.is_empty() {
    return Ok(PageOutcome { collected: staged, already_collected });
  }

  staged.sort_by_key(|v| v.recorded_at);
  let batch = LedgerBatch {
    page_id:      page.id.clone(),
    versions:     staged.clone(),
    committed_at: Utc::now(),
  };
  let outcome = ledger.commit(batch).await.map_err(Error::storage)?;
  info!(
    page = %page.id,
    appended = outcome.appended,
    duplicates = outcome.duplicates,
    "committed new versions"
  );

  Ok(PageOutcome { collected: staged, already_collected })
}

/// Put source descriptors into causal order.
///
/// Sources typically list newest first. The listing is reversed, then stably
/// sorted by commit time, so equal timestamps keep oldest-first listing order.
pub fn order_chronologically(remote: &mut [RemoteVersion]) {
  remote.reverse();
  remote.sort_by_key(|r| r.committed_at);
}

// ─── Tests ────────────────────────────────────────────────────────────────────
