//! The `Ledger` and `BlobStore` traits.
//!
//! Implemented by storage backends (e.g. `pagetrail-store-fs`). The collector,
//! the diff engine, and the history view depend on these abstractions, not on
//! any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  page::{BlobKey, TrackedPage},
  version::{CommitOutcome, LedgerBatch, Version},
};

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// Append-only record of every collected version, plus ledger metadata.
///
/// Rows are never updated or deleted. The only write is [`Ledger::commit`],
/// which appends one page's batch and bumps `last_updated` atomically.
pub trait Ledger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The pages whose history is tracked, in manifest order.
  fn tracked_pages(
    &self,
  ) -> impl Future<Output = Result<Vec<TrackedPage>, Self::Error>> + Send + '_;

  /// Every ledger row across all pages, in stored (append) order.
  fn versions(
    &self,
  ) -> impl Future<Output = Result<Vec<Version>, Self::Error>> + Send + '_;

  /// When new versions were last committed; `None` for a fresh ledger.
  fn last_updated(
    &self,
  ) -> impl Future<Output = Result<Option<DateTime<Utc>>, Self::Error>> + Send + '_;

  /// Append a page batch.
  ///
  /// Rows whose `(page_id, version_id)` is already present are skipped. If at
  /// least one row is appended, `last_updated` becomes `batch.committed_at`
  /// in the same commit. Either the whole batch lands or nothing does.
  fn commit(
    &self,
    batch: LedgerBatch,
  ) -> impl Future<Output = Result<CommitOutcome, Self::Error>> + Send + '_;
}

// ─── Blobs ───────────────────────────────────────────────────────────────────

/// How a blob write treats an existing blob under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
  /// Never touch an existing blob.
  CreateOnly,
  /// Keep an identical blob, replace a differing one.
  ReplaceIfDifferent,
}

/// What a blob write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  Created,
  /// `ReplaceIfDifferent` found identical content.
  Unchanged,
  /// `ReplaceIfDifferent` overwrote differing content.
  Replaced,
  /// `CreateOnly` found an existing blob and left it alone.
  Kept,
}

/// Addressable text blob storage keyed by `(page_id, version_id)`.
///
/// Used both for raw page content and for cached diff artifacts.
pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn exists<'a>(
    &'a self,
    key: &'a BlobKey,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Returns `None` if no blob is stored under `key`.
  fn read<'a>(
    &'a self,
    key: &'a BlobKey,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn write<'a>(
    &'a self,
    key: &'a BlobKey,
    content: &'a str,
    mode: WriteMode,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;
}
