//! [`FsLedger`]: the data package implementation of [`Ledger`].

use std::{
  collections::HashSet,
  fs::{self, File, OpenOptions},
  io::Write as _,
  path::{Path, PathBuf},
  sync::Arc,
};

use chrono::{DateTime, Utc};
use pagetrail_core::{
  page::TrackedPage,
  store::Ledger,
  version::{CommitOutcome, LedgerBatch, Version},
};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
  Error, Result,
  encode::{RawPageRow, RawVersionRow, decode_dt, encode_dt},
  schema::{Manifest, PAGES_RESOURCE, VERSION_COLUMNS, VERSIONS_RESOURCE},
};

const MANIFEST_FILE: &str = "datapackage.json";
const LOCK_FILE: &str = ".ledger.lock";
const PACKAGE_NAME: &str = "pagetrail";

// ─── Paths ───────────────────────────────────────────────────────────────────

struct Paths {
  /// Directory holding the manifest; resource paths are relative to it.
  dir:      PathBuf,
  manifest: PathBuf,
  lock:     PathBuf,
}

impl Paths {
  fn new(data_dir: &Path) -> Self {
    let dir = data_dir.join("data");
    Self {
      manifest: dir.join(MANIFEST_FILE),
      lock: dir.join(LOCK_FILE),
      dir,
    }
  }

  fn resource(&self, manifest: &Manifest, name: &str) -> Result<PathBuf> {
    Ok(self.dir.join(&manifest.resource(name)?.path))
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A version ledger stored as a data package under `<data_dir>/data/`.
///
/// The handle is stateless; every call reads the files afresh, so several
/// processes can share one data directory. Commits are serialised by an
/// exclusive lock on `.ledger.lock`.
///
/// Cloning is cheap; the paths are reference-counted.
#[derive(Clone)]
pub struct FsLedger {
  paths: Arc<Paths>,
}

impl FsLedger {
  /// Open an existing data package.
  pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
    let ledger = Self { paths: Arc::new(Paths::new(data_dir.as_ref())) };
    ledger
      .call(|paths| {
        read_manifest(&paths.manifest)?;
        Ok(())
      })
      .await?;
    Ok(ledger)
  }

  /// Create the data package if it is missing and start tracking any of
  /// `pages` that are not tracked yet. Existing rows are left untouched.
  pub async fn init(data_dir: impl AsRef<Path>, pages: &[TrackedPage]) -> Result<Self> {
    let ledger = Self { paths: Arc::new(Paths::new(data_dir.as_ref())) };
    let pages = pages.to_vec();
    ledger
      .call(move |paths| {
        fs::create_dir_all(&paths.dir)?;
        let _lock = acquire_lock(&paths.lock)?;

        let manifest = if paths.manifest.exists() {
          read_manifest(&paths.manifest)?
        } else {
          let manifest = Manifest::new(PACKAGE_NAME);
          write_manifest(&paths.manifest, &manifest)?;
          manifest
        };

        let versions_path = paths.resource(&manifest, VERSIONS_RESOURCE)?;
        if !versions_path.exists() {
          write_version_rows(&versions_path, &[])?;
        }

        let pages_path = paths.resource(&manifest, PAGES_RESOURCE)?;
        add_pages(&pages_path, &pages)
      })
      .await?;
    Ok(ledger)
  }

  /// Run blocking filesystem work on tokio's blocking pool.
  async fn call<F, T>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Paths) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let paths = Arc::clone(&self.paths);
    tokio::task::spawn_blocking(move || f(&paths)).await?
  }
}

// ─── Ledger impl ─────────────────────────────────────────────────────────────

impl Ledger for FsLedger {
  type Error = Error;

  async fn tracked_pages(&self) -> Result<Vec<TrackedPage>> {
    self
      .call(|paths| {
        let manifest = read_manifest(&paths.manifest)?;
        read_pages(&paths.resource(&manifest, PAGES_RESOURCE)?)
      })
      .await
  }

  async fn versions(&self) -> Result<Vec<Version>> {
    let rows = self
      .call(|paths| {
        let manifest = read_manifest(&paths.manifest)?;
        read_version_rows(&paths.resource(&manifest, VERSIONS_RESOURCE)?)
      })
      .await?;
    rows.into_iter().map(RawVersionRow::into_version).collect()
  }

  async fn last_updated(&self) -> Result<Option<DateTime<Utc>>> {
    let updated = self
      .call(|paths| Ok(read_manifest(&paths.manifest)?.updated))
      .await?;
    updated.as_deref().map(decode_dt).transpose()
  }

  async fn commit(&self, batch: LedgerBatch) -> Result<CommitOutcome> {
    if let Some(stray) = batch.versions.iter().find(|v| v.page_id != batch.page_id) {
      return Err(Error::ForeignPage {
        expected: batch.page_id.clone(),
        found:    stray.page_id.clone(),
      });
    }

    self
      .call(move |paths| {
        let _lock = acquire_lock(&paths.lock)?;

        // Re-read under the lock; another process may have committed since
        // the caller loaded the ledger.
        let mut manifest = read_manifest(&paths.manifest)?;
        let table = paths.resource(&manifest, VERSIONS_RESOURCE)?;
        let mut rows = read_version_rows(&table)?;
        let mut seen: HashSet<(String, String)> = rows
          .iter()
          .map(|r| (r.page_id.clone(), r.sha.clone()))
          .collect();

        let mut outcome = CommitOutcome::default();
        for v in &batch.versions {
          if seen.insert((v.page_id.clone(), v.version_id.clone())) {
            rows.push(RawVersionRow::from_version(v));
            outcome.appended += 1;
          } else {
            debug!(page = %v.page_id, version = %v.version_id, "duplicate ledger row skipped");
            outcome.duplicates += 1;
          }
        }

        if outcome.appended == 0 {
          return Ok(outcome);
        }

        write_version_rows(&table, &rows)?;
        manifest.updated = Some(encode_dt(batch.committed_at));
        write_manifest(&paths.manifest, &manifest)?;
        Ok(outcome)
      })
      .await
  }
}

// ─── Blocking helpers ────────────────────────────────────────────────────────

/// Exclusive advisory lock, released when the returned handle is dropped.
fn acquire_lock(path: &Path) -> Result<File> {
  let file = OpenOptions::new()
    .create(true)
    .truncate(false)
    .read(true)
    .write(true)
    .open(path)?;
  fs2::FileExt::lock_exclusive(&file)?;
  Ok(file)
}

fn read_manifest(path: &Path) -> Result<Manifest> {
  let raw = match fs::read(path) {
    Ok(raw) => raw,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      return Err(Error::NotInitialised(path.to_path_buf()));
    }
    Err(e) => return Err(e.into()),
  };
  Ok(serde_json::from_slice(&raw)?)
}

fn write_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
  let mut body = serde_json::to_vec_pretty(manifest)?;
  body.push(b'\n');
  write_atomic(path, &body)
}

fn read_version_rows(path: &Path) -> Result<Vec<RawVersionRow>> {
  if !path.exists() {
    return Ok(Vec::new());
  }
  let mut reader = csv::Reader::from_path(path)?;
  reader
    .deserialize()
    .collect::<std::result::Result<Vec<RawVersionRow>, _>>()
    .map_err(Error::from)
}

fn write_version_rows(path: &Path, rows: &[RawVersionRow]) -> Result<()> {
  let mut writer = csv::WriterBuilder::new()
    .has_headers(false)
    .from_writer(Vec::new());
  writer.write_record(VERSION_COLUMNS)?;
  for row in rows {
    writer.serialize(row)?;
  }
  let body = writer
    .into_inner()
    .map_err(|e| Error::Io(e.into_error()))?;
  write_atomic(path, &body)
}

fn read_pages(path: &Path) -> Result<Vec<TrackedPage>> {
  let mut reader = csv::Reader::from_path(path)?;
  let mut pages = Vec::new();
  for row in reader.deserialize::<RawPageRow>() {
    let id = row?.id.trim().to_owned();
    if !id.is_empty() {
      pages.push(TrackedPage { id });
    }
  }
  Ok(pages)
}

/// Append page ids not yet present, keeping any extra columns intact.
fn add_pages(path: &Path, pages: &[TrackedPage]) -> Result<()> {
  let (headers, mut records) = if path.exists() {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let records = reader
      .records()
      .collect::<std::result::Result<Vec<_>, _>>()?;
    (headers, records)
  } else {
    (csv::StringRecord::from(vec!["id"]), Vec::new())
  };

  let id_column = headers
    .iter()
    .position(|h| h == "id")
    .ok_or_else(|| Error::MissingResource(format!("{PAGES_RESOURCE}.id")))?;
  let mut known: HashSet<String> = records
    .iter()
    .filter_map(|r| r.get(id_column).map(str::to_owned))
    .collect();

  let mut added = false;
  for page in pages {
    page.validate()?;
    if known.insert(page.id.clone()) {
      let mut record = vec![String::new(); headers.len()];
      record[id_column] = page.id.clone();
      records.push(csv::StringRecord::from(record));
      added = true;
    }
  }
  if !added && path.exists() {
    return Ok(());
  }

  let mut writer = csv::Writer::from_writer(Vec::new());
  writer.write_record(&headers)?;
  for record in &records {
    writer.write_record(record)?;
  }
  let body = writer
    .into_inner()
    .map_err(|e| Error::Io(e.into_error()))?;
  write_atomic(path, &body)
}

/// Write through a temporary file in the same directory, then rename over
/// `path`; readers see either the old or the new file, never a mix.
pub(crate) fn write_atomic(path: &Path, body: &[u8]) -> Result<()> {
  let dir = path.parent().unwrap_or_else(|| Path::new("."));
  let mut tmp = NamedTempFile::new_in(dir)?;
  tmp.write_all(body)?;
  tmp.as_file().sync_all()?;
  tmp.persist(path).map_err(|e| Error::Io(e.error))?;
  Ok(())
}
