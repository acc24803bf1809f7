//! [`FsBlobStore`]: one file per `(page_id, version_id)`.

use std::{
  io::{ErrorKind, Write as _},
  path::{Path, PathBuf},
  sync::Arc,
};

use pagetrail_core::{
  page::BlobKey,
  store::{BlobStore, WriteMode, WriteOutcome},
};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{Error, Result, ledger::write_atomic};

/// Text blobs laid out as `<root>/<page_id>[/<subdir>]/<version_id>.html`.
///
/// [`FsBlobStore::content`] and [`FsBlobStore::diffs`] give the two layouts
/// the pipeline uses; both share the `pages/` tree.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
  inner: Arc<Layout>,
}

#[derive(Debug)]
struct Layout {
  root:   PathBuf,
  subdir: Option<&'static str>,
}

impl FsBlobStore {
  /// Raw page content: `<data_dir>/pages/<page_id>/<version_id>.html`.
  pub fn content(data_dir: impl AsRef<Path>) -> Self {
    Self::with_layout(data_dir.as_ref().join("pages"), None)
  }

  /// Diff artifacts: `<data_dir>/pages/<page_id>/changes/<version_id>.html`.
  pub fn diffs(data_dir: impl AsRef<Path>) -> Self {
    Self::with_layout(data_dir.as_ref().join("pages"), Some("changes"))
  }

  fn with_layout(root: PathBuf, subdir: Option<&'static str>) -> Self {
    Self { inner: Arc::new(Layout { root, subdir }) }
  }

  /// Where `key` lives on disk. Fails for ids that are not a single safe
  /// path component.
  pub fn path_for(&self, key: &BlobKey) -> Result<PathBuf> {
    key.validate()?;
    let mut path = self.inner.root.join(&key.page_id);
    if let Some(sub) = self.inner.subdir {
      path.push(sub);
    }
    path.push(format!("{}.html", key.version_id));
    Ok(path)
  }
}

impl BlobStore for FsBlobStore {
  type Error = Error;

  async fn exists(&self, key: &BlobKey) -> Result<bool> {
    let path = self.path_for(key)?;
    Ok(tokio::fs::try_exists(&path).await?)
  }

  async fn read(&self, key: &BlobKey) -> Result<Option<String>> {
    let path = self.path_for(key)?;
    match tokio::fs::read_to_string(&path).await {
      Ok(body) => Ok(Some(body)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn write(&self, key: &BlobKey, content: &str, mode: WriteMode) -> Result<WriteOutcome> {
    let path = self.path_for(key)?;
    let body = content.to_owned();
    let outcome =
      tokio::task::spawn_blocking(move || write_blob(&path, body.as_bytes(), mode)).await??;
    debug!(page = %key.page_id, version = %key.version_id, ?outcome, "blob write");
    Ok(outcome)
  }
}

fn write_blob(path: &Path, body: &[u8], mode: WriteMode) -> Result<WriteOutcome> {
  let dir = path.parent().unwrap_or_else(|| Path::new("."));
  std::fs::create_dir_all(dir)?;

  match mode {
    WriteMode::CreateOnly => {
      let mut tmp = NamedTempFile::new_in(dir)?;
      tmp.write_all(body)?;
      tmp.as_file().sync_all()?;
      match tmp.persist_noclobber(path) {
        Ok(_) => Ok(WriteOutcome::Created),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(WriteOutcome::Kept),
        Err(e) => Err(Error::Io(e.error)),
      }
    }
    WriteMode::ReplaceIfDifferent => {
      let existing = match std::fs::read(path) {
        Ok(existing) => Some(existing),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
      };
      match existing {
        Some(existing) if existing == body => Ok(WriteOutcome::Unchanged),
        Some(_) => {
          write_atomic(path, body)?;
          Ok(WriteOutcome::Replaced)
        }
        None => {
          write_atomic(path, body)?;
          Ok(WriteOutcome::Created)
        }
      }
    }
  }
}
