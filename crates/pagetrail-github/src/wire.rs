//! The subset of GitHub's JSON payloads the client reads.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use pagetrail_core::version::RemoteVersion;
use serde::Deserialize;

/// One entry of `GET /repos/{repo}/commits`.
#[derive(Debug, Deserialize)]
pub struct CommitEntry {
  pub sha:     String,
  #[serde(default)]
  pub parents: Vec<ParentRef>,
  pub commit:  CommitDetail,
}

#[derive(Debug, Deserialize)]
pub struct ParentRef {
  pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitDetail {
  pub committer: Option<Signature>,
  pub author:    Option<Signature>,
}

#[derive(Debug, Deserialize)]
pub struct Signature {
  pub date: Option<DateTime<Utc>>,
}

impl CommitEntry {
  /// `None` when neither committer nor author carry a date.
  pub fn into_remote(self) -> Option<RemoteVersion> {
    let date = |s: &Option<Signature>| s.as_ref().and_then(|s| s.date);
    let committed_at = date(&self.commit.committer).or_else(|| date(&self.commit.author))?;
    Some(RemoteVersion {
      version_id: self.sha,
      parent_id: self.parents.into_iter().next().map(|p| p.sha),
      committed_at,
    })
  }
}

/// `GET /repos/{repo}/contents/{path}` for a file.
#[derive(Debug, Deserialize)]
pub struct FileContent {
  #[serde(default)]
  pub encoding: Option<String>,
  #[serde(default)]
  pub content:  Option<String>,
}

impl FileContent {
  /// Inline bytes if the API embedded them; `None` means the raw media type
  /// has to be requested.
  pub fn inline_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
    if self.encoding.as_deref() != Some("base64") {
      return None;
    }
    let content = self.content.as_deref()?;
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Some(STANDARD.decode(compact))
  }
}
