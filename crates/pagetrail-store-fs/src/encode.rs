//! Encoding and decoding helpers between domain types and the plain-text
//! CSV rows of the data package.
//!
//! Timestamps are written as RFC 3339 UTC. On read, naive ISO 8601 values
//! (no offset) are accepted and taken as UTC. An empty `parent-sha` cell
//! means the version has no parent.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use pagetrail_core::version::Version;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::AutoSi, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
    .map(|naive| naive.and_utc())
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// One row of the ledger table, as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawVersionRow {
  #[serde(rename = "id")]
  pub page_id:       String,
  pub sha:           String,
  #[serde(rename = "parent-sha", default)]
  pub parent_sha:    String,
  #[serde(rename = "date-recorded")]
  pub date_recorded: String,
}

impl RawVersionRow {
  pub fn from_version(v: &Version) -> Self {
    Self {
      page_id:       v.page_id.clone(),
      sha:           v.version_id.clone(),
      parent_sha:    v.parent_id.clone().unwrap_or_default(),
      date_recorded: encode_dt(v.recorded_at),
    }
  }

  pub fn into_version(self) -> Result<Version> {
    Ok(Version {
      recorded_at: decode_dt(&self.date_recorded)?,
      page_id:     self.page_id,
      version_id:  self.sha,
      parent_id:   Some(self.parent_sha).filter(|p| !p.is_empty()),
    })
  }
}

/// One row of the tracked-pages table. Other columns are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPageRow {
  pub id: String,
}
