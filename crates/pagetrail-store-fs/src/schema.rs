//! The data package manifest (`datapackage.json`).
//!
//! Lists the two tabular resources with their table schemas and carries the
//! `updated` timestamp. Keys this crate does not understand are preserved
//! across rewrites.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{Error, Result};

/// Resource holding the tracked pages (`id` column).
pub const PAGES_RESOURCE: &str = "content-pages";
/// Resource holding the version ledger.
pub const VERSIONS_RESOURCE: &str = "content-collected";

/// Ledger table header, in column order.
pub const VERSION_COLUMNS: [&str; 4] = ["id", "sha", "parent-sha", "date-recorded"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:      Option<String>,
  /// RFC 3339; written only when a commit appended rows.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated:   Option<String>,
  #[serde(default)]
  pub resources: Vec<Resource>,
  #[serde(flatten)]
  pub extra:     Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
  pub name:   String,
  /// Relative to the manifest's directory.
  pub path:   String,
  #[serde(default, skip_serializing_if = "Value::is_null")]
  pub schema: Value,
  #[serde(flatten)]
  pub extra:  Map<String, Value>,
}

impl Manifest {
  /// A fresh manifest describing both resources.
  pub fn new(name: &str) -> Self {
    Self {
      name:      Some(name.to_owned()),
      updated:   None,
      resources: vec![pages_resource(), versions_resource()],
      extra:     Map::new(),
    }
  }

  pub fn resource(&self, name: &str) -> Result<&Resource> {
    self
      .resources
      .iter()
      .find(|r| r.name == name)
      .ok_or_else(|| Error::MissingResource(name.to_owned()))
  }
}

fn pages_resource() -> Resource {
  Resource {
    name:   PAGES_RESOURCE.to_owned(),
    path:   format!("{PAGES_RESOURCE}.csv"),
    schema: json!({
      "fields": [{ "name": "id", "type": "string" }],
      "primaryKey": ["id"],
    }),
    extra:  Map::new(),
  }
}

fn versions_resource() -> Resource {
  Resource {
    name:   VERSIONS_RESOURCE.to_owned(),
    path:   format!("{VERSIONS_RESOURCE}.csv"),
    schema: json!({
      "fields": [
        { "name": "id",            "type": "string" },
        { "name": "sha",           "type": "string" },
        { "name": "parent-sha",    "type": "string" },
        { "name": "date-recorded", "type": "datetime" },
      ],
      "foreignKeys": [{
        "fields": "id",
        "reference": { "resource": PAGES_RESOURCE, "fields": "id" },
      }],
    }),
    extra:  Map::new(),
  }
}
