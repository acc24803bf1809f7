//! Layered settings: defaults, then `pagetrail.toml`, then `PAGETRAIL_*`
//! environment variables (a `.env` file is read first).

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use pagetrail_github::GithubConfig;
use serde::Deserialize;

const DEFAULT_FILE: &str = "pagetrail.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub data_dir:     PathBuf,
  pub api_base:     String,
  pub repo:         String,
  pub source_dir:   String,
  pub token:        Option<String>,
  /// Site base URL, passed through to the history export.
  pub base_url:     Option<String>,
  pub timeout_secs: u64,
  pub max_retries:  u32,
}

impl Default for Settings {
  fn default() -> Self {
    let github = GithubConfig::default();
    Self {
      data_dir:     PathBuf::from("."),
      api_base:     github.api_base,
      repo:         github.repo,
      source_dir:   github.source_dir,
      token:        None,
      base_url:     None,
      timeout_secs: github.timeout.as_secs(),
      max_retries:  github.max_retries,
    }
  }
}

impl Settings {
  /// Load settings. An explicit `path` must exist; the default file is
  /// optional.
  pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
    dotenvy::dotenv().ok();

    let file = path.unwrap_or(Path::new(DEFAULT_FILE));
    let mut settings: Settings = config::Config::builder()
      .add_source(config::File::from(file).required(path.is_some()))
      .add_source(config::Environment::with_prefix("PAGETRAIL"))
      .build()
      .with_context(|| format!("failed to read settings from {}", file.display()))?
      .try_deserialize()
      .context("failed to deserialise settings")?;

    // Unprefixed names predate the PAGETRAIL_ prefix.
    settings.token = settings.token.or_else(|| legacy_var("TOKEN"));
    settings.base_url = settings.base_url.or_else(|| legacy_var("BASE_URL"));
    Ok(settings)
  }

  pub fn github(&self) -> GithubConfig {
    GithubConfig {
      api_base: self.api_base.clone(),
      repo: self.repo.clone(),
      source_dir: self.source_dir.clone(),
      token: self.token.clone(),
      timeout: Duration::from_secs(self.timeout_secs),
      max_retries: self.max_retries,
      ..GithubConfig::default()
    }
  }
}

fn legacy_var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_point_at_the_content_collector_repo() {
    let s = Settings::default();
    assert_eq!(s.data_dir, PathBuf::from("."));
    assert_eq!(s.api_base, "https://api.github.com");
    assert_eq!(s.repo, "test-and-trace-data/content-collector");
    assert_eq!(s.source_dir, "collected");
    assert_eq!(s.timeout_secs, 30);
    assert_eq!(s.max_retries, 3);
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "repo = \"acme/site\"\nmax_retries = 0\n").unwrap();

    let s = Settings::load(Some(&path)).unwrap();
    assert_eq!(s.repo, "acme/site");
    assert_eq!(s.max_retries, 0);
    assert_eq!(s.source_dir, "collected");

    let github = s.github();
    assert_eq!(github.repo, "acme/site");
    assert_eq!(github.max_retries, 0);
  }

  #[test]
  fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
  }
}
