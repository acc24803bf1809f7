//! [`GithubSource`]: commits and contents of one repository path.

use std::time::Duration;

use pagetrail_core::{source::VersionSource, version::RemoteVersion};
use reqwest::{
  Client, RequestBuilder, Response, StatusCode, Url,
  header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
  Error, Result,
  wire::{CommitEntry, FileContent},
};

const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

/// Connection settings for the GitHub API.
#[derive(Debug, Clone)]
pub struct GithubConfig {
  pub api_base:      String,
  /// `owner/name`.
  pub repo:          String,
  /// Directory inside the repository holding `<page_id>.html` files.
  pub source_dir:    String,
  pub token:         Option<String>,
  pub timeout:       Duration,
  /// Extra attempts after the first for retryable failures.
  pub max_retries:   u32,
  /// Delay before the first retry; doubled for each further one.
  pub retry_backoff: Duration,
  pub per_page:      u32,
}

impl Default for GithubConfig {
  fn default() -> Self {
    Self {
      api_base:      "https://api.github.com".to_owned(),
      repo:          "test-and-trace-data/content-collector".to_owned(),
      source_dir:    "collected".to_owned(),
      token:         None,
      timeout:       Duration::from_secs(30),
      max_retries:   3,
      retry_backoff: Duration::from_millis(500),
      per_page:      100,
    }
  }
}

/// Async client for the commits and contents endpoints.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GithubSource {
  client: Client,
  config: GithubConfig,
}

impl GithubSource {
  pub fn new(config: GithubConfig) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
    if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
      // A token may already carry its scheme, e.g. `token ghp_..`.
      let credential =
        if token.contains(' ') { token.to_owned() } else { format!("Bearer {token}") };
      let mut value = HeaderValue::from_str(&credential).map_err(|e| {
        Error::Malformed { url: config.api_base.clone(), reason: format!("token: {e}") }
      })?;
      value.set_sensitive(true);
      headers.insert(AUTHORIZATION, value);
    }

    let client = Client::builder()
      .timeout(config.timeout)
      .user_agent(concat!("pagetrail/", env!("CARGO_PKG_VERSION")))
      .default_headers(headers)
      .build()?;
    Ok(Self { client, config })
  }

  /// `{api_base}/repos/{repo}/..segments`, each segment percent-encoded.
  fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<String> {
    let base = &self.config.api_base;
    let malformed = |reason: String| Error::Malformed { url: base.clone(), reason };

    let mut url = Url::parse(base).map_err(|e| malformed(e.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|()| malformed("not a base URL".to_owned()))?
      .pop_if_empty()
      .push("repos")
      .extend(self.config.repo.split('/'))
      .extend(segments);
    Ok(url.into())
  }

  fn source_dir(&self) -> impl Iterator<Item = &str> {
    self.config.source_dir.split('/').filter(|s| !s.is_empty())
  }

  fn page_path(&self, page_id: &str) -> String {
    let file = format!("{page_id}.html");
    self.source_dir().chain([file.as_str()]).collect::<Vec<_>>().join("/")
  }

  /// Send with bounded retries for transport errors, 5xx and 429.
  async fn send<F>(&self, url: &str, build: F) -> Result<Response>
  where
    F: Fn() -> RequestBuilder,
  {
    let mut attempt = 0;
    loop {
      let failure = match build().send().await {
        Ok(resp) if resp.status().is_success() => return Ok(resp),
        Ok(resp) if is_retryable(resp.status()) => Error::Status {
          url:    url.to_owned(),
          status: resp.status(),
        },
        Ok(resp) => return Err(Error::Status { url: url.to_owned(), status: resp.status() }),
        Err(e) if e.is_builder() => return Err(e.into()),
        Err(e) => Error::Http(e),
      };

      if attempt >= self.config.max_retries {
        return Err(failure);
      }
      let delay = self.config.retry_backoff * 2u32.saturating_pow(attempt);
      warn!(%url, attempt = attempt + 1, ?delay, "request failed, retrying: {failure}");
      tokio::time::sleep(delay).await;
      attempt += 1;
    }
  }

  async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
    let resp = self.send(url, || self.client.get(url).query(query)).await?;
    resp.json().await.map_err(|e| Error::Malformed {
      url:    url.to_owned(),
      reason: e.to_string(),
    })
  }

  // ── Commits ───────────────────────────────────────────────────────────────

  /// `GET /repos/{repo}/commits?path=..`, every page.
  pub async fn commits(&self, page_id: &str) -> Result<Vec<RemoteVersion>> {
    let url = self.url(["commits"])?;
    let path = self.page_path(page_id);
    let per_page = self.config.per_page.max(1);

    let mut versions = Vec::new();
    for page in 1u32.. {
      let entries: Vec<CommitEntry> = self
        .get_json(&url, &[
          ("path", path.clone()),
          ("per_page", per_page.to_string()),
          ("page", page.to_string()),
        ])
        .await?;
      let count = entries.len();

      for entry in entries {
        let sha = entry.sha.clone();
        let remote = entry.into_remote().ok_or_else(|| Error::Malformed {
          url:    url.clone(),
          reason: format!("commit {sha} has no date"),
        })?;
        versions.push(remote);
      }

      if count < per_page as usize {
        break;
      }
    }
    debug!(page = page_id, count = versions.len(), "listed commits");
    Ok(versions)
  }

  // ── Contents ──────────────────────────────────────────────────────────────

  /// The page file as of `sha`.
  pub async fn contents(&self, page_id: &str, sha: &str) -> Result<Vec<u8>> {
    let file = format!("{page_id}.html");
    let url = self.url(["contents"].into_iter().chain(self.source_dir()).chain([file.as_str()]))?;
    let query = [("ref", sha.to_owned())];

    let file: FileContent = self.get_json(&url, &query).await?;
    match file.inline_bytes() {
      Some(Ok(bytes)) => Ok(bytes),
      Some(Err(e)) => Err(Error::Malformed { url, reason: format!("base64: {e}") }),
      None => {
        debug!(page = page_id, %sha, "no inline content, requesting raw file");
        let resp = self
          .send(&url, || {
            self.client.get(&url).query(&query).header(ACCEPT, RAW_MEDIA_TYPE)
          })
          .await?;
        Ok(resp.bytes().await?.to_vec())
      }
    }
  }
}

fn is_retryable(status: StatusCode) -> bool {
  status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

impl VersionSource for GithubSource {
  type Error = Error;

  async fn list_versions(&self, page_id: &str) -> Result<Vec<RemoteVersion>> {
    self.commits(page_id).await
  }

  async fn fetch_content(&self, page_id: &str, version_id: &str) -> Result<Vec<u8>> {
    self.contents(page_id, version_id).await
  }
}
