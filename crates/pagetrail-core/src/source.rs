//! The `VersionSource` trait: the external, read-only provider of page
//! revisions (a hosted repository API).

use std::future::Future;

use crate::version::RemoteVersion;

pub trait VersionSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every known version of a page. No ordering is assumed; the collector
  /// sorts explicitly.
  fn list_versions<'a>(
    &'a self,
    page_id: &'a str,
  ) -> impl Future<Output = Result<Vec<RemoteVersion>, Self::Error>> + Send + 'a;

  /// Raw bytes of the page as of `version_id`.
  fn fetch_content<'a>(
    &'a self,
    page_id: &'a str,
    version_id: &'a str,
  ) -> impl Future<Output = Result<Vec<u8>, Self::Error>> + Send + 'a;
}
