//! GitHub REST client implementing [`pagetrail_core::source::VersionSource`].
//!
//! A tracked page is the file `<source_dir>/<page_id>.html` in one
//! repository. Its versions are the commits that touched that path; its
//! content at a version is the file as of that commit.

pub mod client;
pub mod error;
mod wire;

pub use client::{GithubConfig, GithubSource};
pub use error::{Error, Result};
