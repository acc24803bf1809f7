//! Sanitized, annotated HTML diffs between a version and its parent.
//!
//! [`render_diff`] is the pure pipeline:
//!
//! 1. sanitize both documents with a fixed policy,
//! 2. tokenize each `<body>` into tags and words,
//! 3. diff the token streams (Myers),
//! 4. style `ins`/`del` and disable links,
//! 5. wrap the result in the current page's `<head>` under a banner.
//!
//! Output is a function of the two inputs and the banner metadata only, so
//! re-rendering is byte-identical. [`generate_diff`] and [`generate_diffs`]
//! add caching on top: an existing artifact is never recomputed.

mod annotate;
mod htmldiff;
mod markup;
mod sanitize;

pub mod document;
pub mod error;
pub mod generate;

pub use document::DiffMeta;
pub use error::{Error, Result};
pub use generate::{DiffArtifact, DiffReport, generate_diff, generate_diffs};

pub fn render_diff(current: &str, parent: &str, meta: &DiffMeta<'_>) -> Result<String> {
  let new = markup::body_tokens(&sanitize::sanitize(current)?);
  let old = markup::body_tokens(&sanitize::sanitize(parent)?);
  let body = annotate::annotate(&htmldiff::diff_tokens(&old, &new))?;
  Ok(document::assemble(current, meta, &body))
}
