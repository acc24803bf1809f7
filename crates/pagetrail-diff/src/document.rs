//! Final page assembly around a rendered diff body.

use chrono::{DateTime, SecondsFormat, Utc};
use html_escape::encode_text;
use pagetrail_core::version::Version;
use scraper::Html;

use crate::markup::{child_element, serialize, start_tag};

/// What the banner at the top of a diff page says.
#[derive(Debug, Clone, Copy)]
pub struct DiffMeta<'a> {
  pub page_id:     &'a str,
  pub version_id:  &'a str,
  pub parent_id:   &'a str,
  pub recorded_at: DateTime<Utc>,
}

impl<'a> DiffMeta<'a> {
  /// `None` for a root version.
  pub fn for_version(v: &'a Version) -> Option<Self> {
    Some(Self {
      page_id:     &v.page_id,
      version_id:  &v.version_id,
      parent_id:   v.parent_id.as_deref()?,
      recorded_at: v.recorded_at,
    })
  }
}

fn banner(meta: &DiffMeta<'_>) -> String {
  let recorded = meta.recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true);
  format!(
    concat!(
      "<div class=\"pagetrail-diff-meta\" style=\"border: 2px solid #1d70b8; padding: 1em; margin: 1em\">\n",
      "<p>Changes to page <strong>{page}</strong>. This is a comparison, not the live page.</p>\n",
      "<p>Previous version: <code>{parent}</code><br>Current version: <code>{current}</code></p>\n",
      "<p>Change recorded: <time datetime=\"{recorded}\">{recorded}</time></p>\n",
      "</div>",
    ),
    page = encode_text(meta.page_id),
    parent = encode_text(meta.parent_id),
    current = encode_text(meta.version_id),
    recorded = recorded,
  )
}

/// Wrap `body` in the current document's `<html>` attributes and original,
/// unsanitized `<head>`, with the banner first in `<body>`.
pub fn assemble(current: &str, meta: &DiffMeta<'_>, body: &str) -> String {
  let doc = Html::parse_document(current);
  let root = doc.root_element();

  let mut out = String::from("<!DOCTYPE html>\n");
  out.push_str(&start_tag(root.value()));
  out.push('\n');
  match child_element(root, "head") {
    Some(head) => serialize(head, &mut out),
    None => out.push_str("<head></head>"),
  }
  out.push_str("\n<body>\n");
  out.push_str(&banner(meta));
  out.push('\n');
  out.push_str(body);
  out.push_str("\n</body>\n</html>\n");
  out
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn meta() -> DiffMeta<'static> {
    DiffMeta {
      page_id:     "home<script>",
      version_id:  "c2",
      parent_id:   "c1",
      recorded_at: Utc.with_ymd_and_hms(2021, 5, 6, 7, 8, 9).unwrap(),
    }
  }

  #[test]
  fn head_and_html_attributes_come_from_the_current_page() {
    let current = r#"<html lang="en" class="govuk"><head><title>Now</title><script src="a.js"></script></head><body><p>x</p></body></html>"#;
    let out = assemble(current, &meta(), "<p>diff</p>");

    assert!(out.starts_with("<!DOCTYPE html>\n<html class=\"govuk\" lang=\"en\">\n<head><title>Now</title><script src=\"a.js\"></script></head>\n<body>\n"));
    assert!(out.ends_with("<p>diff</p>\n</body>\n</html>\n"));
    assert!(!out.contains("<p>x</p>"));
  }

  #[test]
  fn banner_is_escaped() {
    let out = assemble("<p>x</p>", &meta(), "");
    assert!(out.contains("<strong>home&lt;script&gt;</strong>"));
    assert!(out.contains("<code>c1</code>"));
    assert!(out.contains(r#"<time datetime="2021-05-06T07:08:09Z">2021-05-06T07:08:09Z</time>"#));
  }

  #[test]
  fn root_versions_have_no_meta() {
    let v = Version {
      page_id:     "home".into(),
      version_id:  "c1".into(),
      parent_id:   None,
      recorded_at: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
    };
    assert!(DiffMeta::for_version(&v).is_none());
  }
}
