//! Fixed cleaning policy applied to both documents before diffing.
//!
//! Active and embedded content goes; document structure, `meta`, inline
//! styles and links stay.

use lol_html::{RewriteStrSettings, doc_comments, element, rewrite_str};

use crate::Result;

/// Removed together with everything inside them.
const DROPPED: &str =
  "script, style, object, embed, applet, param, iframe, frame, frameset, noscript";

/// Attributes whose value is a URL that could run script.
const URL_ATTRS: [&str; 3] = ["href", "src", "action"];

pub fn sanitize(html: &str) -> Result<String> {
  let cleaned = rewrite_str(html, RewriteStrSettings {
    element_content_handlers: vec![
      element!(DROPPED, |el| {
        el.remove();
        Ok(())
      }),
      element!("link[rel]", |el| {
        let rel = el.get_attribute("rel").unwrap_or_default();
        if rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")) {
          el.remove();
        }
        Ok(())
      }),
      element!("*", |el| {
        let doomed: Vec<String> = el
          .attributes()
          .iter()
          .map(|a| (a.name(), a.value()))
          .filter(|(name, value)| {
            name.starts_with("on") || (URL_ATTRS.contains(&name.as_str()) && is_script_url(value))
          })
          .map(|(name, _)| name)
          .collect();
        for name in doomed {
          el.remove_attribute(&name);
        }
        Ok(())
      }),
      element!("a[href]", |el| {
        el.set_attribute("rel", "nofollow")?;
        Ok(())
      }),
    ],
    document_content_handlers: vec![doc_comments!(|c| {
      c.remove();
      Ok(())
    })],
    ..RewriteStrSettings::default()
  })?;
  Ok(cleaned)
}

fn is_script_url(value: &str) -> bool {
  let compact: String = value
    .chars()
    .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
    .take("javascript:".len())
    .collect();
  compact.eq_ignore_ascii_case("javascript:")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn active_content_and_comments_are_removed() {
    let html = r#"<html><head><script>x()</script><style>p{}</style>
      <link rel="Stylesheet" href="a.css"><link rel="icon" href="i.png"></head>
      <body><!-- note --><p>kept</p><iframe src="e"></iframe><noscript>js off</noscript>
      <object><param name="a"></object></body></html>"#;
    let out = sanitize(html).unwrap();
    for gone in ["<script", "x()", "<style", "a.css", "<!--", "note", "<iframe", "js off", "<object", "<param"] {
      assert!(!out.contains(gone), "{gone} survived in {out}");
    }
    assert!(out.contains("<p>kept</p>"));
    assert!(out.contains(r#"<link rel="icon" href="i.png">"#));
  }

  #[test]
  fn event_handlers_and_script_urls_are_stripped() {
    let html = r#"<a href="JavaScript:alert(1)" onclick="go()">x</a><img src="a.png" onerror="y()">"#;
    let out = sanitize(html).unwrap();
    assert!(!out.contains("onclick"));
    assert!(!out.contains("onerror"));
    assert!(!out.to_ascii_lowercase().contains("javascript"));
    assert!(out.contains(r#"<img src="a.png">"#));
  }

  #[test]
  fn links_get_nofollow_and_meta_is_kept() {
    let html = r#"<meta charset="utf-8"><a href="/x">x</a><a name="top">t</a>"#;
    let out = sanitize(html).unwrap();
    assert!(out.contains(r#"<a href="/x" rel="nofollow">x</a>"#));
    assert!(out.contains(r#"<a name="top">t</a>"#));
    assert!(out.contains(r#"<meta charset="utf-8">"#));
  }
}
