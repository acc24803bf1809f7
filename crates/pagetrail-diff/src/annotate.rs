//! Presentation tweaks applied to the diff body.

use lol_html::{RewriteStrSettings, element, rewrite_str};

use crate::Result;

pub const INS_STYLE: &str = "background-color: #e6ffee; text-decoration: none";
pub const DEL_STYLE: &str = "background-color: #fdb8c0; text-decoration: none";

/// Style `ins`/`del` and make every link inert.
pub fn annotate(diff: &str) -> Result<String> {
  let annotated = rewrite_str(diff, RewriteStrSettings {
    element_content_handlers: vec![
      element!("ins", |el| {
        el.set_attribute("style", INS_STYLE)?;
        Ok(())
      }),
      element!("del", |el| {
        el.set_attribute("style", DEL_STYLE)?;
        Ok(())
      }),
      element!("a", |el| {
        el.set_attribute("onclick", "return false;")?;
        Ok(())
      }),
    ],
    ..RewriteStrSettings::default()
  })?;
  Ok(annotated)
}
