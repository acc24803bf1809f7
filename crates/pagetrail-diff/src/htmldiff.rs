//! Word-level diff of two token streams.
//!
//! Unchanged tokens come from the current document. Inserted words are
//! wrapped in `<ins>` and deleted words in `<del>`. Inserted tags are kept
//! and deleted tags dropped, so the tag structure of the output is exactly
//! that of the current document.

use similar::{Algorithm, DiffOp, capture_diff_slices};

use crate::markup::Token;

pub fn diff_tokens(old: &[Token], new: &[Token]) -> String {
  let old_keys: Vec<&str> = old.iter().map(Token::key).collect();
  let new_keys: Vec<&str> = new.iter().map(Token::key).collect();

  let mut out = Emitter::default();
  for op in capture_diff_slices(Algorithm::Myers, &old_keys, &new_keys) {
    match op {
      DiffOp::Equal { new_index, len, .. } => out.plain(&new[new_index..new_index + len]),
      DiffOp::Delete { old_index, old_len, .. } => {
        out.marked(Mark::Del, &old[old_index..old_index + old_len]);
      }
      DiffOp::Insert { new_index, new_len, .. } => {
        out.marked(Mark::Ins, &new[new_index..new_index + new_len]);
      }
      DiffOp::Replace { old_index, old_len, new_index, new_len } => {
        out.marked(Mark::Del, &old[old_index..old_index + old_len]);
        out.marked(Mark::Ins, &new[new_index..new_index + new_len]);
      }
    }
  }
  out.html
}

#[derive(Clone, Copy)]
enum Mark {
  Ins,
  Del,
}

impl Mark {
  fn tag(self) -> &'static str {
    match self {
      Self::Ins => "ins",
      Self::Del => "del",
    }
  }
}

#[derive(Default)]
struct Emitter {
  html: String,
  /// Text of the open `<ins>`/`<del>` run.
  run:  String,
  /// A `</del>` was just written with no whitespace after it.
  gap:  bool,
}

impl Emitter {
  fn plain(&mut self, tokens: &[Token]) {
    for t in tokens {
      match t {
        Token::Href(_) => {}
        Token::Text(text) => {
          if self.gap && !text.starts_with(char::is_whitespace) {
            self.html.push(' ');
          }
          self.write(text);
        }
        tag => self.write(tag.as_str()),
      }
    }
  }

  fn marked(&mut self, mark: Mark, tokens: &[Token]) {
    for t in tokens {
      match t {
        Token::Text(text) => self.run.push_str(text),
        Token::Href(link) => {
          self.flush(mark);
          if !self.html.is_empty() && !self.html.ends_with(char::is_whitespace) {
            self.write(" ");
          }
          self.run.push_str(link);
          self.flush(mark);
        }
        tag => {
          self.flush(mark);
          if let Mark::Ins = mark {
            self.write(tag.as_str());
          }
        }
      }
    }
    self.flush(mark);
  }

  fn write(&mut self, s: &str) {
    self.html.push_str(s);
    self.gap = false;
  }

  /// Close the current run. Whitespace-only runs are not marked: inserted
  /// whitespace is written as is, deleted whitespace is dropped.
  fn flush(&mut self, mark: Mark) {
    if self.run.is_empty() {
      return;
    }
    let run = std::mem::take(&mut self.run);
    if run.trim().is_empty() {
      if let Mark::Ins = mark {
        self.write(&run);
      }
      return;
    }
    let words = run.trim_end();
    let trailing = &run[words.len()..];
    match mark {
      Mark::Ins => {
        if self.gap {
          self.html.push(' ');
        }
        self.write(&format!("<ins>{words}</ins>{trailing}"));
      }
      Mark::Del => {
        // The word before may have lost its separator to the deletion.
        let joined = self.html.ends_with(|c: char| !c.is_whitespace() && c != '>');
        if joined {
          self.html.push(' ');
        }
        self.write(&format!("<del>{words}</del>"));
        if trailing.is_empty() {
          self.gap = true;
        } else {
          self.write(" ");
        }
      }
    }
  }
}
