//! Token stream and serialization over a parsed document.
//!
//! Attributes are always written sorted by name, so output depends only on
//! the input bytes and never on the parser's attribute storage order.

use scraper::{ElementRef, Html, Node, node::Element};

const VOID: [&str; 14] = [
  "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
  "track", "wbr",
];

/// Elements whose text content is written verbatim.
const RAW_TEXT: [&str; 7] = ["script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext"];

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
  Open(String),
  Close(String),
  Void(String),
  /// Escaped text: one word plus its trailing whitespace, or a run of
  /// leading whitespace.
  Text(String),
  /// `Link: <href>` after each `a[href]`; shown only when it changes.
  Href(String),
}

impl Token {
  /// What two tokens are compared by. Whitespace differences are ignored.
  pub fn key(&self) -> &str {
    match self {
      Self::Open(m) | Self::Close(m) | Self::Void(m) | Self::Href(m) => m,
      Self::Text(t) => match t.trim_end() {
        "" => " ",
        word => word,
      },
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Open(s) | Self::Close(s) | Self::Void(s) | Self::Text(s) | Self::Href(s) => s,
    }
  }

  pub fn is_text(&self) -> bool { matches!(self, Self::Text(_)) }
}

/// Tokens of the document's `<body>` contents.
pub fn body_tokens(html: &str) -> Vec<Token> {
  let doc = Html::parse_document(html);
  let mut tokens = Vec::new();
  if let Some(body) = child_element(doc.root_element(), "body") {
    push_children(body, &mut tokens);
  }
  tokens
}

fn push_children(parent: ElementRef<'_>, out: &mut Vec<Token>) {
  let raw = RAW_TEXT.contains(&parent.value().name());
  for child in parent.children() {
    match child.value() {
      Node::Text(text) if raw => out.push(Token::Text((**text).to_owned())),
      Node::Text(text) => push_words(&html_escape::encode_text(&**text), out),
      Node::Element(el) => {
        let Some(child) = ElementRef::wrap(child) else { continue };
        if is_void(el) {
          out.push(Token::Void(start_tag(el)));
        } else {
          out.push(Token::Open(start_tag(el)));
          push_children(child, out);
          out.push(Token::Close(end_tag(el)));
          if let Some(href) = el.attr("href").filter(|_| el.name() == "a") {
            out.push(Token::Href(format!("Link: {}", html_escape::encode_text(href))));
          }
        }
      }
      _ => {}
    }
  }
}

fn push_words(text: &str, out: &mut Vec<Token>) {
  let mut start = 0;
  let mut prev_space = false;
  for (i, c) in text.char_indices() {
    let space = c.is_whitespace();
    if !space && prev_space && i > start {
      out.push(Token::Text(text[start..i].to_owned()));
      start = i;
    }
    prev_space = space;
  }
  if start < text.len() {
    out.push(Token::Text(text[start..].to_owned()));
  }
}

// ─── Serialization ───────────────────────────────────────────────────────────

pub fn start_tag(el: &Element) -> String {
  let mut attrs: Vec<(&str, &str)> = el.attrs().collect();
  attrs.sort_unstable();

  let mut tag = format!("<{}", el.name());
  for (name, value) in attrs {
    tag.push(' ');
    tag.push_str(name);
    tag.push_str("=\"");
    tag.push_str(&html_escape::encode_double_quoted_attribute(value));
    tag.push('"');
  }
  tag.push('>');
  tag
}

pub fn end_tag(el: &Element) -> String { format!("</{}>", el.name()) }

fn is_void(el: &Element) -> bool { VOID.contains(&el.name()) }

/// Write `el` and its subtree as HTML. Comments are kept.
pub fn serialize(el: ElementRef<'_>, out: &mut String) {
  let value = el.value();
  out.push_str(&start_tag(value));
  if is_void(value) {
    return;
  }
  let raw = RAW_TEXT.contains(&value.name());
  for child in el.children() {
    match child.value() {
      Node::Text(text) if raw => out.push_str(text),
      Node::Text(text) => out.push_str(&html_escape::encode_text(&**text)),
      Node::Comment(comment) => {
        out.push_str("<!--");
        out.push_str(comment);
        out.push_str("-->");
      }
      Node::Element(_) => {
        if let Some(child) = ElementRef::wrap(child) {
          serialize(child, out);
        }
      }
      _ => {}
    }
  }
  out.push_str(&end_tag(value));
}

pub fn child_element<'a>(parent: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
  parent
    .children()
    .filter_map(ElementRef::wrap)
    .find(|el| el.value().name() == name)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn strs(tokens: &[Token]) -> Vec<&str> { tokens.iter().map(Token::as_str).collect() }

  #[test]
  fn body_becomes_tags_and_words() {
    let tokens = body_tokens("<p class=a id=b>Hello  big <b>world</b><br></p>");
    assert_eq!(strs(&tokens), [
      r#"<p class="a" id="b">"#,
      "Hello  ",
      "big ",
      "<b>",
      "world",
      "</b>",
      "<br>",
      "</p>",
    ]);
  }

  #[test]
  fn attributes_are_sorted_and_escaped() {
    let tokens = body_tokens(r#"<a title='say "hi"' href="/x?a=1&amp;b=2">1 &lt; 2</a>"#);
    assert_eq!(tokens[0].as_str(), r#"<a href="/x?a=1&amp;b=2" title="say &quot;hi&quot;">"#);
    assert_eq!(tokens[1].as_str(), "1 ");
    assert_eq!(tokens[2].as_str(), "&lt; ");
  }

  #[test]
  fn links_are_followed_by_their_target() {
    let tokens = body_tokens(r#"<p><a href="/rules?a&amp;b">rules</a> <a name="top">top</a></p>"#);
    assert_eq!(strs(&tokens), [
      "<p>",
      r#"<a href="/rules?a&amp;b">"#,
      "rules",
      "</a>",
      "Link: /rules?a&amp;b",
      " ",
      r#"<a name="top">"#,
      "top",
      "</a>",
      "</p>",
    ]);
    assert!(!tokens[4].is_text());
  }

  #[test]
  fn leading_whitespace_is_its_own_token() {
    let mut out = Vec::new();
    push_words("  two words", &mut out);
    assert_eq!(strs(&out), ["  ", "two ", "words"]);
    assert_eq!(out[0].key(), " ");
    assert_eq!(out[1].key(), "two");
  }

  #[test]
  fn serialize_keeps_raw_text_and_comments() {
    let doc = Html::parse_document(
      "<html><head><!--[if IE]>x<![endif]--><style>a > b {}</style><title>A &amp; B</title></head></html>",
    );
    let head = child_element(doc.root_element(), "head").unwrap();
    let mut out = String::new();
    serialize(head, &mut out);
    assert_eq!(
      out,
      "<head><!--[if IE]>x<![endif]--><style>a > b {}</style><title>A &amp; B</title></head>"
    );
  }
}
