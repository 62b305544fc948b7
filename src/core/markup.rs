// File: src/core/markup.rs
//! Tokenizing parser for gloss markup.
//!
//! Source glosses are lightly tagged HTML in the StarDict/Wiktionary style:
//!
//! ```text
//! <i>adj</i><ol><li>cold (low temperature)</li><li>(figuratively) unfriendly</li></ol>
//! <i>noun</i><ol><li>cold, chill</li></ol>
//! ```
//!
//! Parsing stops at a typed `[GlossSection { pos, senses }]` form. Context
//! extraction and scoring happen later, on plain sense strings.

use crate::core::types::PartOfSpeech;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open(String),
    Close(String),
    /// `<br>`, `<br/>`, `<hr>` and friends.
    Break,
    Text(String),
}

/// A part-of-speech section and its ordered sense strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossSection {
    pub pos: Option<PartOfSpeech>,
    pub senses: Vec<String>,
}

fn tokenize(markup: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut rest = markup;

    while let Some(lt) = rest.find('<') {
        text.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];
        let Some(gt) = after.find('>') else {
            // Unterminated tag: the remainder is literal text.
            text.push_str(&rest[lt..]);
            rest = "";
            break;
        };
        let inner = after[..gt].trim();
        rest = &after[gt + 1..];

        if !text.is_empty() {
            tokens.push(Token::Text(decode_entities(&text)));
            text.clear();
        }

        let closing = inner.starts_with('/');
        let name: String = inner
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        if name == "br" || name == "hr" {
            tokens.push(Token::Break);
        } else if closing {
            tokens.push(Token::Close(name));
        } else if inner.ends_with('/') {
            // Self-closing non-break tags carry no text.
        } else {
            tokens.push(Token::Open(name));
        }
    }
    text.push_str(rest);
    if !text.is_empty() {
        tokens.push(Token::Text(decode_entities(&text)));
    }
    tokens
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Removes `[...]` pronunciation/etymology brackets.
fn strip_brackets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[derive(Default)]
struct SectionBuilder {
    pos: Option<PartOfSpeech>,
    senses: Vec<String>,
    /// Text seen outside any list item; split on `;` when the section closes.
    loose: String,
    /// Italic usage label ("fig.", "informal") waiting for the sense it qualifies.
    pending_label: Option<String>,
}

impl SectionBuilder {
    fn push_sense(&mut self, raw: &str) {
        let cleaned = strip_brackets(raw);
        if !cleaned.trim().is_empty() {
            self.senses.push(cleaned.trim().to_string());
        }
    }

    /// Text the next sense starts with: the pending label as a parenthetical.
    fn take_label_prefix(&mut self) -> String {
        self.pending_label
            .take()
            .map(|label| format!("({}) ", label))
            .unwrap_or_default()
    }

    fn flush_loose(&mut self) {
        let loose = std::mem::take(&mut self.loose);
        for piece in loose.split(';') {
            self.push_sense(piece);
        }
    }

    fn finish(mut self) -> Option<GlossSection> {
        self.flush_loose();
        if self.senses.is_empty() {
            None
        } else {
            Some(GlossSection { pos: self.pos, senses: self.senses })
        }
    }
}

/// Splits gloss markup into part-of-speech sections of ordered senses.
///
/// An italic run outside a list item is a section heading when it names a
/// part of speech; any other italic label becomes a parenthetical context of
/// the sense that follows it. Bold runs outside list items echo the headword
/// and are dropped. Each `<li>` is one sense;
/// nested items become senses of their own, after the text of their parent.
pub fn parse_gloss(markup: &str) -> Vec<GlossSection> {
    let mut sections = Vec::new();
    let mut current = SectionBuilder::default();
    let mut item: Option<String> = None;
    let mut heading: Option<String> = None;
    let mut bold_depth = 0usize;

    for token in tokenize(markup) {
        match token {
            Token::Open(tag) => match tag.as_str() {
                "li" => {
                    if let Some(parent) = item.take() {
                        current.push_sense(&parent);
                    }
                    current.flush_loose();
                    item = Some(current.take_label_prefix());
                }
                "i" | "em" if item.is_none() => heading = Some(String::new()),
                "b" | "strong" if item.is_none() => bold_depth += 1,
                _ => {}
            },
            Token::Close(tag) => match tag.as_str() {
                "li" => {
                    if let Some(text) = item.take() {
                        current.push_sense(&text);
                    }
                }
                "i" | "em" if heading.is_some() => {
                    let label = heading.take().unwrap_or_default();
                    if let Some(pos) = PartOfSpeech::parse(&label) {
                        let previous = std::mem::take(&mut current);
                        if let Some(section) = previous.finish() {
                            sections.push(section);
                        }
                        current.pos = Some(pos);
                    } else if !label.trim().is_empty() {
                        current.pending_label = Some(label.trim().to_string());
                    }
                }
                "b" | "strong" if item.is_none() => bold_depth = bold_depth.saturating_sub(1),
                _ => {}
            },
            Token::Break => {
                if let Some(text) = item.as_mut() {
                    text.push(' ');
                } else {
                    current.loose.push(';');
                }
            }
            Token::Text(text) => {
                if let Some(label) = heading.as_mut() {
                    label.push_str(&text);
                } else if let Some(buf) = item.as_mut() {
                    buf.push_str(&text);
                } else if bold_depth == 0 {
                    if current.pending_label.is_some() && !text.trim().is_empty() {
                        let prefix = current.take_label_prefix();
                        current.loose.push_str(&prefix);
                        current.loose.push_str(text.trim_start());
                    } else {
                        current.loose.push_str(&text);
                    }
                }
            }
        }
    }

    if let Some(text) = item.take() {
        current.push_sense(&text);
    }
    if let Some(section) = current.finish() {
        sections.push(section);
    }
    sections
}
