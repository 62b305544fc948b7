// File: src/core/normalize.rs
//! Text cleanup for sense strings and reverse-lookup keys.

/// A sense with its parenthetical qualifiers pulled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanSense {
    pub core: String,
    /// Contents of each top-level `( ... )` group, in order.
    pub contexts: Vec<String>,
}

impl CleanSense {
    /// Qualifiers joined for display, `None` when there are none.
    pub fn context_label(&self) -> Option<String> {
        if self.contexts.is_empty() {
            None
        } else {
            Some(self.contexts.join(", "))
        }
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_punctuation(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '.' | '-' | '–' | '—'))
}

/// Drops list numbering like `1.` or `2)` at the start of a sense.
fn strip_numbering(text: &str) -> &str {
    let trimmed = text.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return trimmed;
    }
    let rest = &trimmed[digits..];
    match rest.chars().next() {
        Some('.') | Some(')') => rest[1..].trim_start(),
        _ => trimmed,
    }
}

/// Splits a sense into core text and parenthetical context markers.
///
/// Returns `None` when nothing but qualifiers or punctuation is left.
pub fn clean_sense(raw: &str) -> Option<CleanSense> {
    let mut core = String::with_capacity(raw.len());
    let mut contexts = Vec::new();
    let mut group = String::new();
    let mut depth = 0usize;

    for c in strip_numbering(raw).chars() {
        match c {
            '(' => {
                if depth > 0 {
                    group.push(c);
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let label = collapse_whitespace(&group);
                    if !label.is_empty() {
                        contexts.push(label);
                    }
                    group.clear();
                    core.push(' ');
                } else {
                    group.push(c);
                }
            }
            _ if depth > 0 => group.push(c),
            _ => core.push(c),
        }
    }
    // An unclosed group is treated as context.
    let dangling = collapse_whitespace(&group);
    if !dangling.is_empty() {
        contexts.push(dangling);
    }

    let core = collapse_whitespace(&core).replace(" ,", ",").replace(" ;", ";");
    let core = trim_punctuation(&core).to_string();
    if core.is_empty() {
        return None;
    }
    Some(CleanSense { core, contexts })
}

/// Lower-cased leading token run of `core` up to the first comma, semicolon
/// or parenthesis. `None` for non-alphabetic or single-char results.
pub fn derive_target_word(core: &str) -> Option<String> {
    let head = core
        .split(|c: char| matches!(c, ',' | ';' | '(' | '/'))
        .next()
        .unwrap_or("");
    let head = collapse_whitespace(head).to_lowercase();

    if head.chars().count() < 2 {
        return None;
    }
    let starts_alpha = head.chars().next().is_some_and(char::is_alphabetic);
    let all_word_chars = head
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\''));
    if starts_alpha && all_word_chars {
        Some(head)
    } else {
        None
    }
}

/// True when every char is a letter.
pub fn is_purely_alphabetic(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_alphabetic)
}
