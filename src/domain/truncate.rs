//! Character-budget truncation
//!
//! Budgets count Unicode scalar values, not bytes.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Replaces the excised part of a middle-truncated text
pub const ELISION_MARKER: &str = "\n\n[... truncated ...]\n\n";

/// How over-budget text is cut
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TruncateStrategy {
    /// Drop everything past the budget
    #[default]
    End,
    /// Keep a head and a tail around [`ELISION_MARKER`]
    Middle,
}

/// What the budget applies to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TruncateScope {
    /// Each fragment body separately
    #[default]
    Source,
    /// The whole generated document
    Output,
}

/// Truncation settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Truncation {
    #[serde(alias = "atChars")]
    pub at_chars: usize,

    #[serde(default)]
    pub strategy: TruncateStrategy,

    #[serde(default)]
    pub scope: TruncateScope,
}

impl Truncation {
    /// Applies the budget to a text
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        truncate(text, self.at_chars, self.strategy)
    }
}

/// Cuts `text` down to `at_chars` characters.
///
/// Texts within budget are returned unchanged. `Middle` falls back to `End`
/// when the budget cannot hold the elision marker.
pub fn truncate(text: &str, at_chars: usize, strategy: TruncateStrategy) -> Cow<'_, str> {
    let total = text.chars().count();
    if total <= at_chars {
        return Cow::Borrowed(text);
    }

    let marker_len = ELISION_MARKER.chars().count();
    match strategy {
        TruncateStrategy::Middle if at_chars > marker_len => {
            let keep = at_chars - marker_len;
            let head = keep - keep / 2;
            let tail = keep / 2;
            let head_end = byte_offset(text, head);
            let tail_start = byte_offset(text, total - tail);
            Cow::Owned(format!(
                "{}{}{}",
                &text[..head_end],
                ELISION_MARKER,
                &text[tail_start..]
            ))
        }
        _ => Cow::Owned(text[..byte_offset(text, at_chars)].to_string()),
    }
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
