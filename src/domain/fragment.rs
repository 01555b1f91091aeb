//! Fragment records
//!
//! A fragment is one discovered source document. It is parsed once per
//! compose run and never mutated afterwards.

use super::diagnostic::Diagnostic;
use super::directive::{split_fragment, Directive};
use super::relpath;

/// File name suffix of colocated fragments (`api.agents.md`)
pub const FRAGMENT_SUFFIX: &str = ".agents.md";

/// Folder name whose markdown files are fragments of the enclosing directory
pub const FRAGMENT_DIR: &str = "agents-md";

/// One source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Project-relative path, forward-slash separated
    pub path: String,

    /// Content as read from disk
    pub raw: String,

    /// Parsed control comment (may be empty)
    pub directive: Directive,

    /// Content with directive comments removed, trimmed
    pub body: String,

    /// Position in discovery order
    pub order: usize,

    /// Byte offset in `body` where the directive stood
    anchor: Option<usize>,
}

impl Fragment {
    /// Parses raw content into a fragment
    pub fn parse(path: impl Into<String>, raw: impl Into<String>, order: usize) -> Self {
        let path = path.into();
        let raw = raw.into();
        let (directive, body, anchor) = split_fragment(&raw);

        Self {
            path,
            raw,
            directive,
            body,
            order,
            anchor,
        }
    }

    /// Directory containing the fragment (`""` at the root)
    pub fn dir(&self) -> &str {
        relpath::parent(&self.path)
    }

    /// Body text before and after the directive comment.
    ///
    /// Imports are inlined between the two halves. Fragments without a
    /// directive put their whole body in the second half.
    pub fn split_body(&self) -> (&str, &str) {
        Self::split_text(&self.body, self.anchor)
    }

    /// Splits a (possibly truncated) copy of the body at the directive anchor
    pub fn split_text(text: &str, anchor: Option<usize>) -> (&str, &str) {
        let Some(mut at) = anchor else {
            return ("", text);
        };
        at = at.min(text.len());
        while !text.is_char_boundary(at) {
            at -= 1;
        }
        (text[..at].trim_end(), text[at..].trim_start())
    }

    /// Byte offset of the directive in the body
    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    /// Diagnostics for directive values that could not be interpreted
    pub fn value_diagnostics(&self) -> Vec<Diagnostic> {
        let line = self.directive.line.unwrap_or(1);
        self.directive
            .rejected
            .iter()
            .map(|r| Diagnostic::InvalidValue {
                fragment: self.path.clone(),
                key: r.key.clone(),
                value: r.value.clone(),
                line,
            })
            .collect()
    }
}
