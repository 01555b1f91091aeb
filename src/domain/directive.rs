//! Directive comments embedded in fragments
//!
//! A fragment may carry one control comment of the form
//! `<!-- agents-md: key=value, key="quoted value" -->`. Only the first
//! comment is honored; every directive comment is stripped from the body.
//! Comments inside fenced code blocks are left alone.

use std::fmt;
use std::ops::Range;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";
const KEYWORD: &str = "agents-md:";

/// Where a fragment asks to be composed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    /// The output closest to the fragment
    Nearest,
    /// The top-level `AGENTS.md`
    Root,
    /// Explicit directory or file, relative to the fragment
    Path(String),
}

impl TargetSelector {
    fn from_value(value: &str) -> Option<Self> {
        match value.trim() {
            "" => None,
            "nearest" => Some(TargetSelector::Nearest),
            "root" => Some(TargetSelector::Root),
            other => Some(TargetSelector::Path(other.to_string())),
        }
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSelector::Nearest => write!(f, "nearest"),
            TargetSelector::Root => write!(f, "root"),
            TargetSelector::Path(path) => write!(f, "{}", path),
        }
    }
}

/// A single `import=` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    /// Reference as written (`@` prefix means relative to the importer)
    pub path: String,
    /// 1-based line of the directive comment
    pub line: usize,
}

/// A value that could not be interpreted for its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedValue {
    pub key: String,
    pub value: String,
}

/// Parsed control metadata of a fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directive {
    pub target: Option<TargetSelector>,
    pub imports: Vec<ImportRef>,
    /// Lower weights sort first
    pub weight: Option<i64>,
    pub title: Option<String>,
    /// 1-based line of the honored comment, if any
    pub line: Option<usize>,
    pub rejected: Vec<RejectedValue>,
}

impl Directive {
    /// True if the fragment carried no usable metadata
    pub fn is_empty(&self) -> bool {
        self.target.is_none()
            && self.imports.is_empty()
            && self.weight.is_none()
            && self.title.is_none()
    }
}

/// Location of one directive comment in the source text
#[derive(Debug, Clone)]
struct CommentSpan {
    /// Whole comment, delimiters included
    outer: Range<usize>,
    /// Text between `agents-md:` and `-->`
    inner: Range<usize>,
}

/// Parses the first directive comment of a fragment
pub fn parse_directive(markdown: &str) -> Directive {
    match scan(markdown).first() {
        Some(span) => parse_span(markdown, span),
        None => Directive::default(),
    }
}

/// Removes every directive comment and trims the result
pub fn strip_directives(markdown: &str) -> String {
    split_fragment(markdown).1
}

/// Parses the directive and strips the body in a single scan.
///
/// Also returns the byte offset in the stripped body where the honored
/// comment stood, so imports can be inlined at that position.
pub(crate) fn split_fragment(markdown: &str) -> (Directive, String, Option<usize>) {
    let spans = scan(markdown);
    let directive = spans
        .first()
        .map(|span| parse_span(markdown, span))
        .unwrap_or_default();

    let mut stripped = String::with_capacity(markdown.len());
    let mut anchor = None;
    let mut cursor = 0;
    for span in &spans {
        stripped.push_str(&markdown[cursor..span.outer.start]);
        if anchor.is_none() {
            anchor = Some(stripped.len());
        }
        cursor = span.outer.end;
    }
    stripped.push_str(&markdown[cursor..]);

    let leading = stripped.len() - stripped.trim_start().len();
    let body = stripped.trim().to_string();
    let anchor = anchor.map(|a| a.saturating_sub(leading).min(body.len()));

    (directive, body, anchor)
}

/// Finds directive comments outside fenced code blocks, in order
fn scan(markdown: &str) -> Vec<CommentSpan> {
    let fences = fenced_ranges(markdown);
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(found) = markdown[pos..].find(COMMENT_OPEN) {
        let start = pos + found;

        if let Some(fence) = fences.iter().find(|r| r.contains(&start)) {
            pos = fence.end;
            continue;
        }

        let after_open = start + COMMENT_OPEN.len();
        let rest = &markdown[after_open..];
        let keyword_at = after_open + (rest.len() - rest.trim_start().len());
        if !markdown[keyword_at..].starts_with(KEYWORD) {
            pos = after_open;
            continue;
        }

        let inner_start = keyword_at + KEYWORD.len();
        let Some(close) = markdown[inner_start..].find(COMMENT_CLOSE) else {
            // unterminated comment
            break;
        };
        let inner_end = inner_start + close;
        let end = inner_end + COMMENT_CLOSE.len();

        spans.push(CommentSpan {
            outer: start..end,
            inner: inner_start..inner_end,
        });
        pos = end;
    }

    spans
}

/// Byte ranges covered by ``` or ~~~ fenced blocks (unclosed fences run to the end)
fn fenced_ranges(markdown: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<(usize, &str)> = None;
    let mut offset = 0;

    for line in markdown.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let marker = if trimmed.starts_with("```") {
            Some("```")
        } else if trimmed.starts_with("~~~") {
            Some("~~~")
        } else {
            None
        };

        match (open, marker) {
            (None, Some(m)) => open = Some((offset, m)),
            (Some((start, m)), Some(found)) if m == found => {
                ranges.push(start..offset + line.len());
                open = None;
            }
            _ => {}
        }
        offset += line.len();
    }

    if let Some((start, _)) = open {
        ranges.push(start..markdown.len());
    }
    ranges
}

fn parse_span(markdown: &str, span: &CommentSpan) -> Directive {
    let line = markdown[..span.outer.start].matches('\n').count() + 1;
    let mut directive = Directive {
        line: Some(line),
        ..Directive::default()
    };

    for (key, value) in parse_pairs(&markdown[span.inner.clone()]) {
        match key.as_str() {
            "target" => directive.target = TargetSelector::from_value(&value),
            "import" => directive.imports.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| ImportRef {
                        path: p.to_string(),
                        line,
                    }),
            ),
            "weight" | "priority" => match value.trim().parse::<i64>() {
                Ok(weight) => directive.weight = Some(weight),
                Err(_) => directive.rejected.push(RejectedValue { key, value }),
            },
            "title" => directive.title = Some(value),
            _ => {}
        }
    }

    directive
}

/// Splits `key=value, key="quoted, value"` into pairs.
///
/// Segments without `=` are skipped up to the next comma.
fn parse_pairs(body: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = body;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let key_len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(rest.len());
        let key = &rest[..key_len];
        let after_key = rest[key_len..].trim_start();

        if key.is_empty() || !after_key.starts_with('=') {
            rest = skip_segment(rest);
            continue;
        }

        let value_src = after_key[1..].trim_start();
        let (value, remainder) = if let Some(quoted) = value_src.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            }
        } else {
            let end = value_src
                .find(|c: char| c == ',' || c.is_whitespace())
                .unwrap_or(value_src.len());
            (&value_src[..end], &value_src[end..])
        };

        pairs.push((key.to_string(), value.to_string()));
        rest = remainder;
    }

    pairs
}

/// Drops everything up to and including the next comma (at least one char)
fn skip_segment(s: &str) -> &str {
    match s.find(',') {
        Some(idx) => &s[idx + 1..],
        None => {
            let first = s.chars().next().map(char::len_utf8).unwrap_or(0);
            let rest = &s[first..];
            match rest.find(char::is_whitespace) {
                Some(idx) => &rest[idx..],
                None => "",
            }
        }
    }
}
