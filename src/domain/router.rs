//! Routing fragments to output documents
//!
//! Routing is pure path arithmetic over the fragment path, its directive and
//! the configured discovery roots.

use serde::{Deserialize, Serialize};

use super::diagnostic::Diagnostic;
use super::directive::TargetSelector;
use super::fragment::{Fragment, FRAGMENT_DIR, FRAGMENT_SUFFIX};
use super::relpath;

/// File name of every generated document
pub const OUTPUT_FILE: &str = "AGENTS.md";

/// Routing policy for fragments without an explicit target
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DefaultTarget {
    #[default]
    Nearest,
    Root,
}

/// The output chosen for a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub output: String,
    pub diagnostic: Option<Diagnostic>,
}

/// Assigns fragments to outputs
#[derive(Debug, Clone)]
pub struct Router {
    /// Discovery roots, deepest first
    roots: Vec<String>,
    default_target: DefaultTarget,
}

impl Router {
    /// Creates a router for the given include globs
    pub fn new(include: &[String], default_target: DefaultTarget) -> Self {
        let mut roots: Vec<String> = include.iter().map(|g| glob_root(g)).collect();
        roots.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        roots.dedup();

        Self {
            roots,
            default_target,
        }
    }

    /// Discovery roots, deepest first
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Picks the output for a fragment.
    ///
    /// Order: explicit path, `root`, `nearest`, configured default.
    pub fn route(&self, fragment: &Fragment) -> Route {
        match &fragment.directive.target {
            Some(TargetSelector::Path(target)) => self.explicit(fragment, target),
            Some(TargetSelector::Root) => Route {
                output: OUTPUT_FILE.to_string(),
                diagnostic: None,
            },
            Some(TargetSelector::Nearest) => Route {
                output: self.nearest(&fragment.path),
                diagnostic: None,
            },
            None => Route {
                output: self.default_output(&fragment.path),
                diagnostic: None,
            },
        }
    }

    fn default_output(&self, path: &str) -> String {
        match self.default_target {
            DefaultTarget::Root => OUTPUT_FILE.to_string(),
            DefaultTarget::Nearest => self.nearest(path),
        }
    }

    fn explicit(&self, fragment: &Fragment, target: &str) -> Route {
        let resolved = match target.strip_prefix('/') {
            Some(from_root) => relpath::normalize(from_root),
            None => relpath::join(fragment.dir(), target),
        };

        if relpath::escapes_root(&resolved) {
            return Route {
                output: self.default_output(&fragment.path),
                diagnostic: Some(Diagnostic::TargetOutsideRoot {
                    fragment: fragment.path.clone(),
                    target: target.to_string(),
                }),
            };
        }

        let output = if resolved.to_ascii_lowercase().ends_with(".md") {
            resolved
        } else {
            output_in(&resolved)
        };
        Route {
            output,
            diagnostic: None,
        }
    }

    /// Output closest to a fragment.
    ///
    /// `*.agents.md` files land beside themselves, files in an `agents-md/`
    /// folder land beside that folder, anything else lands in the deepest
    /// discovery root containing it.
    pub fn nearest(&self, path: &str) -> String {
        let dir = relpath::parent(path);

        if relpath::file_name(path).ends_with(FRAGMENT_SUFFIX) {
            return output_in(dir);
        }

        let segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
        if let Some(pos) = segments.iter().rposition(|s| *s == FRAGMENT_DIR) {
            return output_in(&segments[..pos].join("/"));
        }

        let root = self
            .roots
            .iter()
            .find(|r| relpath::is_within(dir, r))
            .map(String::as_str)
            .unwrap_or("");
        output_in(root)
    }
}

/// Path of the output document inside a directory
pub fn output_in(dir: &str) -> String {
    relpath::join(dir, OUTPUT_FILE)
}

/// Literal directory prefix of a glob (`docs/**/*.md` -> `docs`)
pub fn glob_root(pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<&str> = segments
        .iter()
        .take(segments.len().saturating_sub(1))
        .take_while(|s| !s.contains(['*', '?', '[', '{']))
        .copied()
        .collect();
    relpath::normalize(&literal.join("/"))
}
