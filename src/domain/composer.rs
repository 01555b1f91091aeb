//! Assembling fragments into output documents
//!
//! Every compose run is a full rebuild: fragments are routed, expanded
//! through their imports and rendered in a deterministic order.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::diagnostic::Diagnostic;
use super::fragment::Fragment;
use super::graph::{CycleLog, ImportGraph, Step};
use super::router::{Router, OUTPUT_FILE};
use super::truncate::{TruncateScope, Truncation};

/// Separator between rendered blocks
const BLOCK_SEPARATOR: &str = "\n\n";

/// One fragment merged into an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub path: String,
    /// Body characters contributed (titles, annotations and separators excluded)
    pub chars: usize,
}

/// Size accounting for one generated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub path: String,
    /// Characters of the final content
    pub chars: usize,
    /// Merged fragments, in merge order
    pub sources: Vec<SourceEntry>,
}

/// A generated document ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: String,
    pub content: String,
    pub sources: Vec<SourceEntry>,
}

impl Document {
    /// Size summary of this document
    pub fn to_output(&self) -> Output {
        Output {
            path: self.path.clone(),
            chars: self.content.chars().count(),
            sources: self.sources.clone(),
        }
    }

    /// True for the top-level `AGENTS.md`
    pub fn is_root(&self) -> bool {
        self.path == OUTPUT_FILE
    }
}

/// Rendering options
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Prefix each section with `<!-- source: path -->`
    pub annotate_sources: bool,
    pub truncate: Option<Truncation>,
}

/// Result of composing a fragment set
#[derive(Debug, Clone, Default)]
pub struct Composition {
    pub documents: Vec<Document>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Composes fragments into documents.
///
/// `fragments` must be in discovery order. Within an output, directly
/// routed fragments are ordered by weight (lower first, absent = 0), then
/// discovery order, then path. Imports are inlined where the importing
/// directive stood. The root output comes first, the rest sorted by path.
pub fn compose(fragments: &[Fragment], router: &Router, options: &ComposeOptions) -> Composition {
    let mut diagnostics: Vec<Diagnostic> = fragments
        .iter()
        .flat_map(Fragment::value_diagnostics)
        .collect();

    let graph = ImportGraph::build(fragments);
    diagnostics.extend(graph.diagnostics().iter().cloned());

    let mut routes = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let route = router.route(fragment);
        if let Some(diagnostic) = route.diagnostic {
            diagnostics.push(diagnostic);
        }
        routes.push(route.output);
    }

    let explicit: Vec<bool> = fragments
        .iter()
        .map(|f| f.directive.target.is_some())
        .collect();

    let mut grouped: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for root in graph.direct_roots(&explicit) {
        grouped.entry(routes[root].as_str()).or_default().push(root);
    }

    let mut ordered: Vec<(&str, Vec<usize>)> = grouped.into_iter().collect();
    ordered.sort_by_key(|(path, _)| *path != OUTPUT_FILE);

    let mut cycles = CycleLog::default();
    let mut documents = Vec::with_capacity(ordered.len());
    for (path, mut roots) in ordered {
        roots.sort_by(|&a, &b| {
            let (fa, fb) = (&fragments[a], &fragments[b]);
            fa.directive
                .weight
                .unwrap_or(0)
                .cmp(&fb.directive.weight.unwrap_or(0))
                .then_with(|| fa.order.cmp(&fb.order))
                .then_with(|| fa.path.cmp(&fb.path))
        });

        let mut resolved = HashSet::new();
        let mut steps = Vec::new();
        for root in roots {
            steps.extend(graph.expand(root, &mut resolved, &mut cycles));
        }

        documents.push(render(path, fragments, &steps, options));
    }
    diagnostics.extend(cycles.into_diagnostics());

    Composition {
        documents,
        diagnostics,
    }
}

/// Renders an expansion into document text
fn render(path: &str, fragments: &[Fragment], steps: &[Step], options: &ComposeOptions) -> Document {
    let source_budget = options
        .truncate
        .filter(|t| t.scope == TruncateScope::Source);
    let output_budget = options
        .truncate
        .filter(|t| t.scope == TruncateScope::Output);

    let mut blocks: Vec<String> = Vec::new();
    let mut tails: Vec<String> = Vec::new();
    let mut sources = Vec::new();

    for step in steps {
        match *step {
            Step::Enter(i) => {
                let fragment = &fragments[i];
                let body = match &source_budget {
                    Some(budget) => budget.apply(&fragment.body),
                    None => fragment.body.as_str().into(),
                };
                let (head, tail) = Fragment::split_text(&body, fragment.anchor());

                sources.push(SourceEntry {
                    path: fragment.path.clone(),
                    chars: head.chars().count() + tail.chars().count(),
                });

                if options.annotate_sources {
                    blocks.push(format!("<!-- source: {} -->", fragment.path));
                }
                if let Some(title) = fragment.directive.title.as_deref().map(str::trim) {
                    if !title.is_empty() {
                        blocks.push(format!("## {}", title));
                    }
                }
                if !head.is_empty() {
                    blocks.push(head.to_string());
                }
                tails.push(tail.to_string());
            }
            Step::Leave(_) => {
                if let Some(tail) = tails.pop() {
                    if !tail.is_empty() {
                        blocks.push(tail);
                    }
                }
            }
        }
    }

    let mut content = blocks.join(BLOCK_SEPARATOR);
    if !content.is_empty() {
        content.push('\n');
    }
    if let Some(budget) = output_budget {
        content = budget.apply(&content).into_owned();
    }

    Document {
        path: path.to_string(),
        content,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::router::DefaultTarget;
    use crate::domain::truncate::TruncateStrategy;

    fn fragments(entries: &[(&str, &str)]) -> Vec<Fragment> {
        entries
            .iter()
            .enumerate()
            .map(|(i, (path, raw))| Fragment::parse(*path, *raw, i))
            .collect()
    }

    fn router() -> Router {
        Router::new(
            &["**/agents-md/**/*.md".to_string(), "**/*.agents.md".to_string()],
            DefaultTarget::Nearest,
        )
    }

    fn compose_default(frags: &[Fragment]) -> Composition {
        compose(frags, &router(), &ComposeOptions::default())
    }

    #[test]
    fn single_fragment_to_root() {
        let frags = fragments(&[("a.agents.md", "Hello")]);
        let result = compose_default(&frags);
        assert_eq!(result.documents.len(), 1);
        let doc = &result.documents[0];
        assert_eq!(doc.path, "AGENTS.md");
        assert_eq!(doc.content, "Hello\n");
        assert_eq!(doc.to_output().chars, 6);
        assert_eq!(doc.sources, vec![SourceEntry { path: "a.agents.md".to_string(), chars: 5 }]);
    }

    #[test]
    fn weight_orders_ascending_then_discovery() {
        let frags = fragments(&[
            ("a.agents.md", "<!-- agents-md: weight=10 -->A"),
            ("b.agents.md", "B"),
            ("c.agents.md", "<!-- agents-md: weight=-1 -->C"),
            ("d.agents.md", "D"),
        ]);
        let doc = &compose_default(&frags).documents[0];
        assert_eq!(doc.content, "C\n\nB\n\nD\n\nA\n");
    }

    #[test]
    fn titles_render_as_headings() {
        let frags = fragments(&[
            ("a.agents.md", "<!-- agents-md: title=\"Code Style\" -->Use tabs."),
            ("b.agents.md", "Untitled"),
        ]);
        let doc = &compose_default(&frags).documents[0];
        assert_eq!(doc.content, "## Code Style\n\nUse tabs.\n\nUntitled\n");
        assert_eq!(doc.sources[0].chars, "Use tabs.".len());
    }

    #[test]
    fn imports_inline_at_directive_position() {
        let frags = fragments(&[
            ("a.agents.md", "Intro\n<!-- agents-md: import=@agents-md/shared.md -->\nOutro"),
            ("agents-md/shared.md", "<!-- agents-md: title=Shared -->Shared body"),
        ]);
        let doc = &compose_default(&frags).documents[0];
        assert_eq!(doc.content, "Intro\n\n## Shared\n\nShared body\n\nOutro\n");
        let paths: Vec<_> = doc.sources.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["a.agents.md", "agents-md/shared.md"]);
    }

    #[test]
    fn shared_import_counts_in_each_output() {
        let frags = fragments(&[
            ("a.agents.md", "<!-- agents-md: import=shared.agents.md -->A"),
            ("pkg/b.agents.md", "<!-- agents-md: import=shared.agents.md -->B"),
            ("shared.agents.md", "S"),
        ]);
        let result = compose_default(&frags);
        let paths: Vec<_> = result.documents.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["AGENTS.md", "pkg/AGENTS.md"]);
        for doc in &result.documents {
            assert!(doc.sources.iter().any(|s| s.path == "shared.agents.md"));
            assert!(doc.content.contains('S'));
        }
    }

    #[test]
    fn root_output_comes_first() {
        let frags = fragments(&[("a/x.agents.md", "X"), ("b.agents.md", "B")]);
        let result = compose_default(&frags);
        let paths: Vec<_> = result.documents.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["AGENTS.md", "a/AGENTS.md"]);
    }

    #[test]
    fn missing_import_is_a_diagnostic_and_composition_proceeds() {
        let frags = fragments(&[("a.agents.md", "<!-- agents-md: import=@missing.md -->A")]);
        let result = compose_default(&frags);
        assert_eq!(result.documents[0].content, "A\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].to_string().contains("missing import"));
    }

    #[test]
    fn annotate_sources_prefixes_sections() {
        let frags = fragments(&[("a.agents.md", "A")]);
        let options = ComposeOptions {
            annotate_sources: true,
            truncate: None,
        };
        let doc = &compose(&frags, &router(), &options).documents[0];
        assert_eq!(doc.content, "<!-- source: a.agents.md -->\n\nA\n");
        assert_eq!(doc.sources[0].chars, 1);
    }

    #[test]
    fn source_truncation_limits_each_body() {
        let frags = fragments(&[("a.agents.md", "abcdefghij"), ("b.agents.md", "xy")]);
        let options = ComposeOptions {
            annotate_sources: false,
            truncate: Some(Truncation {
                at_chars: 4,
                strategy: TruncateStrategy::End,
                scope: TruncateScope::Source,
            }),
        };
        let doc = &compose(&frags, &router(), &options).documents[0];
        assert_eq!(doc.content, "abcd\n\nxy\n");
        assert_eq!(doc.sources[0].chars, 4);
    }

    #[test]
    fn output_truncation_limits_document() {
        let a = "a".repeat(200);
        let b = "b".repeat(200);
        let frags = fragments(&[("a.agents.md", a.as_str()), ("b.agents.md", b.as_str())]);
        let options = ComposeOptions {
            annotate_sources: false,
            truncate: Some(Truncation {
                at_chars: 100,
                strategy: TruncateStrategy::Middle,
                scope: TruncateScope::Output,
            }),
        };
        let doc = &compose(&frags, &router(), &options).documents[0];
        assert_eq!(doc.to_output().chars, 100);
        assert!(doc.content.starts_with('a'));
        assert!(doc.content.trim_end().ends_with('b'));
    }

    #[test]
    fn cycle_shared_by_two_outputs_is_reported_once() {
        let frags = fragments(&[
            ("a.agents.md", "<!-- agents-md: target=root, import=b.agents.md -->A"),
            ("b.agents.md", "<!-- agents-md: import=a.agents.md -->B"),
            ("pkg/c.agents.md", "<!-- agents-md: import=b.agents.md -->C"),
        ]);
        let result = compose_default(&frags);

        let paths: Vec<&str> = result.documents.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["AGENTS.md", "pkg/AGENTS.md"]);
        let cycles: Vec<&Diagnostic> = result
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::ImportCycle { .. }))
            .collect();
        assert_eq!(cycles.len(), 1);
    }

    #[test]
    fn composing_twice_is_identical() {
        let frags = fragments(&[
            ("a.agents.md", "<!-- agents-md: import=\"b.agents.md, c.agents.md\" -->A"),
            ("b.agents.md", "<!-- agents-md: import=a.agents.md -->B"),
            ("c.agents.md", "C"),
            ("pkg/agents-md/x.md", "X"),
        ]);
        let first = compose_default(&frags);
        let second = compose_default(&frags);
        assert_eq!(first.documents, second.documents);
        assert_eq!(first.diagnostics, second.diagnostics);
    }
}
