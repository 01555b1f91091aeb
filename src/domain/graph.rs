//! Import graph between fragments
//!
//! Edges come from `import=` references in directives. Missing references
//! are reported once per (fragment, reference) pair when the graph is built.
//! Cycles are broken during expansion: an edge back onto the current path is
//! dropped and reported, the rest of the traversal continues.
//! Uses petgraph for storage and reachability.

use std::collections::HashMap;
use std::collections::HashSet;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;

use super::diagnostic::Diagnostic;
use super::fragment::Fragment;
use super::relpath;

/// Prefix marking a reference as relative to the importing fragment
pub const SELF_RELATIVE_PREFIX: char = '@';

/// An import edge as written in the importer's directive
#[derive(Debug, Clone)]
struct ImportEdge {
    reference: String,
    line: usize,
}

/// One event of a depth-first expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fragment section starts; its leading body follows
    Enter(usize),
    /// Fragment section ends; its trailing body follows
    Leave(usize),
}

/// Resolves an import reference to a project-relative path.
///
/// `@./x.md` and `@../x.md` are relative to the importer's directory;
/// anything else (with or without a leading `/`) is relative to the root.
pub fn resolve_reference(importer_dir: &str, reference: &str) -> String {
    match reference.strip_prefix(SELF_RELATIVE_PREFIX) {
        Some(rest) => relpath::join(importer_dir, rest),
        None => relpath::normalize(reference),
    }
}

/// Directed graph of fragment imports.
///
/// Node `i` is the fragment at index `i` of the slice the graph was built
/// from, so slice order doubles as discovery order.
#[derive(Debug, Default)]
pub struct ImportGraph {
    graph: DiGraph<usize, ImportEdge>,
    paths: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

/// Import cycles met during expansion.
///
/// A cycle is identified by its member set, so it is reported once per
/// compose run no matter which output or which side reaches it.
#[derive(Debug, Default)]
pub struct CycleLog {
    seen: HashSet<Vec<usize>>,
    diagnostics: Vec<Diagnostic>,
}

impl CycleLog {
    fn record(&mut self, mut members: Vec<usize>, diagnostic: Diagnostic) {
        members.sort_unstable();
        if self.seen.insert(members) {
            self.diagnostics.push(diagnostic);
        }
    }

    /// Cycle diagnostics, in discovery order of the cycles
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

struct Frame {
    node: usize,
    edges: Vec<(usize, ImportEdge)>,
    next: usize,
}

impl ImportGraph {
    /// Builds the graph, recording missing imports
    pub fn build(fragments: &[Fragment]) -> Self {
        let mut graph = DiGraph::new();
        let index: HashMap<&str, usize> = fragments
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path.as_str(), i))
            .collect();

        for i in 0..fragments.len() {
            graph.add_node(i);
        }

        let mut diagnostics = Vec::new();
        let mut reported: HashSet<(usize, &str)> = HashSet::new();

        for (i, fragment) in fragments.iter().enumerate() {
            for import in &fragment.directive.imports {
                let resolved = resolve_reference(fragment.dir(), &import.path);
                match index.get(resolved.as_str()) {
                    Some(&target) => {
                        graph.add_edge(
                            NodeIndex::new(i),
                            NodeIndex::new(target),
                            ImportEdge {
                                reference: import.path.clone(),
                                line: import.line,
                            },
                        );
                    }
                    None => {
                        if reported.insert((i, import.path.as_str())) {
                            diagnostics.push(Diagnostic::MissingImport {
                                fragment: fragment.path.clone(),
                                reference: import.path.clone(),
                                line: import.line,
                            });
                        }
                    }
                }
            }
        }

        Self {
            graph,
            paths: fragments.iter().map(|f| f.path.clone()).collect(),
            diagnostics,
        }
    }

    /// Diagnostics found while building (missing imports)
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of fragments in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph has no fragments
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Resolved imports of a fragment, in directive order
    pub fn imports_of(&self, node: usize) -> Vec<usize> {
        self.ordered_edges(node).into_iter().map(|(t, _)| t).collect()
    }

    /// True if some other fragment imports this one
    pub fn is_imported(&self, node: usize) -> bool {
        self.graph
            .neighbors_directed(NodeIndex::new(node), Direction::Incoming)
            .any(|n| n.index() != node)
    }

    /// Selects the fragments that are routed to an output on their own.
    ///
    /// A fragment is routed directly when `explicit[i]` is set (it names a
    /// target) or nobody else imports it. Fragments that remain unreachable
    /// (pure import cycles) are promoted in discovery order.
    pub fn direct_roots(&self, explicit: &[bool]) -> Vec<usize> {
        let n = self.len();
        let mut direct: Vec<bool> = (0..n)
            .map(|i| explicit.get(i).copied().unwrap_or(false) || !self.is_imported(i))
            .collect();
        let mut reached = vec![false; n];

        for i in 0..n {
            if direct[i] {
                self.mark_reachable(i, &mut reached);
            }
        }
        for i in 0..n {
            if !reached[i] {
                direct[i] = true;
                self.mark_reachable(i, &mut reached);
            }
        }

        (0..n).filter(|&i| direct[i]).collect()
    }

    fn mark_reachable(&self, start: usize, reached: &mut [bool]) {
        let mut dfs = Dfs::new(&self.graph, NodeIndex::new(start));
        while let Some(node) = dfs.next(&self.graph) {
            reached[node.index()] = true;
        }
    }

    /// Outgoing edges sorted by insertion, i.e. directive order
    fn ordered_edges(&self, node: usize) -> Vec<(usize, ImportEdge)> {
        let mut edges: Vec<_> = self.graph.edges(NodeIndex::new(node)).collect();
        edges.sort_by_key(|e| e.id());
        edges
            .into_iter()
            .map(|e| (e.target().index(), e.weight().clone()))
            .collect()
    }

    /// Expands `root` and its imports depth-first.
    ///
    /// `resolved` is shared by every root composed into the same output, so
    /// each fragment is inlined at most once per output. `cycles` is shared
    /// by the whole run.
    pub fn expand(
        &self,
        root: usize,
        resolved: &mut HashSet<usize>,
        cycles: &mut CycleLog,
    ) -> Vec<Step> {
        let mut steps = Vec::new();
        if !resolved.insert(root) {
            return steps;
        }

        let mut on_path: HashSet<usize> = HashSet::new();
        let mut stack = vec![self.frame(root)];
        on_path.insert(root);
        steps.push(Step::Enter(root));

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.edges.len() {
                let (target, edge) = frame.edges[frame.next].clone();
                let from = frame.node;
                frame.next += 1;

                if on_path.contains(&target) {
                    let start = stack.iter().position(|f| f.node == target).unwrap_or(0);
                    let members = stack[start..].iter().map(|f| f.node).collect();
                    cycles.record(
                        members,
                        Diagnostic::ImportCycle {
                            fragment: self.paths[from].clone(),
                            reference: edge.reference,
                            line: edge.line,
                        },
                    );
                    continue;
                }
                if !resolved.insert(target) {
                    continue;
                }

                on_path.insert(target);
                steps.push(Step::Enter(target));
                stack.push(self.frame(target));
            } else {
                let node = frame.node;
                stack.pop();
                on_path.remove(&node);
                steps.push(Step::Leave(node));
            }
        }

        steps
    }

    fn frame(&self, node: usize) -> Frame {
        Frame {
            node,
            edges: self.ordered_edges(node),
            next: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments(entries: &[(&str, &str)]) -> Vec<Fragment> {
        entries
            .iter()
            .enumerate()
            .map(|(i, (path, raw))| Fragment::parse(*path, *raw, i))
            .collect()
    }

    fn expand_all(graph: &ImportGraph, root: usize) -> (Vec<Step>, Vec<Diagnostic>) {
        let mut resolved = HashSet::new();
        let mut cycles = CycleLog::default();
        let steps = graph.expand(root, &mut resolved, &mut cycles);
        (steps, cycles.into_diagnostics())
    }

    #[test]
    fn resolve_self_relative_and_root_relative() {
        assert_eq!(resolve_reference("pkg/api", "@./rules.md"), "pkg/api/rules.md");
        assert_eq!(resolve_reference("pkg/api", "@rules.md"), "pkg/api/rules.md");
        assert_eq!(resolve_reference("pkg/api", "@../shared.md"), "pkg/shared.md");
        assert_eq!(resolve_reference("pkg/api", "docs/a.md"), "docs/a.md");
        assert_eq!(resolve_reference("pkg/api", "/docs/a.md"), "docs/a.md");
        assert_eq!(resolve_reference("", "@../x.md"), "../x.md");
    }

    #[test]
    fn nested_fixture_imports_resolve() {
        let frags = fragments(&[
            ("pkg/api/api.agents.md", "<!-- agents-md: import=\"@./agents-md/rules.md, @../shared.md, docs/style.md\" -->API"),
            ("pkg/api/agents-md/rules.md", "Rules"),
            ("pkg/shared.md", "Shared"),
            ("docs/style.md", "Style"),
        ]);
        let graph = ImportGraph::build(&frags);
        assert!(graph.diagnostics().is_empty());
        assert_eq!(graph.imports_of(0), vec![1, 2, 3]);
    }

    #[test]
    fn self_import_terminates_with_one_cycle() {
        let frags = fragments(&[("a.md", "<!-- agents-md: import=a.md -->A")]);
        let graph = ImportGraph::build(&frags);
        assert_eq!(graph.direct_roots(&[false]), vec![0]);

        let (steps, diagnostics) = expand_all(&graph, 0);
        assert_eq!(steps, vec![Step::Enter(0), Step::Leave(0)]);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0], Diagnostic::ImportCycle { .. }));
    }

    #[test]
    fn mutual_imports_break_back_edge_once() {
        let frags = fragments(&[
            ("a.md", "<!-- agents-md: import=b.md -->A"),
            ("b.md", "<!-- agents-md: import=a.md -->B"),
        ]);
        let graph = ImportGraph::build(&frags);
        let roots = graph.direct_roots(&[false, false]);
        assert_eq!(roots, vec![0]);

        let mut resolved = HashSet::new();
        let mut cycles = CycleLog::default();
        let mut steps = Vec::new();
        for root in roots {
            steps.extend(graph.expand(root, &mut resolved, &mut cycles));
        }
        let diagnostics = cycles.diagnostics();
        assert_eq!(
            steps,
            vec![Step::Enter(0), Step::Enter(1), Step::Leave(1), Step::Leave(0)]
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].fragment(), "b.md");
    }

    #[test]
    fn cycle_diagnostic_is_not_repeated_across_roots() {
        let frags = fragments(&[
            ("a.md", "<!-- agents-md: target=root, import=b.md -->A"),
            ("b.md", "<!-- agents-md: import=a.md -->B"),
        ]);
        let graph = ImportGraph::build(&frags);
        let mut cycles = CycleLog::default();
        graph.expand(0, &mut HashSet::new(), &mut cycles);
        graph.expand(0, &mut HashSet::new(), &mut cycles);
        assert_eq!(cycles.diagnostics().len(), 1);
    }

    #[test]
    fn cycle_entered_from_two_sides_is_reported_once() {
        let frags = fragments(&[
            ("a.agents.md", "<!-- agents-md: target=root, import=b.agents.md -->A"),
            ("b.agents.md", "<!-- agents-md: import=a.agents.md -->B"),
            ("pkg/c.agents.md", "<!-- agents-md: import=b.agents.md -->C"),
        ]);
        let graph = ImportGraph::build(&frags);
        let mut cycles = CycleLog::default();

        // separate outputs: a enters the cycle at a, c enters it at b
        graph.expand(0, &mut HashSet::new(), &mut cycles);
        graph.expand(2, &mut HashSet::new(), &mut cycles);

        assert_eq!(cycles.diagnostics().len(), 1);
        assert_eq!(cycles.diagnostics()[0].fragment(), "b.agents.md");
    }

    #[test]
    fn distinct_cycles_are_each_reported() {
        let frags = fragments(&[
            ("a.md", "<!-- agents-md: import=\"a.md, b.md\" -->A"),
            ("b.md", "<!-- agents-md: import=a.md -->B"),
        ]);
        let graph = ImportGraph::build(&frags);
        let (_, diagnostics) = expand_all(&graph, 0);
        // the self-import {a} and the pair {a, b}
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn missing_import_reported_once_per_pair() {
        let frags = fragments(&[
            ("a.md", "<!-- agents-md: import=@missing.md, import=@missing.md -->A"),
            ("b.md", "<!-- agents-md: import=\"a.md, missing.md\" -->B"),
        ]);
        let graph = ImportGraph::build(&frags);
        let missing: Vec<_> = graph
            .diagnostics()
            .iter()
            .filter(|d| matches!(d, Diagnostic::MissingImport { .. }))
            .collect();
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].fragment(), "a.md");
        assert_eq!(missing[1].fragment(), "b.md");

        // reaching a.md through b.md adds nothing
        let (steps, diagnostics) = expand_all(&graph, 1);
        assert_eq!(steps.len(), 4);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn diamond_inlines_shared_import_once() {
        let frags = fragments(&[
            ("a.md", "<!-- agents-md: import=\"b.md, c.md\" -->A"),
            ("b.md", "<!-- agents-md: import=d.md -->B"),
            ("c.md", "<!-- agents-md: import=d.md -->C"),
            ("d.md", "D"),
        ]);
        let graph = ImportGraph::build(&frags);
        let (steps, diagnostics) = expand_all(&graph, 0);
        assert_eq!(
            steps,
            vec![
                Step::Enter(0),
                Step::Enter(1),
                Step::Enter(3),
                Step::Leave(3),
                Step::Leave(1),
                Step::Enter(2),
                Step::Leave(2),
                Step::Leave(0),
            ]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn imported_fragments_are_not_direct_unless_targeted() {
        let frags = fragments(&[
            ("a.md", "<!-- agents-md: import=\"b.md, c.md\" -->A"),
            ("b.md", "B"),
            ("c.md", "<!-- agents-md: target=root -->C"),
        ]);
        let graph = ImportGraph::build(&frags);
        let explicit: Vec<bool> = frags.iter().map(|f| f.directive.target.is_some()).collect();
        assert_eq!(graph.direct_roots(&explicit), vec![0, 2]);
        assert!(graph.is_imported(1));
        assert!(!graph.is_imported(0));
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let entries: Vec<(String, String)> = (0..5000)
            .map(|i| {
                let raw = if i + 1 < 5000 {
                    format!("<!-- agents-md: import=f{}.md -->{}", i + 1, i)
                } else {
                    format!("{}", i)
                };
                (format!("f{}.md", i), raw)
            })
            .collect();
        let frags: Vec<Fragment> = entries
            .iter()
            .enumerate()
            .map(|(i, (p, r))| Fragment::parse(p.clone(), r.clone(), i))
            .collect();
        let graph = ImportGraph::build(&frags);
        let (steps, diagnostics) = expand_all(&graph, 0);
        assert_eq!(steps.len(), 10_000);
        assert!(diagnostics.is_empty());
    }
}
