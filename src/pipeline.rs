//! Compose pipeline
//!
//! One full run: load fragments, compose, report diagnostics, write every
//! output and summarize sizes against the configured limits.

use std::cell::RefCell;
use std::collections::HashSet;

use anyhow::Result;

use crate::domain::{
    compose as compose_fragments, summarize, Diagnostic, Fragment, JsonReport, Output, Router,
};
use crate::storage::{Project, ProjectError};

/// Receives what a run has to say while it executes
pub trait Sink {
    /// A recoverable problem found in the fragments
    fn diagnostic(&self, diagnostic: &Diagnostic);

    /// Progress detail, for verbose consumers
    fn progress(&self, message: &str);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl Sink for SilentSink {
    fn diagnostic(&self, _diagnostic: &Diagnostic) {}
    fn progress(&self, _message: &str) {}
}

/// Collects everything (tests and library callers)
#[derive(Debug, Default)]
pub struct MemorySink {
    pub diagnostics: RefCell<Vec<Diagnostic>>,
    pub progress: RefCell<Vec<String>>,
}

impl Sink for MemorySink {
    fn diagnostic(&self, diagnostic: &Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic.clone());
    }

    fn progress(&self, message: &str) {
        self.progress.borrow_mut().push(message.to_string());
    }
}

/// Result of one compose run
#[derive(Debug, Clone)]
pub struct ComposeRun {
    /// Written outputs, in write order
    pub outputs: Vec<Output>,
    pub diagnostics: Vec<Diagnostic>,
    pub report: JsonReport,
}

impl ComposeRun {
    /// True when a max threshold was exceeded
    pub fn violated(&self) -> bool {
        self.report.violated()
    }

    /// Project-relative paths written by this run
    pub fn written(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|o| o.path.as_str())
    }
}

/// Drops discovered files that another fragment generates.
///
/// An explicit `target=<file>.md` can land under an include glob, so the
/// previous run's output shows up in discovery. A file counts as generated
/// when a fragment that is not itself generated routes to it. A fragment
/// routed onto its own path is kept and fails the collision check.
fn without_generated(fragments: Vec<Fragment>, router: &Router, sink: &dyn Sink) -> Vec<Fragment> {
    let routes: Vec<String> = fragments.iter().map(|f| router.route(f).output).collect();
    let targeted: HashSet<&str> = fragments
        .iter()
        .zip(&routes)
        .filter(|(f, route)| f.path != **route)
        .map(|(_, route)| route.as_str())
        .collect();
    let generated: HashSet<String> = fragments
        .iter()
        .zip(&routes)
        .filter(|(f, route)| f.path != **route && !targeted.contains(f.path.as_str()))
        .map(|(_, route)| route.clone())
        .collect();
    if generated.is_empty() {
        return fragments;
    }

    fragments
        .into_iter()
        .filter(|f| {
            let skip = generated.contains(&f.path);
            if skip {
                sink.progress(&format!("skipping generated {}", f.path));
            }
            !skip
        })
        .collect()
}

/// Runs the compose pipeline once and writes all outputs
pub fn compose(project: &Project, sink: &dyn Sink) -> Result<ComposeRun> {
    let config = project.config();
    let router = config.router();
    let fragments = without_generated(project.load_fragments()?, &router, sink);
    sink.progress(&format!(
        "{} fragment(s) under {}",
        fragments.len(),
        project.root().display()
    ));

    let composition = compose_fragments(&fragments, &router, &config.compose_options());
    for diagnostic in &composition.diagnostics {
        sink.diagnostic(diagnostic);
    }

    let fragment_paths: HashSet<&str> = fragments.iter().map(|f| f.path.as_str()).collect();
    if let Some(clash) = composition
        .documents
        .iter()
        .find(|d| fragment_paths.contains(d.path.as_str()))
    {
        return Err(ProjectError::OutputIsFragment(clash.path.clone()).into());
    }

    let mut outputs = Vec::with_capacity(composition.documents.len());
    for document in &composition.documents {
        project.write_document(document)?;
        let output = document.to_output();
        sink.progress(&format!(
            "{}: {} chars from {} source(s)",
            output.path,
            output.chars,
            output.sources.len()
        ));
        outputs.push(output);
    }

    let report = summarize(&outputs, config.limits.as_ref());
    Ok(ComposeRun {
        outputs,
        diagnostics: composition.diagnostics,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Config;
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> (TempDir, Project) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let project = Project::open(dir.path()).unwrap();
        (dir, project)
    }

    #[test]
    fn composes_single_fragment() {
        let (dir, project) = project(&[("a.agents.md", "Hello")]);
        let run = compose(&project, &SilentSink).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("AGENTS.md")).unwrap(), "Hello\n");
        assert_eq!(run.written().collect::<Vec<_>>(), vec!["AGENTS.md"]);
        assert_eq!(run.report.totals.outputs, 1);
        assert!(!run.violated());
    }

    #[test]
    fn compose_twice_is_byte_identical() {
        let (dir, project) = project(&[
            ("a.agents.md", "<!-- agents-md: weight=2 -->A"),
            ("b.agents.md", "<!-- agents-md: import=agents-md/shared.md -->B"),
            ("agents-md/shared.md", "<!-- agents-md: target=/pkg -->Shared"),
            ("pkg/api.agents.md", "API"),
        ]);

        compose(&project, &SilentSink).unwrap();
        let first = fs::read(dir.path().join("AGENTS.md")).unwrap();
        let first_pkg = fs::read(dir.path().join("pkg/AGENTS.md")).unwrap();

        compose(&project, &SilentSink).unwrap();
        assert_eq!(fs::read(dir.path().join("AGENTS.md")).unwrap(), first);
        assert_eq!(fs::read(dir.path().join("pkg/AGENTS.md")).unwrap(), first_pkg);
    }

    #[test]
    fn missing_import_reported_once() {
        let (_dir, project) = project(&[("a.agents.md", "<!-- agents-md: import=@missing.md -->A")]);
        let sink = MemorySink::default();
        let run = compose(&project, &sink).unwrap();

        let diagnostics = sink.diagnostics.borrow();
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0], Diagnostic::MissingImport { .. }));
        assert_eq!(run.diagnostics.len(), 1);
        assert!(!sink.progress.borrow().is_empty());
    }

    #[test]
    fn limits_are_evaluated() {
        let (_dir, project) = project(&[
            ("a.agents.md", "Hello"),
            (
                "agents-md.toml",
                "[limits]\nmax_output_chars = 3\n",
            ),
        ]);
        let run = compose(&project, &SilentSink).unwrap();
        assert!(run.violated());
        let limits = run.report.limits.unwrap();
        assert_eq!(limits.details, vec!["AGENTS.md exceeds max output chars (6 > 3)"]);
    }

    #[test]
    fn explicit_target_under_include_glob_composes_twice() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(
            dir.path().join("docs/guide.md"),
            "<!-- agents-md: target=OUT.md -->Guide",
        )
        .unwrap();
        let config = Config {
            include: vec!["docs/**/*.md".to_string()],
            ..Config::default()
        };
        let project = Project::with_config(dir.path(), config);

        let first = compose(&project, &SilentSink).unwrap();
        assert_eq!(first.written().collect::<Vec<_>>(), vec!["docs/OUT.md"]);

        let sink = MemorySink::default();
        let second = compose(&project, &sink).unwrap();
        assert_eq!(second.written().collect::<Vec<_>>(), vec!["docs/OUT.md"]);
        assert_eq!(fs::read_to_string(dir.path().join("docs/OUT.md")).unwrap(), "Guide\n");
        assert!(!dir.path().join("docs/AGENTS.md").exists());
        assert!(sink
            .progress
            .borrow()
            .iter()
            .any(|m| m == "skipping generated docs/OUT.md"));
    }

    #[test]
    fn output_over_fragment_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.md"), "<!-- agents-md: target=notes.md -->N").unwrap();
        let config = Config {
            include: vec!["*.md".to_string()],
            ..Config::default()
        };
        let project = Project::with_config(dir.path(), config);

        let err = compose(&project, &SilentSink).unwrap_err();
        assert!(err.downcast_ref::<ProjectError>().is_some());
    }
}
