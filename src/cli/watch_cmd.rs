//! Watch mode
//!
//! Composes once, then watches the project root and recomposes after each
//! burst of changes. Runs happen on the event loop thread, so they never
//! overlap; events that arrive during a run are handled after it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::new_debouncer;

use super::compose_cmd::{exit_code, print_limits, print_written};
use super::output::Output;
use crate::domain::Diagnostic;
use crate::pipeline::{self, ComposeRun, Sink};
use crate::storage::Project;

/// Quiet period before a burst of events triggers a run
pub const DEBOUNCE: Duration = Duration::from_millis(200);

/// Directories whose changes never trigger a run
const IGNORED_DIRS: &[&str] = &[".git"];

/// Sink used while watching: diagnostics only in verbose mode, timestamped progress
struct WatchSink<'a> {
    output: &'a Output,
}

impl WatchSink<'_> {
    fn log(&self, message: &str) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        self.output.verbose_ctx("watch", &format!("[{}] {}", timestamp, message));
    }
}

impl Sink for WatchSink<'_> {
    fn diagnostic(&self, diagnostic: &Diagnostic) {
        if self.output.is_verbose() {
            self.output.warn(&diagnostic.to_string());
        }
    }

    fn progress(&self, message: &str) {
        self.log(message);
    }
}

/// Tracks which filesystem events deserve a new run
#[derive(Debug)]
struct WatchState {
    root: PathBuf,
    /// Project-relative outputs of the last run
    written: HashSet<String>,
}

impl WatchState {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            written: HashSet::new(),
        }
    }

    fn record_run(&mut self, run: &ComposeRun) {
        self.written = run.written().map(str::to_string).collect();
    }

    /// Checks if an event path should trigger a run
    fn is_relevant(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        if rel.is_empty() {
            return false;
        }

        let first = rel.split('/').next().unwrap_or("");
        if IGNORED_DIRS.contains(&first) {
            return false;
        }

        !self.written.contains(&rel)
    }
}

/// Composes the project at `root` and keeps it up to date until interrupted.
///
/// A failing first run is returned as an error; later failures are reported
/// and watching continues. Returns the last run's exit code if the event
/// channel closes.
pub fn watch(output: &Output, root: &Path) -> Result<ExitCode> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve project root: {}", root.display()))?;
    let sink = WatchSink { output };
    let mut state = WatchState::new(root.clone());

    let run = run_once(output, &sink, &root)?;
    state.record_run(&run);
    let mut last = exit_code(&run);

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx)?;
    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", root.display()))?;

    println!("Watching for changes...");
    sink.log(&format!("watching {} (debounce: {}ms)", root.display(), DEBOUNCE.as_millis()));

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().filter(|e| state.is_relevant(&e.path)).count();
                if relevant == 0 {
                    continue;
                }

                sink.log(&format!("detected {} change(s)", relevant));
                match run_once(output, &sink, &root) {
                    Ok(run) => {
                        state.record_run(&run);
                        last = exit_code(&run);
                    }
                    Err(e) => output.error(&format!("{:#}", e)),
                }
            }
            Ok(Err(error)) => {
                sink.log(&format!("watch error: {:?}", error));
            }
            Err(_) => break,
        }
    }

    Ok(last)
}

/// One compose run with watch-mode reporting. The config is reloaded every time.
fn run_once(output: &Output, sink: &WatchSink<'_>, root: &Path) -> Result<ComposeRun> {
    let project = Project::open(root)?;
    let run = pipeline::compose(&project, sink)?;
    print_written(&run);
    print_limits(output, &run.report);
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{summarize, Output as OutputSize};

    fn state_with_written(paths: &[&str]) -> WatchState {
        let outputs: Vec<OutputSize> = paths
            .iter()
            .map(|p| OutputSize {
                path: p.to_string(),
                chars: 1,
                sources: vec![],
            })
            .collect();
        let run = ComposeRun {
            report: summarize(&outputs, None),
            outputs,
            diagnostics: vec![],
        };

        let mut state = WatchState::new(PathBuf::from("/project"));
        state.record_run(&run);
        state
    }

    #[test]
    fn test_is_relevant() {
        let state = state_with_written(&["AGENTS.md", "pkg/AGENTS.md"]);

        assert!(state.is_relevant(Path::new("/project/a.agents.md")));
        assert!(state.is_relevant(Path::new("/project/pkg/agents-md/style.md")));
        assert!(state.is_relevant(Path::new("/project/agents-md.toml")));

        assert!(!state.is_relevant(Path::new("/project/AGENTS.md")));
        assert!(!state.is_relevant(Path::new("/project/pkg/AGENTS.md")));
        assert!(!state.is_relevant(Path::new("/project/.git/index")));
        assert!(!state.is_relevant(Path::new("/project")));
        assert!(!state.is_relevant(Path::new("/elsewhere/a.agents.md")));
    }

    #[test]
    fn test_written_set_is_replaced() {
        let mut state = state_with_written(&["AGENTS.md"]);
        let fresh = state_with_written(&["docs/AGENTS.md"]);
        state.written = fresh.written;

        assert!(state.is_relevant(Path::new("/project/AGENTS.md")));
        assert!(!state.is_relevant(Path::new("/project/docs/AGENTS.md")));
    }
}
