//! Compose and report commands

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use super::app::LIMIT_VIOLATION_EXIT_CODE;
use super::output::{format_chars, Output};
use crate::domain::{JsonReport, OUTPUT_FILE};
use crate::pipeline::{self, ComposeRun};
use crate::storage::Project;

/// Composes every output and lists what was written
pub fn compose(output: &Output, root: &Path) -> Result<ExitCode> {
    let project = Project::open(root)?;
    let run = pipeline::compose(&project, output)?;

    if output.is_json() {
        output.data(&run.report);
    } else {
        print_written(&run);
        print_limits(output, &run.report);
    }

    Ok(exit_code(&run))
}

/// Composes every output and prints the size report
pub fn report(output: &Output, root: &Path, json: bool) -> Result<ExitCode> {
    let project = Project::open(root)?;
    let run = pipeline::compose(&project, output)?;

    if json || output.is_json() {
        if let Ok(text) = serde_json::to_string_pretty(&run.report) {
            println!("{}", text);
        }
    } else {
        print!("{}", render_report(&run.report));
    }

    Ok(exit_code(&run))
}

/// Prints one `wrote` line per output
pub(super) fn print_written(run: &ComposeRun) {
    for o in &run.outputs {
        println!("wrote {} ({} chars)", o.path, format_chars(o.chars));
    }
}

/// Prints limit details as warnings
pub(super) fn print_limits(output: &Output, report: &JsonReport) {
    if let Some(limits) = &report.limits {
        for detail in &limits.details {
            output.warn(detail);
        }
    }
}

/// Exit code for a finished run
pub(super) fn exit_code(run: &ComposeRun) -> ExitCode {
    if run.violated() {
        ExitCode::from(LIMIT_VIOLATION_EXIT_CODE)
    } else {
        ExitCode::SUCCESS
    }
}

fn render_report(report: &JsonReport) -> String {
    let mut text = String::new();

    for o in &report.outputs {
        let kind = if o.path == OUTPUT_FILE { "root" } else { "nested" };
        text.push_str(&format!(
            "{} ({}) - {} chars, {} source(s)\n",
            o.path,
            kind,
            format_chars(o.chars),
            o.sources.len()
        ));
        for source in &o.sources {
            text.push_str(&format!("  {} ({} chars)\n", source.path, format_chars(source.chars)));
        }
    }

    if let Some(limits) = &report.limits {
        text.push('\n');
        let heading = if limits.violated { "Limits exceeded:" } else { "Limit warnings:" };
        text.push_str(heading);
        text.push('\n');
        for detail in &limits.details {
            text.push_str(&format!("  {}\n", detail));
        }
    }

    text.push('\n');
    text.push_str(&format!(
        "Totals: {} AGENTS.md files, {} chars, {} sources\n",
        report.totals.outputs,
        format_chars(report.totals.chars),
        report.totals.sources
    ));
    text
}
