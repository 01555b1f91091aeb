//! Init command

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use super::compose_cmd::{exit_code, print_limits, print_written};
use super::output::Output;
use crate::pipeline;
use crate::storage::Project;

/// Scaffolds the project, then composes it
pub fn run(output: &Output, root: &Path) -> Result<ExitCode> {
    output.verbose_ctx("init", &format!("Initializing project at: {}", root.display()));
    let outcome = Project::init(root)?;

    if let Some(migration) = outcome.migration {
        output.success(&migration.to_string());
    }
    if let Some(path) = &outcome.config_created {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        output.success(&format!("created {}", name.unwrap_or_else(|| path.display().to_string())));
    }

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
