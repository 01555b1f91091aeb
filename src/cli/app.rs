//! Main CLI application structure

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{compose_cmd, init, watch_cmd};

/// Exit code when a max limit is exceeded
pub const LIMIT_VIOLATION_EXIT_CODE: u8 = 4;

#[derive(Parser)]
#[command(name = "agents-md")]
#[command(author, version, about = "Compose AGENTS.md files from markdown fragments")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (defaults to current directory)
    #[arg(long, short = 'C', global = true, default_value = ".")]
    pub cwd: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Migrate existing instructions into a fragment, write a config and compose
    Init,

    /// Compose AGENTS.md files
    Compose,

    /// Compose and report output sizes
    Report {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compose, then recompose whenever fragments change
    Watch,
}

/// Main entry point for the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    output.verbose("agents-md starting");
    output.verbose_ctx("cli", &format!("Project root: {}", cli.cwd.display()));

    let code = match cli.command {
        Commands::Init => init::run(&output, &cli.cwd)?,
        Commands::Compose => compose_cmd::compose(&output, &cli.cwd)?,
        Commands::Report { json } => compose_cmd::report(&output, &cli.cwd, json)?,
        Commands::Watch => watch_cmd::watch(&output, &cli.cwd)?,
    };

    output.verbose("Command completed");
    Ok(code)
}
