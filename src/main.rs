//! agents-md - Compose AGENTS.md files from markdown fragments

use std::process::ExitCode;

fn main() -> ExitCode {
    match agents_md::cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
