//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Migrate `CLAUDE.md`/`AGENTS.md` into a fragment, write `agents-md.toml`, compose |
//! | `compose` | Compose every `AGENTS.md` |
//! | `report` | Compose and print sizes, sources and limit details (`--json` for machines) |
//! | `watch` | Compose, then recompose on change |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Exit Codes
//!
//! - `0` - Success
//! - `1` - Error (bad config, unreadable fragment, unwritable output)
//! - `4` - A max limit was exceeded (outputs are still written)
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for progress output:
//! ```bash
//! agents-md --verbose compose
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod compose_cmd;
mod init;
mod watch_cmd;

pub use app::{Cli, Commands, run, LIMIT_VIOLATION_EXIT_CODE};
pub use output::{format_chars, Output, OutputFormat};
pub use watch_cmd::{watch, DEBOUNCE};
