//! agents-md - Compose AGENTS.md files from markdown fragments
//!
//! Fragments (`*.agents.md` files and markdown under `agents-md/` folders)
//! carry optional `<!-- agents-md: ... -->` directives that set their target,
//! title, weight and imports. A compose run routes every fragment to an
//! `AGENTS.md`, inlines imports, applies truncation and reports sizes
//! against configured limits.

pub mod domain;
pub mod storage;
pub mod pipeline;
pub mod cli;

pub use cli::watch;
pub use domain::{parse_directive, strip_directives, summarize, Diagnostic, Directive, JsonReport};
pub use pipeline::{compose, ComposeRun, MemorySink, SilentSink, Sink};
pub use storage::{Config, Project};
