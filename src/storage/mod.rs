//! # Storage Layer
//!
//! Filesystem side of agents-md: configuration, discovery and the project
//! handle that reads fragments and writes generated documents.
//!
//! ## Files
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Config | TOML, YAML or JSON | `agents-md.{toml,yaml,yml,json}` |
//! | Fragments | Markdown | `**/*.agents.md`, `**/agents-md/**/*.md` (configurable) |
//! | Outputs | Markdown | `AGENTS.md` per target directory |
//!
//! ## Write Semantics
//!
//! Outputs are rewritten in full on every compose run. Writes are plain
//! overwrites; an interrupted write is repaired by the next run.
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for reading fragments and writing outputs
//! - [`Config`] - Project configuration

mod config;
mod discovery;
mod project;

pub use config::{Config, ConfigError, FileContext, IncludeFiles, CONFIG_FILES, DEFAULT_CONFIG_FILE};
pub use discovery::discover;
pub use project::{InitOutcome, Migration, Project, ProjectError, INIT_FRAGMENT};
