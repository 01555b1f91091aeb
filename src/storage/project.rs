//! Project management
//!
//! A project is a directory tree holding fragments, an optional config file
//! and the generated `AGENTS.md` documents.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::{Config, DEFAULT_CONFIG_CONTENT, DEFAULT_CONFIG_FILE};
use super::discovery;
use crate::domain::{Document, Fragment, OUTPUT_FILE};

/// Fragment created by `init` from existing instructions
pub const INIT_FRAGMENT: &str = "project.agents.md";

/// File that points Claude at the generated document after migration
const CLAUDE_FILE: &str = "CLAUDE.md";
const CLAUDE_POINTER: &str = "@AGENTS.md\n";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Output {0} would overwrite a fragment; adjust the target or include globs")]
    OutputIsFragment(String),
}

/// Existing instructions moved into a fragment by `init`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    /// `CLAUDE.md` moved, replaced by a pointer to `AGENTS.md`
    Claude,
    /// `AGENTS.md` content moved
    Agents,
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self {
            Migration::Claude => CLAUDE_FILE,
            Migration::Agents => OUTPUT_FILE,
        };
        write!(f, "moved {} -> {}", source, INIT_FRAGMENT)
    }
}

/// What `init` changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    pub migration: Option<Migration>,
    pub config_created: Option<PathBuf>,
}

/// An agents-md project
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens a project, loading its config file
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ProjectError::NotFound(root).into());
        }

        let config = Config::load(&root)?;
        Ok(Self { root, config })
    }

    /// Creates a project with an explicit configuration
    pub fn with_config(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Scaffolds a project: migrates existing instructions and writes a config.
    ///
    /// Existing fragments and config files are never overwritten.
    pub fn init(root: impl Into<PathBuf>) -> Result<InitOutcome> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create project directory: {}", root.display()))?;

        let fragment = root.join(INIT_FRAGMENT);
        let claude = root.join(CLAUDE_FILE);
        let agents = root.join(OUTPUT_FILE);

        let migration = if fragment.exists() {
            None
        } else if claude.is_file() {
            fs::rename(&claude, &fragment)
                .with_context(|| format!("Failed to move {}", claude.display()))?;
            fs::write(&claude, CLAUDE_POINTER)
                .with_context(|| format!("Failed to write {}", claude.display()))?;
            Some(Migration::Claude)
        } else if agents.is_file() {
            let content = fs::read_to_string(&agents)
                .with_context(|| format!("Failed to read {}", agents.display()))?;
            fs::write(&fragment, content)
                .with_context(|| format!("Failed to write {}", fragment.display()))?;
            fs::remove_file(&agents)
                .with_context(|| format!("Failed to remove {}", agents.display()))?;
            Some(Migration::Agents)
        } else {
            None
        };

        let config_created = match Config::find(&root) {
            Some(_) => None,
            None => {
                let path = root.join(DEFAULT_CONFIG_FILE);
                fs::write(&path, DEFAULT_CONFIG_CONTENT)
                    .with_context(|| format!("Failed to write config: {}", path.display()))?;
                Some(path)
            }
        };

        Ok(InitOutcome {
            migration,
            config_created,
        })
    }

    /// Returns the project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the project configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discovers fragment paths in discovery order
    pub fn discover(&self) -> Result<Vec<String>> {
        discovery::discover(&self.root, &self.config)
    }

    /// Reads and parses every discovered fragment
    pub fn load_fragments(&self) -> Result<Vec<Fragment>> {
        self.discover()?
            .into_iter()
            .enumerate()
            .map(|(order, rel)| {
                let path = self.root.join(&rel);
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read fragment: {}", path.display()))?;
                Ok(Fragment::parse(rel, raw, order))
            })
            .collect()
    }

    /// Writes a generated document, replacing any previous content
    pub fn write_document(&self, document: &Document) -> Result<PathBuf> {
        let path = self.root.join(&document.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        fs::write(&path, &document.content)
            .with_context(|| format!("Failed to write output: {}", path.display()))?;
        Ok(path)
    }
}
