//! Configuration handling for agents-md
//!
//! Configuration is read from the first of `agents-md.toml`,
//! `agents-md.yaml`, `agents-md.yml` or `agents-md.json` in the project
//! root. Keys are snake_case; camelCase spellings are accepted too.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use globset::GlobBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ComposeOptions, DefaultTarget, Limits, Router, Truncation};

/// Config file names, in lookup order
pub const CONFIG_FILES: &[&str] = &[
    "agents-md.toml",
    "agents-md.yaml",
    "agents-md.yml",
    "agents-md.json",
];

/// Config file written by `agents-md init`
pub const DEFAULT_CONFIG_FILE: &str = "agents-md.toml";

/// Contents of a freshly scaffolded config file
pub const DEFAULT_CONFIG_CONTENT: &str = r#"# agents-md configuration

# Fragments to compose (globs relative to this directory)
include = ["**/agents-md/**/*.md", "**/*.agents.md"]

# Where fragments without a target go: "nearest" or "root"
# default_target = "nearest"

# Prefix every section with a comment naming its source file
# annotate_sources = false

# [truncate]
# at_chars = 4000
# strategy = "middle"   # or "end"
# scope = "source"      # or "output"

# [limits]
# warn_output_chars = 20000
# max_output_chars = 40000
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// What an `include_files` predicate sees
#[derive(Debug, Clone, Copy)]
pub struct FileContext<'a> {
    /// Project-relative path of the candidate
    pub path: &'a str,
    /// Project root
    pub cwd: &'a Path,
}

/// Extra filter over discovered files (library use only)
#[derive(Clone)]
pub struct IncludeFiles(Arc<dyn Fn(&FileContext<'_>) -> bool + Send + Sync>);

impl IncludeFiles {
    pub fn new(predicate: impl Fn(&FileContext<'_>) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    pub fn matches(&self, ctx: &FileContext<'_>) -> bool {
        (self.0)(ctx)
    }
}

impl fmt::Debug for IncludeFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IncludeFiles(..)")
    }
}

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Globs selecting fragment files
    pub include: Vec<String>,

    /// Globs removing files (and whole directories) from discovery
    pub exclude: Vec<String>,

    #[serde(skip)]
    pub include_files: Option<IncludeFiles>,

    /// Routing for fragments without a target
    #[serde(alias = "defaultTarget")]
    pub default_target: DefaultTarget,

    /// Prefix sections with their source path
    #[serde(alias = "annotateSources")]
    pub annotate_sources: bool,

    pub truncate: Option<Truncation>,

    pub limits: Option<Limits>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: vec!["**/agents-md/**/*.md".to_string(), "**/*.agents.md".to_string()],
            exclude: vec!["**/node_modules/**".to_string(), "**/.git/**".to_string()],
            include_files: None,
            default_target: DefaultTarget::Nearest,
            annotate_sources: false,
            truncate: None,
            limits: None,
        }
    }
}

impl Config {
    /// Loads the configuration of a project, falling back to defaults
    pub fn load(project_root: &Path) -> Result<Self> {
        match Self::find(project_root) {
            Some(path) => Self::load_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Returns the config file used by a project, if any
    pub fn find(project_root: &Path) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| project_root.join(name))
            .find(|path| path.is_file())
    }

    /// Loads and validates a specific config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let parsed: Result<Config, ConfigError> = match extension {
            "toml" => toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            "json" => serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string())),
            other => Err(ConfigError::Invalid(format!("unsupported config format '{}'", other))),
        };

        let config = parsed.with_context(|| format!("Failed to load config: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        Ok(config)
    }

    /// Checks values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.include.is_empty() {
            return Err(ConfigError::Invalid("include must list at least one glob".to_string()));
        }

        for glob in self.include.iter().chain(&self.exclude) {
            GlobBuilder::new(glob)
                .literal_separator(true)
                .build()
                .map_err(|e| ConfigError::Invalid(format!("invalid glob {:?}: {}", glob, e)))?;
        }

        if let Some(truncate) = &self.truncate {
            if truncate.at_chars == 0 {
                return Err(ConfigError::Invalid("truncate.at_chars must be greater than 0".to_string()));
            }
        }

        Ok(())
    }

    /// Sets the programmatic file filter
    pub fn with_include_files(
        mut self,
        predicate: impl Fn(&FileContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.include_files = Some(IncludeFiles::new(predicate));
        self
    }

    /// Router for this configuration
    pub fn router(&self) -> Router {
        Router::new(&self.include, self.default_target)
    }

    /// Rendering options for this configuration
    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            annotate_sources: self.annotate_sources,
            truncate: self.truncate,
        }
    }
}
