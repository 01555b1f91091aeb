//! Fragment discovery
//!
//! Walks the project tree and selects fragment files by glob. Results are
//! project-relative, forward-slash separated and sorted, which fixes the
//! discovery order used for tie-breaking.

use std::path::Path;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

use super::config::{Config, FileContext};
use crate::domain::OUTPUT_FILE;

/// Finds fragment files below `root`
pub fn discover(root: &Path, config: &Config) -> Result<Vec<String>> {
    let include = compile_globset(&config.include)?;
    let exclude = compile_globset(&config.exclude)?;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_excluded_dir(root, entry, &exclude));

    let mut paths = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = relative_posix(root, entry.path());
        // generated documents are never fragments
        if entry.file_name() == OUTPUT_FILE {
            continue;
        }
        if !include.is_match(&rel) || exclude.is_match(&rel) {
            continue;
        }
        if let Some(filter) = &config.include_files {
            if !filter.matches(&FileContext { path: &rel, cwd: root }) {
                continue;
            }
        }

        paths.push(rel);
    }

    paths.sort();
    Ok(paths)
}

/// A directory is pruned when a file directly inside it would be excluded
fn is_excluded_dir(root: &Path, entry: &DirEntry, exclude: &GlobSet) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let rel = relative_posix(root, entry.path());
    exclude.is_match(format!("{}/_", rel))
}

fn relative_posix(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

fn compile_globset(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for g in globs {
        let glob = GlobBuilder::new(g)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob: {g:?}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
