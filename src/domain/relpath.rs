//! Project-relative path arithmetic
//!
//! All fragment and output paths are forward-slash separated and relative to
//! the project root (`""` is the root itself). Nothing here touches the
//! filesystem.

/// Normalizes `.` and `..` segments and duplicate separators.
///
/// `..` segments that would climb above the root are preserved as a leading
/// prefix so callers can detect an escape with [`escapes_root`].
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Joins `rel` onto the directory `base` and normalizes the result
pub fn join(base: &str, rel: &str) -> String {
    if base.is_empty() {
        normalize(rel)
    } else {
        normalize(&format!("{}/{}", base, rel))
    }
}

/// Returns the parent directory of a path (`""` for top-level entries)
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Returns the final path segment
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// True if a normalized path points outside the project root
pub fn escapes_root(path: &str) -> bool {
    path == ".." || path.starts_with("../")
}

/// True if `path` equals `dir` or lives below it
pub fn is_within(path: &str, dir: &str) -> bool {
    dir.is_empty() || path == dir || path.starts_with(&format!("{}/", dir))
}
