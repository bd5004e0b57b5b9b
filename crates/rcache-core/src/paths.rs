//! Path normalization: the relative-path rule that makes cache keys
//! insensitive to the build tree's location.

use std::path::{Component, Path, PathBuf};

/// Rewrite `path` relative to `cwd` when it lies under `base_dir`.
///
/// Cache keys must not change just because two checkouts of the same tree
/// live in different directories, so any path under the configured base is
/// canonicalized and re-expressed relative to the working directory. Paths
/// outside the base (system headers, toolchain files) pass through
/// untouched. When the path does not exist yet (output files), the nearest
/// existing ancestor is canonicalized and the remaining suffix re-appended.
#[must_use]
pub fn make_relative_path(base_dir: &str, cwd: &Path, path: &str) -> String {
    if base_dir.is_empty() || !path.starts_with(base_dir) {
        return path.to_string();
    }

    let original = Path::new(path);
    let (existing, suffix) = nearest_existing_ancestor(original);
    let Ok(canonical) = existing.canonicalize() else {
        return path.to_string();
    };
    let target = match &suffix {
        Some(rest) => canonical.join(rest),
        None => canonical,
    };
    match relative_path(cwd, &target) {
        Some(rel) => rel.to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}

/// Split a path into its deepest existing ancestor and the non-existing
/// remainder, if any.
fn nearest_existing_ancestor(path: &Path) -> (PathBuf, Option<PathBuf>) {
    if path.exists() {
        return (path.to_path_buf(), None);
    }
    let mut dir = path.to_path_buf();
    let mut suffix = PathBuf::new();
    while let Some(parent) = dir.parent() {
        let tail = dir.file_name().map(PathBuf::from).unwrap_or_default();
        suffix = tail.join(&suffix);
        dir = parent.to_path_buf();
        if dir.exists() {
            break;
        }
    }
    (dir, Some(suffix))
}

/// Relative path from directory `from` to `to`. Both must be absolute.
#[must_use]
pub fn relative_path(from: &Path, to: &Path) -> Option<PathBuf> {
    if !from.is_absolute() || !to.is_absolute() {
        return None;
    }
    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from_parts.len() {
        rel.push("..");
    }
    for part in &to_parts[common..] {
        rel.push(part);
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Some(rel)
}

/// Whether a path string is absolute.
#[must_use]
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

#[cfg(unix)]
pub(crate) fn mtime_of(meta: &std::fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.mtime()
}

#[cfg(unix)]
pub(crate) fn ctime_of(meta: &std::fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.ctime()
}

#[cfg(not(unix))]
pub(crate) fn mtime_of(meta: &std::fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(not(unix))]
pub(crate) fn ctime_of(meta: &std::fs::Metadata) -> i64 {
    mtime_of(meta)
}

/// Strip a leading `./`, which clang likes to prefix include paths with.
#[must_use]
pub fn strip_dot_slash(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

/// Remove the extension from a path string, if it has one.
#[must_use]
pub fn without_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') && dot > 0 => &path[..dot],
        _ => path,
    }
}

/// The extension of a path string, including the dot, or `""`.
#[must_use]
pub fn extension_of(path: &str) -> &str {
    match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => &path[dot..],
        _ => "",
    }
}
