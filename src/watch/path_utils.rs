// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. symlinked temp dirs on macOS), we canonicalize the
///   root and the path's parent directory and try again. The parent is used
///   because a removed file can no longer be canonicalized.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let name = path.file_name()?;
    let parent_canon = path.parent()?.canonicalize().ok()?;
    let rel = parent_canon.join(name);
    rel.strip_prefix(&root_canon).ok().map(to_slash)
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Editor swap/backup files that should never trigger a rebuild.
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bak" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
}
