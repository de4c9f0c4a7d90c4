//! `file://` URL helpers for on-disk resources.

use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// `file://` URL for `path`, made absolute against the current directory.
pub fn file_url(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    format!("{FILE_SCHEME}{}", absolute.display())
}

/// Local path named by a `file://` URL or a plain path.
///
/// Returns `None` for other schemes (`data:`, `http:` ...).
pub fn path_from_url(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix(FILE_SCHEME) {
        // file://localhost/abs and file:///abs name the same file.
        let rest = rest.strip_prefix("localhost").unwrap_or(rest);
        return Some(PathBuf::from(rest));
    }
    if url.contains("://") || url.starts_with("data:") {
        return None;
    }
    Some(PathBuf::from(url))
}
