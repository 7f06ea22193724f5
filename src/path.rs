//! Slash-delimited path helpers.

use crate::error::{HfsError, HfsResult};

/// Parent directory derived by stripping the last path segment.
///
/// The root (`/` or the empty path) has no parent.
pub fn dir_name(path: &str) -> Option<String> {
    if path.is_empty() || path == "/" {
        return None;
    }
    let mut parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    parts.pop();
    Some(format!("/{}", parts.join("/")))
}

/// Appends `name` to `dir`.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" || dir.is_empty() {
        format!("/{}", name.trim_start_matches('/'))
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
    }
}

/// Normalize and validate a path
pub fn normalize_path(path: &str) -> HfsResult<String> {
    if path.is_empty() {
        return Err(HfsError::InvalidPath("empty path".into()));
    }

    if path.split('/').any(|s| s == "..") {
        return Err(HfsError::InvalidPath(".. traversal not allowed".into()));
    }

    let clean = path.trim_matches('/');
    if clean.is_empty() {
        return Ok("/".to_string());
    }

    // e.g. "//"
    if clean.split('/').any(|s| s.is_empty()) {
        return Err(HfsError::InvalidPath("empty path component".into()));
    }

    Ok(format!("/{}", clean))
}

/// True if `path` lies strictly below `dir`.
pub fn is_descendant(path: &str, dir: &str) -> bool {
    if dir == "/" {
        return path != "/" && path.starts_with('/');
    }
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}
