//! Containment checks for every path the engine touches.
//!
//! A path is accepted only when its canonical form equals the authorized root
//! or lies strictly beneath it. Comparison is component-wise, so a sibling
//! such as `/root-secrets` is never inside `/root`.

use log;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Resolves `.` and `..` without touching the filesystem. A `..` that would
/// climb above the filesystem root is dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Canonical form of `path`. For a path that does not exist yet, the nearest
/// existing ancestor is canonicalized and the remainder re-appended; if even
/// that fails the normalized input is returned.
pub fn resolve_real_path(path: &Path) -> PathBuf {
    if let Ok(real) = fs::canonicalize(path) {
        return real;
    }
    let normalized = normalize_path(path);
    let mut remainder = Vec::new();
    let mut cursor = normalized.as_path();
    while let Some(parent) = cursor.parent() {
        if let Some(name) = cursor.file_name() {
            remainder.push(name.to_os_string());
        }
        if let Ok(real_parent) = fs::canonicalize(parent) {
            let mut resolved = real_parent;
            for part in remainder.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }
        cursor = parent;
    }
    log::trace!(
        "Could not canonicalize '{}', using it as given",
        normalized.display()
    );
    normalized
}

/// True iff the real `candidate` equals the real `root` or lies beneath it.
pub fn is_path_within_root(root: &Path, candidate: &Path) -> bool {
    if root.as_os_str().is_empty() || candidate.as_os_str().is_empty() {
        return false;
    }
    let real_root = resolve_real_path(root);
    let real_candidate = resolve_real_path(candidate);
    real_candidate.starts_with(&real_root)
}

/// Joins a relative `candidate` onto `root`, normalizes it and returns its real
/// path when that is contained in the real root. `None` means rejected.
pub fn resolve_authorized_path(root: Option<&Path>, candidate: &Path) -> Option<PathBuf> {
    let root = root?;
    if root.as_os_str().is_empty() || candidate.as_os_str().is_empty() {
        return None;
    }
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let real_root = resolve_real_path(root);
    let real_candidate = resolve_real_path(&normalize_path(&joined));
    if real_candidate.starts_with(&real_root) {
        Some(real_candidate)
    } else {
        log::warn!(
            "Rejected path outside the selected root: '{}'",
            candidate.display()
        );
        None
    }
}

/// Same containment rule against the temp root (the system temp dir unless
/// another is given).
pub fn is_path_within_temp_root(candidate: &Path, temp_root: Option<&Path>) -> bool {
    let default_root;
    let root = match temp_root {
        Some(root) => root,
        None => {
            default_root = env::temp_dir();
            default_root.as_path()
        }
    };
    is_path_within_root(root, candidate)
}

/// Root-relative form of `path` with `/` separators. Absolute paths outside the
/// root are returned unchanged apart from separators.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = if path.is_absolute() {
        pathdiff::diff_paths(path, root)
            .filter(|p| !p.starts_with(".."))
            .unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    };
    to_slash(&rel)
}

pub fn to_slash(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(p) => Some(p.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => None,
        })
        .collect();
    let joined = parts.join("/");
    if path.has_root() {
        format!("/{}", joined)
    } else {
        joined
    }
}
