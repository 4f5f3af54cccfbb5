//! Path containment checks
//!
//! Every file served to a client goes through [`resolve`]: the requested
//! relative path is joined onto its root, both are made absolute and
//! lexically normalised, and the result must lie inside the root component by
//! component. `Path::starts_with` compares whole components, so `/data/foo`
//! does not contain `/data/foobar`.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::AppError;

/// Make `path` absolute against the working directory and fold `.` and `..`
/// without touching the filesystem.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize(&joined))
}

/// Lexical normalisation; `..` never climbs above the root component
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Whether `path` lies within `root` (both already absolute and normalised)
pub fn is_contained(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/// Resolve a client-supplied relative path against `root`.
///
/// Fails with `AccessDenied` when the result escapes the root, including via
/// a symlink inside the root, and with `FileNotFound` when nothing exists at
/// the resolved location.
pub fn resolve(requested: &str, root: &Path) -> Result<PathBuf, AppError> {
    let requested_path = Path::new(requested);
    if requested_path.has_root() {
        return Err(AppError::AccessDenied(requested.to_string()));
    }

    let abs_root = absolutize(root)
        .map_err(|e| AppError::Internal(format!("invalid search directory: {}", e)))?;
    let abs_path = normalize(&abs_root.join(requested_path));

    if !is_contained(&abs_path, &abs_root) {
        return Err(AppError::AccessDenied(requested.to_string()));
    }

    let real_path = match std::fs::canonicalize(&abs_path) {
        Ok(p) => p,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(AppError::FileNotFound(requested.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    let real_root = std::fs::canonicalize(&abs_root)?;
    if !is_contained(&real_path, &real_root) {
        return Err(AppError::AccessDenied(requested.to_string()));
    }

    Ok(abs_path)
}

/// Check that a client-chosen search root lies inside an allowed base
pub fn confine_root(requested_root: &Path, allowed: &Path) -> Result<PathBuf, AppError> {
    let abs = absolutize(requested_root)
        .map_err(|e| AppError::Internal(format!("invalid search directory: {}", e)))?;
    let abs_allowed = absolutize(allowed)
        .map_err(|e| AppError::Internal(format!("invalid search directory: {}", e)))?;
    if is_contained(&abs, &abs_allowed) {
        Ok(abs)
    } else {
        Err(AppError::AccessDenied(requested_root.display().to_string()))
    }
}
