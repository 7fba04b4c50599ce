//! Filesystem utilities for the composer.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Compute the forward-slash relative path of `entry` below `base`.
///
/// Returns `None` when `entry` is not below `base`.
pub fn rel_path(entry: &Path, base: &Path) -> Option<String> {
    let rel = entry.strip_prefix(base).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Recursively walk `dir`, returning every entry (directories and files)
/// sorted by path. The root itself is not included.
///
/// # Errors
/// Returns an error if any directory cannot be read.
pub fn walk_sorted(dir: &Path) -> Result<Vec<PathBuf>, UtilError> {
    let mut out = Vec::new();
    walk_recursive(dir, &mut out)?;
    out.sort();
    Ok(out)
}

fn walk_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), UtilError> {
    let entries = std::fs::read_dir(dir).map_err(|source| UtilError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| UtilError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        out.push(path.clone());
        if path.is_dir() {
            walk_recursive(&path, out)?;
        }
    }

    Ok(())
}

/// Copy `src` to `dest`, creating parent directories and preserving the
/// source file's permission bits.
///
/// When `src` and `dest` name the same file (in-place regeneration) the
/// copy is skipped.
///
/// # Errors
/// Returns an error if the file cannot be copied.
pub fn copy_preserving(src: &Path, dest: &Path) -> Result<(), UtilError> {
    if same_file(src, dest) {
        log::debug!("skipping self-copy of {}", src.display());
        return Ok(());
    }
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    // std::fs::copy carries permission bits across on Unix.
    std::fs::copy(src, dest).map_err(|source| UtilError::Io {
        path: dest.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Whether two paths resolve to the same existing file.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}

/// Mark a file as executable (mode 0755). No-op outside Unix.
///
/// # Errors
/// Returns an error if the permissions cannot be changed.
pub fn make_executable(path: &Path) -> Result<(), UtilError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(
            |source| UtilError::Io {
                path: path.display().to_string(),
                source,
            },
        )?;
    }
    Ok(())
}

/// Whether a file carries any executable bit. Always true outside Unix.
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(path) {
            Ok(meta) => meta.permissions().mode() & 0o111 != 0,
            Err(_) => false,
        }
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
