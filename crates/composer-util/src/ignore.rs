//! Gitignore-flavoured pattern matching for layer ignore lists.

use crate::error::UtilError;

/// Patterns applied to every layer regardless of configuration: compiled
/// Python artifacts, editor backups, VCS metadata, and rope caches.
pub const BUILTIN_IGNORES: &[&str] = &[
    "*.pyc",
    "*~",
    "*.swp",
    ".git",
    ".bzr",
    ".hg",
    ".svn",
    ".ropeproject",
];

/// An ordered set of ignore patterns.
///
/// A pattern containing `/` is matched against the whole relative path;
/// a bare pattern is matched against each path component, so `.bzr`
/// suppresses the directory and everything beneath it.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    patterns: Vec<CompiledPattern>,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    glob: glob::Pattern,
    whole_path: bool,
}

impl IgnoreSet {
    /// Compile an ignore set from the built-in list plus layer-provided
    /// patterns.
    ///
    /// # Errors
    /// Returns an error if any pattern fails to compile.
    pub fn new(extra: &[String]) -> Result<Self, UtilError> {
        let mut patterns = Vec::new();
        for raw in BUILTIN_IGNORES.iter().copied() {
            patterns.push(compile(raw)?);
        }
        for raw in extra {
            patterns.push(compile(raw)?);
        }
        Ok(Self { patterns })
    }

    /// An ignore set holding only the built-in patterns.
    ///
    /// # Errors
    /// Returns an error if a built-in pattern fails to compile.
    pub fn builtin() -> Result<Self, UtilError> {
        Self::new(&[])
    }

    /// Whether `rel` (a forward-slash relative path) is suppressed.
    pub fn matches(&self, rel: &str) -> bool {
        for pattern in &self.patterns {
            if pattern.whole_path {
                if pattern.glob.matches(rel) {
                    return true;
                }
            } else if rel.split('/').any(|part| pattern.glob.matches(part)) {
                return true;
            }
        }
        false
    }
}

fn compile(raw: &str) -> Result<CompiledPattern, UtilError> {
    // A trailing slash is directory syntax in gitignore; the component
    // matcher already covers the subtree, so strip it.
    let trimmed = raw.strip_suffix('/').unwrap_or(raw);
    let glob = glob::Pattern::new(trimmed).map_err(|e| UtilError::IgnorePattern {
        pattern: raw.to_owned(),
        message: e.to_string(),
    })?;
    Ok(CompiledPattern {
        glob,
        whole_path: trimmed.contains('/'),
    })
}
