//! Local filesystem resolvers.

use std::path::PathBuf;

use crate::{FetchError, Fetcher, INTERFACE_PREFIX};

/// Searches local repository roots for a layer reference.
///
/// Roots, in order: the working directory, `$REPOSITORY`, and each element
/// of colon-separated `$COMPOSER_PATH`. A reference naming an existing
/// directory outright is claimed as-is.
pub struct RepoSearch {
    roots: Vec<PathBuf>,
}

impl RepoSearch {
    /// Build a search over explicit roots.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Build the search path from the process environment.
    pub fn from_env() -> Self {
        let mut roots = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            roots.push(cwd);
        }
        if let Ok(repo) = std::env::var("REPOSITORY") {
            if !repo.is_empty() {
                roots.push(PathBuf::from(repo));
            }
        }
        if let Ok(path) = std::env::var("COMPOSER_PATH") {
            for part in path.split(':').filter(|p| !p.is_empty()) {
                roots.push(PathBuf::from(part));
            }
        }
        Self::new(roots)
    }
}

impl Fetcher for RepoSearch {
    fn fetch(&self, reference: &str) -> Result<Option<PathBuf>, FetchError> {
        let direct = PathBuf::from(reference);
        if direct.is_dir() {
            return Ok(Some(direct));
        }
        for root in &self.roots {
            let candidate = root.join(reference);
            if candidate.is_dir() {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

/// Searches local interface directories for `interface:` references.
///
/// Roots, in order: `./interfaces` and each element of `$INTERFACE_PATH`
/// (platform path-separator list).
pub struct InterfaceSearch {
    roots: Vec<PathBuf>,
}

impl InterfaceSearch {
    /// Build a search over explicit roots.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Build the search path from the process environment.
    pub fn from_env() -> Self {
        let mut roots = vec![PathBuf::from("interfaces")];
        if let Ok(path) = std::env::var("INTERFACE_PATH") {
            roots.extend(std::env::split_paths(&path));
        }
        Self::new(roots)
    }
}

impl Fetcher for InterfaceSearch {
    fn fetch(&self, reference: &str) -> Result<Option<PathBuf>, FetchError> {
        let Some(name) = reference.strip_prefix(INTERFACE_PREFIX) else {
            return Ok(None);
        };
        for root in &self.roots {
            let candidate = root.join(name);
            if candidate.is_dir() {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
