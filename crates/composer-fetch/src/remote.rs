//! Remote interface resolution: registry lookup plus git clone.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::{FetchError, Fetcher, INTERFACE_PREFIX};

/// The public interface registry.
pub const DEFAULT_REGISTRY_URL: &str = "http://interfaces.juju.solutions/api/v1/interface";

/// A registry answer: where the interface's repository lives.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub repo: String,
}

/// Resolves `interface:` references through an HTTP registry, cloning the
/// answered repository into the deps directory.
pub struct RegistryLookup {
    endpoint: String,
    deps_dir: PathBuf,
}

impl RegistryLookup {
    /// Build a lookup against `endpoint`, cloning into `deps_dir`.
    pub fn new(endpoint: String, deps_dir: PathBuf) -> Self {
        Self { endpoint, deps_dir }
    }

    /// Query the registry for an interface by name.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response is not the
    /// expected JSON document.
    pub fn lookup(&self, name: &str) -> Result<RegistryEntry, FetchError> {
        let url = format!("{}/{}/", self.endpoint.trim_end_matches('/'), name);
        let agent = ureq::Agent::new_with_config(
            ureq::config::Config::builder()
                .timeout_connect(Some(std::time::Duration::from_secs(30)))
                .timeout_global(Some(std::time::Duration::from_secs(600)))
                .build(),
        );

        let response = agent.get(&url).call().map_err(|e| FetchError::Http {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| FetchError::Http {
                url: url.clone(),
                message: e.to_string(),
            })?;

        serde_json::from_str(&text).map_err(|e| FetchError::BadResponse {
            url,
            message: e.to_string(),
        })
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        if let Some(parent) = dest.parent() {
            composer_util::fs::ensure_dir(parent)?;
        }
        let mut cmd = Command::new("git");
        cmd.arg("clone")
            .arg("--depth")
            .arg("1")
            .arg(url)
            .arg(dest);
        let output = composer_util::process::run_command(&mut cmd)?;
        if !output.success {
            return Err(FetchError::Git {
                url: url.to_owned(),
                output: output.output(),
            });
        }
        Ok(())
    }
}

impl Fetcher for RegistryLookup {
    fn fetch(&self, reference: &str) -> Result<Option<PathBuf>, FetchError> {
        let Some(name) = reference.strip_prefix(INTERFACE_PREFIX) else {
            return Ok(None);
        };

        // A previously fetched subtree is reused, never mutated.
        let dest = self.deps_dir.join(name);
        if dest.is_dir() {
            log::debug!("reusing fetched interface at {}", dest.display());
            return Ok(Some(dest));
        }

        let entry = self.lookup(name)?;
        log::info!("fetching interface `{}` from {}", entry.name, entry.repo);
        self.clone_repo(&entry.repo, &dest)?;
        Ok(Some(dest))
    }
}
