//! The `interface.yaml` configuration document.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// File name of the interface configuration document.
pub const INTERFACE_CONFIG_NAME: &str = "interface.yaml";

/// The parsed `interface.yaml` of an interface package.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    /// The interface name relations bind against (e.g. `mysql`).
    pub name: Option<String>,
    pub summary: Option<String>,
    pub version: Option<String>,
    pub maintainer: Option<String>,
}

impl InterfaceConfig {
    /// Load the configuration for the interface rooted at `dir`.
    ///
    /// A missing file yields a default; the caller falls back to the
    /// reference-derived name.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(INTERFACE_CONFIG_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Malformed {
            path: path.display().to_string(),
            source,
        })
    }
}
