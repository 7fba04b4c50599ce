//! The `composer.yaml` layer configuration document.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// File name of the layer configuration document.
pub const LAYER_CONFIG_NAME: &str = "composer.yaml";

/// A scalar-or-sequence value; scalars are promoted to singletons.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s.clone()],
            Self::Many(v) => v.clone(),
        }
    }
}

/// Per-section rewrite rules (`metadata:` / `config:` blocks).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SectionRules {
    /// Dotted paths to strip from the merged document.
    pub deletes: Vec<String>,
}

/// The parsed `composer.yaml` of a layer.
///
/// The document is free-form; only the recognised keys are modelled and
/// unknown keys are ignored here (the `ComposerYAML` tactic re-reads the
/// raw document when rewriting it, so nothing is lost).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    includes: Option<OneOrMany>,
    /// Gitignore-style patterns applied to the layer *below*.
    pub ignore: Vec<String>,
    /// Dotted paths naming custom tactics, resolved against the built-in
    /// catalogue.
    pub tactics: Vec<String>,
    /// Rewrite rules for `metadata.yaml`.
    pub metadata: SectionRules,
    /// Rewrite rules for `config.yaml` (scoped under `options`).
    pub config: SectionRules,
    /// Recorded identity of the layer (set by the composer on output).
    pub is: Option<String>,
    /// Informational name.
    pub name: Option<String>,
    #[serde(skip)]
    configured: bool,
}

impl LayerConfig {
    /// Load the configuration for the layer rooted at `dir`.
    ///
    /// A missing or empty `composer.yaml` yields an unconfigured default;
    /// base layers are allowed to carry none.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(LAYER_CONFIG_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&content, &path.display().to_string())
    }

    /// Parse a layer configuration from a YAML string.
    ///
    /// # Errors
    /// Returns an error if the string is not valid YAML.
    pub fn from_str(content: &str, path: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: LayerConfig =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Malformed {
                path: path.to_owned(),
                source,
            })?;
        config.configured = true;
        Ok(config)
    }

    /// Whether a non-empty configuration document was present.
    pub fn configured(&self) -> bool {
        self.configured
    }

    /// The declared includes, scalars promoted to singletons.
    pub fn includes(&self) -> Vec<String> {
        self.includes.as_ref().map(OneOrMany::to_vec).unwrap_or_default()
    }

    /// The delete rules for the named document section.
    pub fn deletes(&self, section: &str) -> &[String] {
        match section {
            "metadata" => &self.metadata.deletes,
            "config" => &self.config.deletes,
            _ => &[],
        }
    }
}

/// Normalise a layer reference to its last two `/`-separated segments.
///
/// References containing `:` (e.g. `interface:mysql`, URLs) are returned
/// unchanged.
pub fn two_segment(reference: &str) -> String {
    if reference.contains(':') {
        return reference.to_owned();
    }
    let segments: Vec<&str> = reference
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    let tail = segments.len().saturating_sub(2);
    match segments.get(tail..) {
        Some(last) if !last.is_empty() => last.join("/"),
        _ => reference.to_owned(),
    }
}
