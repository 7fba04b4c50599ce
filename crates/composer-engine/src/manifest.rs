//! The `.composer.manifest` file: per-output-file origin, kind, and digest.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// File name of the manifest inside the output directory.
pub const MANIFEST_NAME: &str = ".composer.manifest";

/// Origin credited to files generated by the tool itself; the delta
/// detector never flags these as changed.
pub const COMPOSER_ORIGIN: &str = "composer";

/// Digest placeholder for the manifest's own entry.
pub const UNCHECKED: &str = "unchecked";

/// How an output file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Bytes copied unchanged from a layer.
    Static,
    /// Generated or merged content.
    Dynamic,
}

/// One manifest entry, serialized as a three-element JSON array
/// `[originName, kind, sha256Hex]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub String, pub Kind, pub String);

impl Signature {
    /// The layer (or `composer`) credited with the file.
    pub fn origin(&self) -> &str {
        &self.0
    }

    /// Whether the file was copied or generated.
    pub fn kind(&self) -> Kind {
        self.1
    }

    /// Hex SHA-256 of the produced content.
    pub fn sha256(&self) -> &str {
        &self.2
    }
}

/// The manifest: output-relative path → signature, keys sorted for
/// deterministic diffs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, Signature>,
}

impl Manifest {
    /// Record a signature for an output path.
    pub fn insert(&mut self, rel: impl Into<String>, signature: Signature) {
        self.entries.insert(rel.into(), signature);
    }

    /// Look up the signature for an output path.
    pub fn get(&self, rel: &str) -> Option<&Signature> {
        self.entries.get(rel)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Signature)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a manifest from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid
    /// manifest JSON.
    pub fn read(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| EngineError::ManifestFormat {
            path: path.display().to_string(),
            source,
        })
    }

    /// Write the manifest into `target_dir`, pretty-printed with sorted
    /// keys.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn write(&self, target_dir: &Path) -> Result<(), EngineError> {
        let path = target_dir.join(MANIFEST_NAME);
        let mut text =
            serde_json::to_string_pretty(self).map_err(|source| EngineError::ManifestFormat {
                path: path.display().to_string(),
                source,
            })?;
        text.push('\n');
        std::fs::write(&path, text).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
