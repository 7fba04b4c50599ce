//! Layers, interfaces, and the resolved chain.

use std::path::{Path, PathBuf};

use composer_config::{two_segment, InterfaceConfig, LayerConfig};
use composer_fetch::INTERFACE_PREFIX;

use crate::error::EngineError;

/// A resolved layer: its reference, local directory, and parsed
/// configuration.
#[derive(Debug, Clone)]
pub struct Layer {
    /// The reference string the layer was resolved from.
    pub url: String,
    /// The layer's exclusively-owned input directory.
    pub directory: PathBuf,
    /// The parsed `composer.yaml` (default when absent).
    pub config: LayerConfig,
}

impl Layer {
    /// Load a layer from its resolved directory.
    ///
    /// # Errors
    /// Returns an error if the layer's `composer.yaml` exists but cannot
    /// be parsed.
    pub fn load(url: impl Into<String>, directory: PathBuf) -> Result<Self, EngineError> {
        let url = url.into();
        if !directory.join("metadata.yaml").exists() {
            log::warn!("{url} has no metadata.yaml, is it a charm?");
        }
        let config = LayerConfig::from_dir(&directory)?;
        Ok(Self {
            url,
            directory,
            config,
        })
    }

    /// The layer's identity, used as the manifest origin and recorded in
    /// the output `composer.yaml`.
    ///
    /// Prefers the identity a previous composition recorded under `is`,
    /// which keeps in-place regeneration stable; otherwise normalises the
    /// reference to its last two segments.
    pub fn name(&self) -> String {
        match &self.config.is {
            Some(recorded) => recorded.clone(),
            None => two_segment(&self.url),
        }
    }
}

/// A resolved interface package.
#[derive(Debug, Clone)]
pub struct Interface {
    /// The reference string (`interface:mysql`).
    pub url: String,
    /// The interface name relations bind against.
    pub name: String,
    /// The interface's local directory.
    pub directory: PathBuf,
}

impl Interface {
    /// Load an interface from its resolved directory.
    ///
    /// The name comes from `interface.yaml` when present, otherwise from
    /// the reference itself.
    ///
    /// # Errors
    /// Returns an error if `interface.yaml` exists but cannot be parsed.
    pub fn load(url: impl Into<String>, directory: PathBuf) -> Result<Self, EngineError> {
        let url = url.into();
        let config = InterfaceConfig::from_dir(&directory)?;
        let name = match config.name {
            Some(name) => name,
            None => url
                .strip_prefix(INTERFACE_PREFIX)
                .unwrap_or(&url)
                .to_owned(),
        };
        Ok(Self {
            url,
            name,
            directory,
        })
    }
}

/// The resolved composition input: layers bottom → top, the fetched
/// interfaces, and the output directory the target layer names.
#[derive(Debug)]
pub struct LayerChain {
    pub layers: Vec<Layer>,
    pub interfaces: Vec<Interface>,
    pub target_dir: PathBuf,
}

impl LayerChain {
    /// The topmost (user-facing) layer.
    pub fn top(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// The identity recorded as `is` and used for top-layer origins.
    pub fn top_name(&self) -> String {
        self.top().map(Layer::name).unwrap_or_default()
    }
}

/// Canonicalise a directory for cycle/duplicate detection, falling back
/// to the path as given when canonicalisation fails.
pub(crate) fn canonical_key(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}
