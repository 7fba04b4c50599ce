//! The composition entry point: directory layout, delta gating, chain
//! resolution, planning, and execution.

use std::path::{Path, PathBuf};

use composer_fetch::Registry;

use crate::delta;
use crate::error::EngineError;
use crate::execute;
use crate::layer::{Layer, LayerChain};
use crate::plan;
use crate::resolve::resolve_chain;

/// Options controlling a single composition.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Path or reference to the top layer.
    pub charm: String,
    /// Destination base; `None` selects in-place mode.
    pub output_dir: Option<PathBuf>,
    /// Series directory under the output base.
    pub series: String,
    /// Name of the produced artefact; defaults to the charm's basename.
    pub name: Option<String>,
    /// Proceed despite delta-detector findings.
    pub force: bool,
}

impl ComposeOptions {
    pub fn new(charm: impl Into<String>) -> Self {
        Self {
            charm: charm.into(),
            output_dir: None,
            series: "trusty".to_owned(),
            name: None,
            force: false,
        }
    }
}

/// A successful composition.
#[derive(Debug)]
pub struct ComposeResult {
    /// The directory holding the composed charm.
    pub target_dir: PathBuf,
    /// Number of manifest entries written.
    pub files: usize,
}

#[derive(Debug)]
struct Layout {
    repo_dir: PathBuf,
    deps_dir: PathBuf,
    target_dir: PathBuf,
}

/// Normalise the charm argument to a concrete path when it names an
/// existing directory.
fn normalised_charm(charm: &str) -> PathBuf {
    let path = Path::new(charm);
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// The output base used when `-o` is absent: the grandparent of the
/// normalised charm path, so `<output>/<series>/<name>` coincides with
/// the charm directory under the default series and name.
fn default_output_base(charm: &str) -> PathBuf {
    let normalised = normalised_charm(charm);
    match normalised.parent().and_then(Path::parent) {
        Some(base) if !base.as_os_str().is_empty() => base.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// The artefact name used when `-n` is absent: the basename of the
/// normalised charm path.
pub fn default_name(charm: &str) -> String {
    let normalised = normalised_charm(charm);
    normalised
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .unwrap_or_else(|| charm.to_owned())
}

fn layout(options: &ComposeOptions) -> Layout {
    let output_base = options
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_base(&options.charm));
    let name = options
        .name
        .clone()
        .unwrap_or_else(|| default_name(&options.charm));
    let repo_dir = output_base.join(&options.series);
    Layout {
        target_dir: repo_dir.join(&name),
        deps_dir: output_base.join("deps").join(&options.series),
        repo_dir,
    }
}

/// Compose using the standard fetcher chain (local search paths plus the
/// remote interface registry).
///
/// # Errors
/// Returns the first composition error; see [`EngineError::exit_code`]
/// for the process exit code mapping.
pub fn compose(options: &ComposeOptions) -> Result<ComposeResult, EngineError> {
    let registry = Registry::standard(layout(options).deps_dir);
    compose_with_registry(options, &registry)
}

/// Compose with an explicit fetcher registry.
///
/// # Errors
/// Returns the first composition error encountered.
pub fn compose_with_registry(
    options: &ComposeOptions,
    registry: &Registry,
) -> Result<ComposeResult, EngineError> {
    let layout = layout(options);
    composer_util::fs::ensure_dir(&layout.repo_dir)?;
    composer_util::fs::ensure_dir(&layout.deps_dir)?;
    composer_util::fs::ensure_dir(&layout.target_dir)?;

    // Gate regeneration on user edits before anything else runs.
    if let Some(found) = delta::detect(&layout.target_dir)? {
        if !found.is_empty() {
            if options.force {
                log::warn!(
                    "overwriting local changes ({} added, {} changed, {} deleted)",
                    found.added.len(),
                    found.changed.len(),
                    found.deleted.len()
                );
            } else {
                return Err(found.into_error());
            }
        }
    }

    let top_dir = registry.resolve(&options.charm)?;
    let top_url = if Path::new(&options.charm).is_dir() {
        normalised_charm(&options.charm).display().to_string()
    } else {
        options.charm.clone()
    };
    let top = Layer::load(top_url, top_dir)?;
    if !top.config.configured() {
        return Err(EngineError::TopLayerNotConfigured {
            reference: options.charm.clone(),
        });
    }

    let (layers, interfaces) = resolve_chain(top, registry)?;
    let chain = LayerChain {
        layers,
        interfaces,
        target_dir: layout.target_dir.clone(),
    };

    let mut plan = plan::formulate(&chain)?;
    let manifest = execute::execute(&mut plan, &layout.target_dir)?;
    log::info!(
        "composed {} ({} files) into {}",
        chain.top_name(),
        manifest.len(),
        layout.target_dir.display()
    );

    Ok(ComposeResult {
        target_dir: layout.target_dir,
        files: manifest.len(),
    })
}
