//! Error taxonomy for the composition engine.

/// Errors produced while composing a charm. Each variant maps to a process
/// exit code via [`EngineError::exit_code`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] composer_util::UtilError),

    /// A configuration document failed to load or a delete path was
    /// invalid.
    #[error("{0}")]
    Config(#[from] composer_config::ConfigError),

    /// A layer or interface reference could not be resolved.
    #[error("{0}")]
    Fetch(#[from] composer_fetch::FetchError),

    /// The include graph contains a cycle.
    #[error("layer include graph contains a cycle through `{reference}`")]
    CyclicLayerGraph { reference: String },

    /// The top layer carries no usable `composer.yaml`.
    #[error("the top layer `{reference}` needs a valid composer.yaml")]
    TopLayerNotConfigured { reference: String },

    /// Interfaces were included but no `metadata.yaml` reached the plan.
    #[error("interfaces were included but the plan produces no metadata.yaml")]
    MissingMetadata,

    /// The manifest file failed to parse or serialize.
    #[error("invalid manifest at {path}: {source}")]
    ManifestFormat {
        path: String,
        source: serde_json::Error,
    },

    /// The delta detector found differences and `--force` was not given.
    #[error(
        "unexpected modifications in the output directory \
         ({} added, {} changed, {} deleted); re-run with --force to overwrite",
        .added.len(),
        .changed.len(),
        .deleted.len()
    )]
    UnexpectedModifications {
        added: Vec<String>,
        changed: Vec<String>,
        deleted: Vec<String>,
    },

    /// An external installer invocation failed.
    #[error("`{command}` failed with code {code}: {output}")]
    SubprocessFailure {
        command: String,
        code: i32,
        output: String,
    },
}

impl EngineError {
    /// The process exit code mandated for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnexpectedModifications { .. } => 2,
            Self::SubprocessFailure { .. } => 3,
            _ => 1,
        }
    }
}
