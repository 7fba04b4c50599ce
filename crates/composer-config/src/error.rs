//! Error types for composer-config.

/// Errors produced while loading or manipulating configuration documents.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// A configuration document failed to parse.
    #[error("malformed configuration at {path}: {source}")]
    Malformed {
        path: String,
        source: serde_yaml::Error,
    },

    /// A document could not be serialized back to YAML.
    #[error("cannot serialize {path}: {source}")]
    Serialize {
        path: String,
        source: serde_yaml::Error,
    },

    /// A `deletes` dotted path traverses a key that does not exist or is
    /// not a mapping.
    #[error("invalid delete path `{path}`: {reason}")]
    InvalidDelete { path: String, reason: String },
}
