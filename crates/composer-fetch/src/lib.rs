#![forbid(unsafe_code)]
//! Resolvers that turn a layer or interface reference into a local
//! directory.
//!
//! Resolvers are consulted in registration order; the first that claims a
//! reference wins. `Ok(None)` means "not mine", letting the registry fall
//! through to the next resolver.

use std::path::PathBuf;

pub mod local;
pub mod remote;

pub use local::{InterfaceSearch, RepoSearch};
pub use remote::RegistryLookup;

/// Prefix marking interface references (`interface:mysql`).
pub const INTERFACE_PREFIX: &str = "interface:";

/// Errors produced while resolving references.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// No registered resolver accepted the reference.
    #[error("cannot resolve layer reference `{reference}`")]
    Unresolved { reference: String },

    /// An HTTP request failed.
    #[error("registry request for {url} failed: {message}")]
    Http { url: String, message: String },

    /// The registry answered with something other than the expected JSON.
    #[error("unexpected registry response from {url}: {message}")]
    BadResponse { url: String, message: String },

    /// A git clone failed.
    #[error("cannot clone {url}: {output}")]
    Git { url: String, output: String },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] composer_util::UtilError),
}

/// A pluggable resolver: reference string in, local directory out.
pub trait Fetcher {
    /// Try to resolve `reference`; `Ok(None)` when this resolver does not
    /// claim it.
    ///
    /// # Errors
    /// Returns an error when the resolver claims the reference but fails
    /// to materialise it.
    fn fetch(&self, reference: &str) -> Result<Option<PathBuf>, FetchError>;
}

/// An ordered collection of resolvers.
pub struct Registry {
    fetchers: Vec<Box<dyn Fetcher>>,
}

impl Registry {
    /// Build a registry from an explicit resolver list.
    pub fn new(fetchers: Vec<Box<dyn Fetcher>>) -> Self {
        Self { fetchers }
    }

    /// The standard resolver chain: local repository search, local
    /// interface search, then the remote interface registry cloning into
    /// `deps_dir`.
    pub fn standard(deps_dir: PathBuf) -> Self {
        Self::new(vec![
            Box::new(RepoSearch::from_env()),
            Box::new(InterfaceSearch::from_env()),
            Box::new(RegistryLookup::new(
                remote::DEFAULT_REGISTRY_URL.to_owned(),
                deps_dir,
            )),
        ])
    }

    /// Resolve a reference through the chain.
    ///
    /// # Errors
    /// Returns `Unresolved` if no resolver claims the reference, or the
    /// first claiming resolver's failure.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, FetchError> {
        for fetcher in &self.fetchers {
            if let Some(dir) = fetcher.fetch(reference)? {
                log::debug!("resolved `{reference}` to {}", dir.display());
                return Ok(dir);
            }
        }
        Err(FetchError::Unresolved {
            reference: reference.to_owned(),
        })
    }
}
