#![forbid(unsafe_code)]
//! The charm composition engine: layer chain resolution, per-path tactic
//! dispatch, four-phase plan execution, and manifest-gated regeneration.

pub mod compose;
pub mod delta;
pub mod error;
pub mod execute;
pub mod layer;
pub mod manifest;
pub mod plan;
pub mod resolve;
pub mod tactics;

pub use compose::{compose, compose_with_registry, ComposeOptions, ComposeResult};
pub use delta::{detect, Delta};
pub use error::EngineError;
pub use layer::{Interface, Layer, LayerChain};
pub use manifest::{Kind, Manifest, Signature, COMPOSER_ORIGIN, MANIFEST_NAME, UNCHECKED};
pub use plan::{formulate, Plan};
pub use resolve::resolve_chain;
