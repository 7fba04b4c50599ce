#![forbid(unsafe_code)]
//! Parse and validate `composer.yaml` / `interface.yaml`, and the
//! structured-document merge algebra used by the serialized tactics.

pub mod document;
pub mod error;
pub mod interface;
pub mod layer;

pub use error::ConfigError;
pub use interface::InterfaceConfig;
pub use layer::{two_segment, LayerConfig};
