//! Depth-first expansion of `includes` into a bottom-up layer chain.

use std::collections::HashSet;
use std::path::PathBuf;

use composer_fetch::{Registry, INTERFACE_PREFIX};

use crate::error::EngineError;
use crate::layer::{canonical_key, Interface, Layer};

/// Resolve the include graph rooted at `top`.
///
/// Returns layers in bottom-up order (the rightmost entry is `top`) plus
/// the set of interfaces, deduplicated in first-occurrence order.
///
/// # Errors
/// Returns `UnresolvedLayer` when a reference cannot be fetched,
/// `CyclicLayerGraph` when the include graph revisits a directory on the
/// current expansion path, and configuration errors from layer loading.
pub fn resolve_chain(
    top: Layer,
    registry: &Registry,
) -> Result<(Vec<Layer>, Vec<Interface>), EngineError> {
    let mut layers = Vec::new();
    let mut interfaces: Vec<Interface> = Vec::new();
    let mut visiting = HashSet::new();
    let mut done = HashSet::new();

    expand(
        top,
        registry,
        &mut layers,
        &mut interfaces,
        &mut visiting,
        &mut done,
    )?;

    Ok((layers, interfaces))
}

fn expand(
    layer: Layer,
    registry: &Registry,
    layers: &mut Vec<Layer>,
    interfaces: &mut Vec<Interface>,
    visiting: &mut HashSet<PathBuf>,
    done: &mut HashSet<PathBuf>,
) -> Result<(), EngineError> {
    let key = canonical_key(&layer.directory);

    // A layer reached along several independent paths contributes once,
    // at its deepest (first) occurrence.
    if done.contains(&key) {
        log::debug!("skipping duplicate include `{}`", layer.url);
        return Ok(());
    }
    if !visiting.insert(key.clone()) {
        return Err(EngineError::CyclicLayerGraph {
            reference: layer.url.clone(),
        });
    }

    for include in layer.config.includes() {
        let dir = registry.resolve(&include)?;
        if include.starts_with(INTERFACE_PREFIX) {
            let iface = Interface::load(&include, dir)?;
            if !interfaces.iter().any(|i| i.url == iface.url) {
                interfaces.push(iface);
            }
        } else {
            let child = Layer::load(&include, dir)?;
            expand(child, registry, layers, interfaces, visiting, done)?;
        }
    }

    visiting.remove(&key);
    done.insert(key);
    layers.push(layer);
    Ok(())
}
