//! Building the plan: one tactic per output-relative path.

use std::collections::HashMap;
use std::path::PathBuf;

use composer_config::LayerConfig;
use composer_util::IgnoreSet;
use serde_yaml::Value;

use crate::error::EngineError;
use crate::layer::{canonical_key, Layer, LayerChain};
use crate::manifest::{Manifest, MANIFEST_NAME};
use crate::tactics::{
    dispatch, ComposerTactic, CopyTactic, HookTactic, InstallerTactic, InterfaceBindTactic,
    InterfaceCopyTactic, ManifestTactic, SerializedTactic, Stage, Tactic, TacticName,
    DEFAULT_REGISTRY,
};

/// An insertion-ordered map of output-relative path → tactic. Replacing an
/// entry keeps its original position so execution order is stable.
#[derive(Debug, Default)]
pub struct Plan {
    order: Vec<String>,
    tactics: HashMap<String, Tactic>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `tactic` under `rel`, folding it with any previous tactic at
    /// the same path via `combine`.
    pub fn insert(&mut self, rel: String, tactic: Tactic) {
        match self.tactics.remove(&rel) {
            Some(previous) => {
                if !matches!(
                    (&tactic, &previous),
                    (Tactic::Serialized(_), Tactic::Serialized(_))
                ) {
                    if let (Some(new), Some(old)) = (tactic.origin(), previous.origin()) {
                        if new != old {
                            log::warn!("{rel}: {new} overrides {old}");
                        }
                    }
                }
                self.tactics.insert(rel, tactic.combine(previous));
            }
            None => {
                self.order.push(rel.clone());
                self.tactics.insert(rel, tactic);
            }
        }
    }

    /// The planned paths in insertion order.
    pub fn rels(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, rel: &str) -> Option<&Tactic> {
        self.tactics.get(rel)
    }

    pub fn get_mut(&mut self, rel: &str) -> Option<&mut Tactic> {
        self.tactics.get_mut(rel)
    }

    /// Iterate tactics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Tactic> {
        self.order.iter().filter_map(|rel| self.tactics.get(rel))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Walk every layer bottom-up and build the plan, then append the
/// interface-derived tactics.
///
/// # Errors
/// Returns an error on unreadable layer directories, invalid ignore
/// patterns, or `MissingMetadata` when interfaces were fetched but no
/// `metadata.yaml` reached the plan.
pub fn formulate(chain: &LayerChain) -> Result<Plan, EngineError> {
    let mut plan = Plan::new();
    let target_key = canonical_key(&chain.target_dir);

    for (i, layer) in chain.layers.iter().enumerate() {
        log::info!("processing layer: {}", layer.name());
        // In-place regeneration: a layer walking its own previous output
        // must not claim files it merely inherited — the manifest knows
        // their true owners, and the owning layers contribute them anew.
        let baseline = if canonical_key(&layer.directory) == target_key {
            let manifest_path = layer.directory.join(MANIFEST_NAME);
            if manifest_path.exists() {
                Some(Manifest::read(&manifest_path)?)
            } else {
                None
            }
        } else {
            None
        };
        let next_config = chain.layers.get(i + 1).map(|l| &l.config);
        let ignore_patterns = next_config
            .map(|c| c.ignore.clone())
            .unwrap_or_default();
        let ignores = IgnoreSet::new(&ignore_patterns)?;
        let registry = layer_registry(&layer.config);
        let lower_dirs: Vec<PathBuf> = chain
            .layers
            .get(..i)
            .unwrap_or_default()
            .iter()
            .rev()
            .map(|l| l.directory.clone())
            .collect();

        for entry in composer_util::fs::walk_sorted(&layer.directory)? {
            let Some(rel) = composer_util::fs::rel_path(&entry, &layer.directory) else {
                continue;
            };
            if ignores.matches(&rel) {
                log::debug!("ignoring {}:{rel}", layer.name());
                continue;
            }
            if let Some(manifest) = &baseline {
                if let Some(signature) = manifest.get(&rel) {
                    if signature.origin() != layer.name() {
                        log::debug!("{rel} belongs to {}", signature.origin());
                        continue;
                    }
                }
            }
            let Some(name) = dispatch(&registry, &rel) else {
                continue;
            };
            let tactic = build_tactic(name, entry, &rel, layer, next_config, chain, &lower_dirs);
            plan.insert(rel, tactic);
        }
    }

    append_interfaces(&mut plan, chain)?;
    Ok(plan)
}

/// The dispatch registry for a layer: its catalogue-resolved custom
/// tactics prepended to the defaults.
fn layer_registry(config: &LayerConfig) -> Vec<TacticName> {
    let mut registry = Vec::new();
    for dotted in &config.tactics {
        match TacticName::catalogue(dotted) {
            Some(name) => registry.push(name),
            None => log::warn!("unknown tactic `{dotted}` is not in the catalogue — skipping"),
        }
    }
    registry.extend_from_slice(DEFAULT_REGISTRY);
    registry
}

fn build_tactic(
    name: TacticName,
    entity: PathBuf,
    rel: &str,
    layer: &Layer,
    next_config: Option<&LayerConfig>,
    chain: &LayerChain,
    lower_dirs: &[PathBuf],
) -> Tactic {
    let dest = chain.target_dir.join(rel);
    let origin = layer.name();
    let rel = rel.to_owned();

    match name {
        TacticName::Copy => Tactic::Copy(CopyTactic::new(entity, rel, origin, dest)),
        TacticName::Hook | TacticName::Action => {
            let mut search_dirs = vec![layer.directory.clone()];
            search_dirs.extend(lower_dirs.iter().cloned());
            Tactic::Hook(HookTactic::new(
                CopyTactic::new(entity, rel, origin, dest),
                search_dirs,
            ))
        }
        TacticName::Metadata => {
            let deletes = next_config
                .map(|c| c.deletes("metadata").to_vec())
                .unwrap_or_default();
            Tactic::Serialized(SerializedTactic::new(
                rel,
                origin,
                dest,
                None,
                Stage::new(entity, deletes),
            ))
        }
        TacticName::Config => {
            let deletes = next_config
                .map(|c| c.deletes("config").to_vec())
                .unwrap_or_default();
            Tactic::Serialized(SerializedTactic::new(
                rel,
                origin,
                dest,
                Some("options".to_owned()),
                Stage::new(entity, deletes),
            ))
        }
        TacticName::Composer => Tactic::Composer(ComposerTactic::new(
            entity,
            rel,
            origin,
            dest,
            chain.top_name(),
        )),
        TacticName::Manifest => Tactic::Manifest(ManifestTactic { rel }),
        TacticName::Installer => Tactic::Installer(InstallerTactic::new(
            entity,
            rel,
            chain.target_dir.clone(),
        )),
    }
}

/// Roles in `metadata.yaml` that declare relations.
const RELATION_ROLES: &[&str] = &["provides", "requires", "peer"];

/// Append `InterfaceCopy`/`InterfaceBind` tactics for every relation in
/// the merged metadata whose interface was fetched.
fn append_interfaces(plan: &mut Plan, chain: &LayerChain) -> Result<(), EngineError> {
    if chain.interfaces.is_empty() {
        return Ok(());
    }

    let merged = match plan.get("metadata.yaml") {
        Some(Tactic::Serialized(meta)) => meta.merged_document()?,
        _ => return Err(EngineError::MissingMetadata),
    };

    let mut used = std::collections::HashSet::new();
    for role in RELATION_ROLES {
        let Some(relations) = merged.get(*role).and_then(Value::as_mapping) else {
            continue;
        };
        for (relation, spec) in relations {
            let Some(relation) = relation.as_str() else {
                continue;
            };
            let Some(iface_name) = spec.get("interface").and_then(Value::as_str) else {
                continue;
            };
            let Some(iface) = chain.interfaces.iter().find(|i| i.name == iface_name) else {
                log::debug!("relation {relation} uses unfetched interface {iface_name}");
                continue;
            };
            used.insert(iface.name.clone());

            let copy_rel = format!("hooks/relations/{}", iface.name);
            plan.insert(
                copy_rel.clone(),
                Tactic::InterfaceCopy(InterfaceCopyTactic::new(
                    copy_rel.clone(),
                    iface.url.clone(),
                    iface.directory.clone(),
                    chain.target_dir.join(&copy_rel),
                )),
            );

            let bind_rel = format!("hooks/{relation}-relation-joined");
            plan.insert(
                bind_rel.clone(),
                Tactic::InterfaceBind(InterfaceBindTactic::new(
                    bind_rel,
                    iface.url.clone(),
                    relation.to_owned(),
                    chain.target_dir.clone(),
                )),
            );
        }
    }

    for iface in &chain.interfaces {
        if !used.contains(&iface.name) {
            log::warn!("interface `{}` matches no declared relation", iface.url);
        }
    }
    Ok(())
}
