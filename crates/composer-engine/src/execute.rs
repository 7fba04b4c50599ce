//! Four-phase plan execution and manifest assembly.

use std::path::Path;

use crate::error::EngineError;
use crate::manifest::{Kind, Manifest, Signature, COMPOSER_ORIGIN, MANIFEST_NAME, UNCHECKED};
use crate::plan::Plan;

/// Run the plan: lint → read → apply → sign, then write the manifest.
///
/// Lint warnings are logged and never abort. Errors during lint and read
/// abort before any file is written; errors during apply abort
/// immediately, leaving partial output for the next invocation's delta
/// detector.
///
/// # Errors
/// Returns the first phase error encountered.
pub fn execute(plan: &mut Plan, target_dir: &Path) -> Result<Manifest, EngineError> {
    let rels: Vec<String> = plan.rels().to_vec();

    // Phase 1: lint.
    for rel in &rels {
        if let Some(tactic) = plan.get(rel) {
            for warning in tactic.lint()? {
                log::warn!("{warning}");
            }
        }
    }

    // Phase 2: read. Every input is cached in memory before anything is
    // written, so in-place rebuilds never observe a half-written target.
    for rel in &rels {
        if let Some(tactic) = plan.get_mut(rel) {
            tactic.read()?;
        }
    }

    // Phase 3: apply.
    for rel in &rels {
        if let Some(tactic) = plan.get_mut(rel) {
            tactic.apply()?;
        }
    }

    // Phase 4: sign.
    let mut manifest = Manifest::default();
    for rel in &rels {
        if let Some(tactic) = plan.get(rel) {
            for (produced, signature) in tactic.sign()? {
                manifest.insert(produced, signature);
            }
        }
    }
    manifest.insert(
        MANIFEST_NAME,
        Signature(
            COMPOSER_ORIGIN.to_owned(),
            Kind::Dynamic,
            UNCHECKED.to_owned(),
        ),
    );
    manifest.write(target_dir)?;
    Ok(manifest)
}
