//! Comparing the on-disk output to a prior manifest.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::EngineError;
use crate::manifest::{Manifest, COMPOSER_ORIGIN, MANIFEST_NAME};

/// The classified difference between a manifest baseline and the files on
/// disk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Delta {
    /// Present on disk but absent from the baseline.
    pub added: BTreeSet<String>,
    /// Present in both with differing digests (locally generated
    /// `composer` entries excluded).
    pub changed: BTreeSet<String>,
    /// Present in the baseline but gone from disk.
    pub deleted: BTreeSet<String>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }

    /// Convert into the gating error.
    pub fn into_error(self) -> EngineError {
        EngineError::UnexpectedModifications {
            added: self.added.into_iter().collect(),
            changed: self.changed.into_iter().collect(),
            deleted: self.deleted.into_iter().collect(),
        }
    }
}

/// Compare `target_dir` against its `.composer.manifest`.
///
/// Returns `None` when no manifest exists (first composition into this
/// directory).
///
/// # Errors
/// Returns an error if the manifest is unreadable or a file cannot be
/// hashed.
pub fn detect(target_dir: &Path) -> Result<Option<Delta>, EngineError> {
    let manifest_path = target_dir.join(MANIFEST_NAME);
    if !manifest_path.exists() {
        return Ok(None);
    }
    let baseline = Manifest::read(&manifest_path)?;

    let mut current: BTreeMap<String, String> = BTreeMap::new();
    for entry in composer_util::fs::walk_sorted(target_dir)? {
        if !entry.is_file() {
            continue;
        }
        let Some(rel) = composer_util::fs::rel_path(&entry, target_dir) else {
            continue;
        };
        current.insert(rel, composer_util::hash::sha256_file(&entry)?);
    }

    let mut delta = Delta::default();
    for (rel, sha) in &current {
        let Some(signature) = baseline.get(rel) else {
            delta.added.insert(rel.clone());
            continue;
        };
        // Locally generated entries are the tool's own output; edits to
        // them are picked up by regeneration, not gated.
        if signature.origin() == COMPOSER_ORIGIN {
            continue;
        }
        if signature.sha256() != sha {
            delta.changed.insert(rel.clone());
        }
    }
    for (rel, _) in baseline.iter() {
        if !current.contains_key(rel) {
            delta.deleted.insert(rel.clone());
        }
    }

    Ok(Some(delta))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use crate::manifest::{Kind, Signature, UNCHECKED};

    use super::*;

    fn baseline_for(dir: &Path, entries: &[(&str, &str, &str)]) {
        let mut manifest = Manifest::default();
        for (rel, origin, content) in entries {
            fs::create_dir_all(dir.join(rel).parent().unwrap()).unwrap();
            fs::write(dir.join(rel), content).unwrap();
            manifest.insert(
                (*rel).to_owned(),
                Signature(
                    (*origin).to_owned(),
                    Kind::Static,
                    composer_util::hash::sha256_bytes(content.as_bytes()),
                ),
            );
        }
        manifest.insert(
            MANIFEST_NAME,
            Signature(
                COMPOSER_ORIGIN.to_owned(),
                Kind::Dynamic,
                UNCHECKED.to_owned(),
            ),
        );
        manifest.write(dir).unwrap();
    }

    #[test]
    fn no_manifest_means_no_delta() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(detect(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn clean_tree_is_empty_delta() {
        let tmp = tempfile::tempdir().unwrap();
        baseline_for(tmp.path(), &[("README.md", "trusty/b", "docs\n")]);

        let delta = detect(tmp.path()).unwrap().unwrap();
        assert!(delta.is_empty(), "delta was: {delta:?}");
    }

    #[test]
    fn edited_file_is_changed() {
        let tmp = tempfile::tempdir().unwrap();
        baseline_for(tmp.path(), &[("README.md", "trusty/b", "docs\n")]);
        fs::write(tmp.path().join("README.md"), "docs\ntampered\n").unwrap();

        let delta = detect(tmp.path()).unwrap().unwrap();
        assert!(delta.changed.contains("README.md"));
        assert!(delta.added.is_empty());
        assert!(delta.deleted.is_empty());
    }

    #[test]
    fn new_file_is_added() {
        let tmp = tempfile::tempdir().unwrap();
        baseline_for(tmp.path(), &[("README.md", "trusty/b", "docs\n")]);
        fs::write(tmp.path().join("extra.txt"), "new\n").unwrap();

        let delta = detect(tmp.path()).unwrap().unwrap();
        assert!(delta.added.contains("extra.txt"));
    }

    #[test]
    fn removed_file_is_deleted() {
        let tmp = tempfile::tempdir().unwrap();
        baseline_for(tmp.path(), &[("README.md", "trusty/b", "docs\n")]);
        fs::remove_file(tmp.path().join("README.md")).unwrap();

        let delta = detect(tmp.path()).unwrap().unwrap();
        assert!(delta.deleted.contains("README.md"));
    }

    #[test]
    fn composer_origin_changes_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        baseline_for(tmp.path(), &[("generated.txt", COMPOSER_ORIGIN, "v1\n")]);
        fs::write(tmp.path().join("generated.txt"), "v2\n").unwrap();

        let delta = detect(tmp.path()).unwrap().unwrap();
        assert!(delta.is_empty(), "delta was: {delta:?}");
    }

    #[test]
    fn manifest_itself_never_flags() {
        let tmp = tempfile::tempdir().unwrap();
        baseline_for(tmp.path(), &[("README.md", "trusty/b", "docs\n")]);

        // The manifest file exists on disk and its baseline sha is the
        // "unchecked" placeholder; it must not appear in any set.
        let delta = detect(tmp.path()).unwrap().unwrap();
        assert!(!delta.added.contains(MANIFEST_NAME));
        assert!(!delta.changed.contains(MANIFEST_NAME));
        assert!(!delta.deleted.contains(MANIFEST_NAME));
    }

    #[test]
    fn into_error_is_gated_exit_two() {
        let tmp = tempfile::tempdir().unwrap();
        baseline_for(tmp.path(), &[("README.md", "trusty/b", "docs\n")]);
        fs::write(tmp.path().join("README.md"), "tampered").unwrap();

        let delta = detect(tmp.path()).unwrap().unwrap();
        let err = delta.into_error();
        assert_eq!(err.exit_code(), 2);
    }
}
