//! Per-file strategies and their four-phase contract.
//!
//! Every tactic runs through the same phases: `lint` validates input and
//! collects warnings, `read` caches inputs in memory (so in-place rebuilds
//! never observe a half-written target), `apply` produces output, and
//! `sign` reports `{relpath → (origin, kind, sha256)}` for the manifest.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use composer_config::{document, two_segment};
use serde_yaml::Value;

use crate::error::EngineError;
use crate::manifest::{Kind, Signature, MANIFEST_NAME};

/// Identifier of each built-in tactic, also the dispatch catalogue for a
/// layer's `tactics:` declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacticName {
    Manifest,
    Installer,
    Metadata,
    Config,
    Composer,
    Hook,
    Action,
    Copy,
}

/// The default dispatch order; the first tactic whose trigger matches
/// wins.
pub const DEFAULT_REGISTRY: &[TacticName] = &[
    TacticName::Manifest,
    TacticName::Installer,
    TacticName::Metadata,
    TacticName::Config,
    TacticName::Composer,
    TacticName::Hook,
    TacticName::Action,
    TacticName::Copy,
];

fn parent_of(rel: &str) -> Option<&str> {
    rel.rsplit_once('/').map(|(parent, _)| parent)
}

impl TacticName {
    /// Whether this tactic handles the given output-relative path.
    pub fn trigger(self, rel: &str) -> bool {
        match self {
            Self::Manifest => rel == MANIFEST_NAME,
            Self::Installer => rel.ends_with(".pypi"),
            Self::Metadata => rel == "metadata.yaml",
            Self::Config => rel == "config.yaml",
            Self::Composer => rel == "composer.yaml",
            Self::Hook => parent_of(rel) == Some("hooks"),
            Self::Action => parent_of(rel) == Some("actions"),
            Self::Copy => true,
        }
    }

    /// Resolve a dotted tactic path from a layer's `tactics:` list against
    /// the catalogue of named tactics the tool ships with.
    pub fn catalogue(dotted: &str) -> Option<Self> {
        let class = dotted.rsplit('.').next().unwrap_or(dotted);
        match class {
            "ManifestTactic" => Some(Self::Manifest),
            "InstallerTactic" => Some(Self::Installer),
            "MetadataYAML" => Some(Self::Metadata),
            "ConfigYAML" => Some(Self::Config),
            "ComposerYAML" => Some(Self::Composer),
            "HookTactic" => Some(Self::Hook),
            "ActionTactic" => Some(Self::Action),
            "CopyTactic" => Some(Self::Copy),
            _ => None,
        }
    }
}

/// Select the first matching tactic from `registry` for `rel`.
pub fn dispatch(registry: &[TacticName], rel: &str) -> Option<TacticName> {
    registry.iter().copied().find(|name| name.trigger(rel))
}

// ── Copy ────────────────────────────────────────────────────────────────

/// Verbatim copy preserving the executable bit.
#[derive(Debug)]
pub struct CopyTactic {
    pub entity: PathBuf,
    pub rel: String,
    pub origin: String,
    pub dest: PathBuf,
    is_dir: bool,
    content: Option<Vec<u8>>,
}

impl CopyTactic {
    pub fn new(entity: PathBuf, rel: String, origin: String, dest: PathBuf) -> Self {
        let is_dir = entity.is_dir();
        Self {
            entity,
            rel,
            origin,
            dest,
            is_dir,
            content: None,
        }
    }

    fn read(&mut self) -> Result<(), EngineError> {
        if self.is_dir {
            return Ok(());
        }
        let bytes = std::fs::read(&self.entity).map_err(|source| EngineError::Io {
            path: self.entity.display().to_string(),
            source,
        })?;
        self.content = Some(bytes);
        Ok(())
    }

    fn apply(&mut self) -> Result<(), EngineError> {
        if self.is_dir {
            composer_util::fs::ensure_dir(&self.dest)?;
            return Ok(());
        }
        log::debug!("copying {}: {}", self.origin, self.rel);
        composer_util::fs::copy_preserving(&self.entity, &self.dest)?;
        Ok(())
    }

    fn sign(&self) -> Result<BTreeMap<String, Signature>, EngineError> {
        if self.is_dir {
            return Ok(BTreeMap::new());
        }
        let sha = match &self.content {
            Some(bytes) => composer_util::hash::sha256_bytes(bytes),
            None => composer_util::hash::sha256_file(&self.dest)?,
        };
        let mut signatures = BTreeMap::new();
        signatures.insert(
            self.rel.clone(),
            Signature(self.origin.clone(), Kind::Static, sha),
        );
        Ok(signatures)
    }
}

// ── Serialized documents ────────────────────────────────────────────────

/// One layer's contribution to a merged document: its source file and the
/// deletes its effective config (the layer above) imposes.
#[derive(Debug)]
pub struct Stage {
    pub source: PathBuf,
    pub deletes: Vec<String>,
    data: Option<Value>,
}

impl Stage {
    pub fn new(source: PathBuf, deletes: Vec<String>) -> Self {
        Self {
            source,
            deletes,
            data: None,
        }
    }

    fn data(&self) -> Result<Value, EngineError> {
        match &self.data {
            Some(value) => Ok(value.clone()),
            None => Ok(document::load_yaml(&self.source)?),
        }
    }
}

/// Merged YAML document generation (`metadata.yaml`, `config.yaml`).
///
/// Stages accumulate bottom-up through `combine`; `apply` folds them:
/// deep-merge each stage's document, then strip that stage's deletes.
#[derive(Debug)]
pub struct SerializedTactic {
    pub rel: String,
    pub origin: String,
    pub dest: PathBuf,
    prefix: Option<String>,
    stages: Vec<Stage>,
    written: Option<String>,
}

impl SerializedTactic {
    pub fn new(
        rel: String,
        origin: String,
        dest: PathBuf,
        prefix: Option<String>,
        stage: Stage,
    ) -> Self {
        Self {
            rel,
            origin,
            dest,
            prefix,
            stages: vec![stage],
            written: None,
        }
    }

    /// Fold the stages into the final document without writing it. The
    /// planner uses this to enumerate relations from the merged metadata.
    ///
    /// # Errors
    /// Returns an error if a stage fails to load or a delete path is
    /// invalid.
    pub fn merged_document(&self) -> Result<Value, EngineError> {
        let mut merged = Value::Mapping(serde_yaml::Mapping::new());
        for stage in &self.stages {
            let data = stage.data()?;
            document::deep_merge(&mut merged, &data);
            for delete in &stage.deletes {
                document::delete_path(&mut merged, delete, self.prefix.as_deref())?;
            }
        }
        Ok(merged)
    }

    fn read(&mut self) -> Result<(), EngineError> {
        for stage in &mut self.stages {
            stage.data = Some(document::load_yaml(&stage.source)?);
        }
        Ok(())
    }

    fn apply(&mut self) -> Result<(), EngineError> {
        log::debug!("generating {}", self.rel);
        let merged = self.merged_document()?;
        let text = document::to_yaml_string(&merged, &self.rel)?;
        if let Some(parent) = self.dest.parent() {
            composer_util::fs::ensure_dir(parent)?;
        }
        std::fs::write(&self.dest, &text).map_err(|source| EngineError::Io {
            path: self.dest.display().to_string(),
            source,
        })?;
        self.written = Some(text);
        Ok(())
    }

    fn sign(&self) -> Result<BTreeMap<String, Signature>, EngineError> {
        let sha = match &self.written {
            Some(text) => composer_util::hash::sha256_bytes(text.as_bytes()),
            None => composer_util::hash::sha256_file(&self.dest)?,
        };
        let mut signatures = BTreeMap::new();
        signatures.insert(
            self.rel.clone(),
            Signature(self.origin.clone(), Kind::Dynamic, sha),
        );
        Ok(signatures)
    }
}

// ── composer.yaml rewrite ───────────────────────────────────────────────

/// Rewrites the top layer's `composer.yaml`: records the layer identity
/// under `is` and normalises `includes`; other keys pass through.
#[derive(Debug)]
pub struct ComposerTactic {
    pub entity: PathBuf,
    pub rel: String,
    pub origin: String,
    pub dest: PathBuf,
    top_identity: String,
    data: Option<Value>,
    written: Option<String>,
}

impl ComposerTactic {
    pub fn new(
        entity: PathBuf,
        rel: String,
        origin: String,
        dest: PathBuf,
        top_identity: String,
    ) -> Self {
        Self {
            entity,
            rel,
            origin,
            dest,
            top_identity,
            data: None,
            written: None,
        }
    }

    fn read(&mut self) -> Result<(), EngineError> {
        self.data = Some(document::load_yaml(&self.entity)?);
        Ok(())
    }

    fn rewritten(&self) -> Result<Value, EngineError> {
        let mut data = match &self.data {
            Some(value) => value.clone(),
            None => document::load_yaml(&self.entity)?,
        };
        if let Some(map) = data.as_mapping_mut() {
            if let Some(includes) = map.get("includes").cloned() {
                map.insert(Value::from("includes"), normalise_includes(&includes));
            }
            map.insert(Value::from("is"), Value::from(self.top_identity.clone()));
        }
        Ok(data)
    }

    fn apply(&mut self) -> Result<(), EngineError> {
        log::debug!("rewriting {}", self.rel);
        let data = self.rewritten()?;
        let text = document::to_yaml_string(&data, &self.rel)?;
        if let Some(parent) = self.dest.parent() {
            composer_util::fs::ensure_dir(parent)?;
        }
        std::fs::write(&self.dest, &text).map_err(|source| EngineError::Io {
            path: self.dest.display().to_string(),
            source,
        })?;
        self.written = Some(text);
        Ok(())
    }

    fn sign(&self) -> Result<BTreeMap<String, Signature>, EngineError> {
        let sha = match &self.written {
            Some(text) => composer_util::hash::sha256_bytes(text.as_bytes()),
            None => composer_util::hash::sha256_file(&self.dest)?,
        };
        let mut signatures = BTreeMap::new();
        signatures.insert(
            self.rel.clone(),
            Signature(self.origin.clone(), Kind::Dynamic, sha),
        );
        Ok(signatures)
    }
}

/// Normalise every include lacking a `:` to its two-segment form; scalars
/// are promoted to a sequence.
fn normalise_includes(includes: &Value) -> Value {
    let entries: Vec<Value> = match includes {
        Value::Sequence(seq) => seq.clone(),
        other => vec![other.clone()],
    };
    let normalised = entries
        .into_iter()
        .map(|entry| match entry.as_str() {
            Some(s) => Value::from(two_segment(s)),
            None => entry,
        })
        .collect();
    Value::Sequence(normalised)
}

// ── Hooks and actions ───────────────────────────────────────────────────

/// Hook and action handling: a copy that lints for common charm mistakes.
#[derive(Debug)]
pub struct HookTactic {
    copy: CopyTactic,
    /// Directories to search for a `.pre`/`.post` file's underlying hook:
    /// the owning layer first, then lower layers top-down.
    search_dirs: Vec<PathBuf>,
}

impl HookTactic {
    pub fn new(copy: CopyTactic, search_dirs: Vec<PathBuf>) -> Self {
        Self { copy, search_dirs }
    }

    fn lint(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.copy.is_dir {
            return warnings;
        }
        let rel = &self.copy.rel;
        if let Some(base) = rel
            .strip_suffix(".pre")
            .or_else(|| rel.strip_suffix(".post"))
        {
            let found = self.search_dirs.iter().any(|dir| dir.join(base).exists());
            if !found {
                warnings.push(format!(
                    "cannot divert hook {rel}: no underlying {base} in any layer"
                ));
            }
        } else if !composer_util::fs::is_executable(&self.copy.entity) {
            warnings.push(format!("hook {rel} is not executable"));
        }
        warnings
    }
}

// ── Manifest suppression ────────────────────────────────────────────────

/// The manifest is regenerated, never copied; every phase is a no-op.
#[derive(Debug)]
pub struct ManifestTactic {
    pub rel: String,
}

// ── Package installer ───────────────────────────────────────────────────

/// Installs the package named by a `.pypi` file into the target directory.
#[derive(Debug)]
pub struct InstallerTactic {
    pub entity: PathBuf,
    pub rel: String,
    pub target_dir: PathBuf,
    spec: Option<String>,
}

impl InstallerTactic {
    pub fn new(entity: PathBuf, rel: String, target_dir: PathBuf) -> Self {
        Self {
            entity,
            rel,
            target_dir,
            spec: None,
        }
    }

    fn lint(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.entity) {
            Ok(content) if content.trim().is_empty() => {
                vec![format!("{} names no package", self.rel)]
            }
            _ => Vec::new(),
        }
    }

    fn read(&mut self) -> Result<(), EngineError> {
        let content = std::fs::read_to_string(&self.entity).map_err(|source| EngineError::Io {
            path: self.entity.display().to_string(),
            source,
        })?;
        self.spec = Some(content.trim().to_owned());
        Ok(())
    }

    fn apply(&mut self) -> Result<(), EngineError> {
        let Some(spec) = self.spec.clone() else {
            return Ok(());
        };
        if spec.is_empty() {
            return Ok(());
        }
        let mut cmd = Command::new("pip3");
        cmd.arg("install").arg("--target").arg(&self.target_dir).arg(&spec);
        let output = composer_util::process::run_command(&mut cmd)?;
        if !output.success {
            let code = output.exit_code.unwrap_or(-1);
            let rendered_output = output.output();
            return Err(EngineError::SubprocessFailure {
                command: output.command,
                code,
                output: rendered_output,
            });
        }
        Ok(())
    }
}

// ── Interface copy ──────────────────────────────────────────────────────

#[derive(Debug)]
struct CachedFile {
    rel: String,
    bytes: Vec<u8>,
    executable: bool,
}

/// Copies an interface package under `hooks/relations/<name>/`.
#[derive(Debug)]
pub struct InterfaceCopyTactic {
    pub rel: String,
    pub origin: String,
    source_dir: PathBuf,
    dest_dir: PathBuf,
    files: Vec<CachedFile>,
    produced: Vec<(String, String)>,
}

impl InterfaceCopyTactic {
    /// `rel` is `hooks/relations/<interface-name>`.
    pub fn new(rel: String, origin: String, source_dir: PathBuf, dest_dir: PathBuf) -> Self {
        Self {
            rel,
            origin,
            source_dir,
            dest_dir,
            files: Vec::new(),
            produced: Vec::new(),
        }
    }

    fn read(&mut self) -> Result<(), EngineError> {
        let ignores = composer_util::IgnoreSet::builtin()?;
        self.files.clear();
        for entry in composer_util::fs::walk_sorted(&self.source_dir)? {
            if !entry.is_file() {
                continue;
            }
            let Some(rel) = composer_util::fs::rel_path(&entry, &self.source_dir) else {
                continue;
            };
            if ignores.matches(&rel) {
                continue;
            }
            let bytes = std::fs::read(&entry).map_err(|source| EngineError::Io {
                path: entry.display().to_string(),
                source,
            })?;
            self.files.push(CachedFile {
                rel,
                bytes,
                executable: composer_util::fs::is_executable(&entry),
            });
        }
        Ok(())
    }

    fn apply(&mut self) -> Result<(), EngineError> {
        composer_util::fs::ensure_dir(&self.dest_dir)?;
        self.produced.clear();

        for file in &self.files {
            let dest = self.dest_dir.join(&file.rel);
            let out_rel = format!("{}/{}", self.rel, file.rel);
            if dest.exists() {
                // Already present (a layer or a previous run put it there).
                self.produced
                    .push((out_rel, composer_util::hash::sha256_file(&dest)?));
                continue;
            }
            if let Some(parent) = dest.parent() {
                composer_util::fs::ensure_dir(parent)?;
            }
            std::fs::write(&dest, &file.bytes).map_err(|source| EngineError::Io {
                path: dest.display().to_string(),
                source,
            })?;
            if file.executable {
                composer_util::fs::make_executable(&dest)?;
            }
            self.produced
                .push((out_rel, composer_util::hash::sha256_bytes(&file.bytes)));
        }

        // The relation package must be importable.
        let init = self.dest_dir.join("__init__.py");
        if !init.exists() {
            std::fs::write(&init, b"").map_err(|source| EngineError::Io {
                path: init.display().to_string(),
                source,
            })?;
        }
        let init_rel = format!("{}/__init__.py", self.rel);
        if !self.produced.iter().any(|(rel, _)| *rel == init_rel) {
            self.produced
                .push((init_rel, composer_util::hash::sha256_file(&init)?));
        }
        Ok(())
    }

    fn sign(&self) -> Result<BTreeMap<String, Signature>, EngineError> {
        let mut signatures = BTreeMap::new();
        for (rel, sha) in &self.produced {
            signatures.insert(
                rel.clone(),
                Signature(self.origin.clone(), Kind::Static, sha.clone()),
            );
        }
        Ok(signatures)
    }
}

// ── Interface bind ──────────────────────────────────────────────────────

/// Relation lifecycle events every binding covers.
pub const RELATION_EVENTS: &[&str] = &["joined", "changed", "broken", "departed"];

/// Generates the four relation hooks delegating to the reactive
/// dispatcher.
#[derive(Debug)]
pub struct InterfaceBindTactic {
    pub rel: String,
    pub origin: String,
    relation: String,
    target_dir: PathBuf,
    scripts: Vec<(String, String)>,
}

impl InterfaceBindTactic {
    /// `rel` is the plan key (`hooks/<relation>-relation-joined`).
    pub fn new(rel: String, origin: String, relation: String, target_dir: PathBuf) -> Self {
        Self {
            rel,
            origin,
            relation,
            target_dir,
            scripts: Vec::new(),
        }
    }

    fn read(&mut self) -> Result<(), EngineError> {
        let body = format!(
            "#!/bin/sh\nset -e\nexec \"$(dirname \"$0\")/dispatch\" \"{}\"\n",
            self.relation
        );
        self.scripts = RELATION_EVENTS
            .iter()
            .map(|event| {
                (
                    format!("hooks/{}-relation-{event}", self.relation),
                    body.clone(),
                )
            })
            .collect();
        Ok(())
    }

    fn apply(&mut self) -> Result<(), EngineError> {
        if self.scripts.is_empty() {
            self.read()?;
        }
        for (rel, content) in &self.scripts {
            let dest = self.target_dir.join(rel);
            if let Some(parent) = dest.parent() {
                composer_util::fs::ensure_dir(parent)?;
            }
            std::fs::write(&dest, content).map_err(|source| EngineError::Io {
                path: dest.display().to_string(),
                source,
            })?;
            composer_util::fs::make_executable(&dest)?;
        }
        Ok(())
    }

    fn sign(&self) -> Result<BTreeMap<String, Signature>, EngineError> {
        let mut signatures = BTreeMap::new();
        for (rel, content) in &self.scripts {
            signatures.insert(
                rel.clone(),
                Signature(
                    self.origin.clone(),
                    Kind::Dynamic,
                    composer_util::hash::sha256_bytes(content.as_bytes()),
                ),
            );
        }
        Ok(signatures)
    }
}

// ── The tactic sum type ─────────────────────────────────────────────────

/// A planned per-file strategy.
#[derive(Debug)]
pub enum Tactic {
    Copy(CopyTactic),
    Serialized(SerializedTactic),
    Composer(ComposerTactic),
    Hook(HookTactic),
    Manifest(ManifestTactic),
    Installer(InstallerTactic),
    InterfaceCopy(InterfaceCopyTactic),
    InterfaceBind(InterfaceBindTactic),
}

impl Tactic {
    /// The plan key this tactic was stored under.
    pub fn rel(&self) -> &str {
        match self {
            Self::Copy(t) => &t.rel,
            Self::Serialized(t) => &t.rel,
            Self::Composer(t) => &t.rel,
            Self::Hook(t) => &t.copy.rel,
            Self::Manifest(t) => &t.rel,
            Self::Installer(t) => &t.rel,
            Self::InterfaceCopy(t) => &t.rel,
            Self::InterfaceBind(t) => &t.rel,
        }
    }

    /// The manifest origin this tactic signs with, when it signs at all.
    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::Copy(t) => Some(&t.origin),
            Self::Serialized(t) => Some(&t.origin),
            Self::Composer(t) => Some(&t.origin),
            Self::Hook(t) => Some(&t.copy.origin),
            Self::InterfaceCopy(t) => Some(&t.origin),
            Self::InterfaceBind(t) => Some(&t.origin),
            Self::Manifest(_) | Self::Installer(_) => None,
        }
    }

    /// Fold this tactic with the tactic previously planned for the same
    /// path. Serialized documents accumulate stages; everything else
    /// replaces.
    pub fn combine(self, previous: Tactic) -> Tactic {
        match (self, previous) {
            (Self::Serialized(mut new), Self::Serialized(prev)) => {
                let mut stages = prev.stages;
                stages.extend(new.stages.drain(..));
                new.stages = stages;
                Self::Serialized(new)
            }
            (new, _previous) => new,
        }
    }

    /// Validate input; returns warnings, never writes.
    ///
    /// # Errors
    /// Returns an error when the input cannot be inspected at all.
    pub fn lint(&self) -> Result<Vec<String>, EngineError> {
        match self {
            Self::Hook(t) => Ok(t.lint()),
            Self::Installer(t) => Ok(t.lint()),
            _ => Ok(Vec::new()),
        }
    }

    /// Cache inputs in memory.
    ///
    /// # Errors
    /// Returns an error if an input cannot be read or parsed.
    pub fn read(&mut self) -> Result<(), EngineError> {
        match self {
            Self::Copy(t) => t.read(),
            Self::Serialized(t) => t.read(),
            Self::Composer(t) => t.read(),
            Self::Hook(t) => t.copy.read(),
            Self::Manifest(_) => Ok(()),
            Self::Installer(t) => t.read(),
            Self::InterfaceCopy(t) => t.read(),
            Self::InterfaceBind(t) => t.read(),
        }
    }

    /// Produce output on disk.
    ///
    /// # Errors
    /// Returns an error if the output cannot be written, or
    /// `SubprocessFailure` from the installer.
    pub fn apply(&mut self) -> Result<(), EngineError> {
        match self {
            Self::Copy(t) => t.apply(),
            Self::Serialized(t) => t.apply(),
            Self::Composer(t) => t.apply(),
            Self::Hook(t) => t.copy.apply(),
            Self::Manifest(_) => Ok(()),
            Self::Installer(t) => t.apply(),
            Self::InterfaceCopy(t) => t.apply(),
            Self::InterfaceBind(t) => t.apply(),
        }
    }

    /// Report manifest signatures for everything this tactic produced.
    ///
    /// # Errors
    /// Returns an error if a produced file cannot be hashed.
    pub fn sign(&self) -> Result<BTreeMap<String, Signature>, EngineError> {
        match self {
            Self::Copy(t) => t.sign(),
            Self::Serialized(t) => t.sign(),
            Self::Composer(t) => t.sign(),
            Self::Hook(t) => t.copy.sign(),
            Self::Manifest(_) | Self::Installer(_) => Ok(BTreeMap::new()),
            Self::InterfaceCopy(t) => t.sign(),
            Self::InterfaceBind(t) => t.sign(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    // ── Dispatch ───────────────────────────────────────────────────

    #[test]
    fn dispatch_exact_paths() {
        assert_eq!(
            dispatch(DEFAULT_REGISTRY, "metadata.yaml"),
            Some(TacticName::Metadata)
        );
        assert_eq!(
            dispatch(DEFAULT_REGISTRY, "config.yaml"),
            Some(TacticName::Config)
        );
        assert_eq!(
            dispatch(DEFAULT_REGISTRY, "composer.yaml"),
            Some(TacticName::Composer)
        );
        assert_eq!(
            dispatch(DEFAULT_REGISTRY, ".composer.manifest"),
            Some(TacticName::Manifest)
        );
    }

    #[test]
    fn dispatch_hooks_and_actions_by_parent() {
        assert_eq!(
            dispatch(DEFAULT_REGISTRY, "hooks/install"),
            Some(TacticName::Hook)
        );
        assert_eq!(
            dispatch(DEFAULT_REGISTRY, "actions/backup"),
            Some(TacticName::Action)
        );
        // Only direct children of hooks/ are hooks.
        assert_eq!(
            dispatch(DEFAULT_REGISTRY, "hooks/relations/mysql/requires"),
            Some(TacticName::Copy)
        );
    }

    #[test]
    fn dispatch_nested_metadata_is_a_copy() {
        assert_eq!(
            dispatch(DEFAULT_REGISTRY, "sub/metadata.yaml"),
            Some(TacticName::Copy)
        );
    }

    #[test]
    fn dispatch_installer_by_extension() {
        assert_eq!(
            dispatch(DEFAULT_REGISTRY, "charmhelpers.pypi"),
            Some(TacticName::Installer)
        );
    }

    #[test]
    fn dispatch_falls_back_to_copy() {
        assert_eq!(
            dispatch(DEFAULT_REGISTRY, "README.md"),
            Some(TacticName::Copy)
        );
    }

    #[test]
    fn catalogue_resolves_dotted_paths() {
        assert_eq!(
            TacticName::catalogue("tactics.MetadataYAML"),
            Some(TacticName::Metadata)
        );
        assert_eq!(
            TacticName::catalogue("some.deep.module.CopyTactic"),
            Some(TacticName::Copy)
        );
        assert_eq!(TacticName::catalogue("tactics.NoSuchTactic"), None);
    }

    // ── Copy ───────────────────────────────────────────────────────

    fn copy_fixture(dir: &Path, name: &str, content: &[u8]) -> CopyTactic {
        let entity = dir.join("layer").join(name);
        fs::create_dir_all(entity.parent().unwrap()).unwrap();
        fs::write(&entity, content).unwrap();
        let dest = dir.join("out").join(name);
        CopyTactic::new(entity, name.to_owned(), "trusty/base".to_owned(), dest)
    }

    #[test]
    fn copy_produces_and_signs() {
        let tmp = tempfile::tempdir().unwrap();
        let mut tactic = copy_fixture(tmp.path(), "README.md", b"docs\n");
        tactic.read().unwrap();
        tactic.apply().unwrap();

        assert_eq!(fs::read(tmp.path().join("out/README.md")).unwrap(), b"docs\n");
        let signatures = tactic.sign().unwrap();
        let sig = signatures.get("README.md").unwrap();
        assert_eq!(sig.origin(), "trusty/base");
        assert_eq!(sig.kind(), Kind::Static);
        assert_eq!(sig.sha256(), composer_util::hash::sha256_bytes(b"docs\n"));
    }

    #[cfg(unix)]
    #[test]
    fn copy_preserves_executable_bit() {
        let tmp = tempfile::tempdir().unwrap();
        let mut tactic = copy_fixture(tmp.path(), "run.sh", b"#!/bin/sh\n");
        composer_util::fs::make_executable(&tactic.entity).unwrap();
        tactic.read().unwrap();
        tactic.apply().unwrap();
        assert!(composer_util::fs::is_executable(
            &tmp.path().join("out/run.sh")
        ));
    }

    #[test]
    fn copy_in_place_keeps_content() {
        let tmp = tempfile::tempdir().unwrap();
        let entity = tmp.path().join("README.md");
        fs::write(&entity, b"stay\n").unwrap();
        let mut tactic = CopyTactic::new(
            entity.clone(),
            "README.md".to_owned(),
            "trusty/b".to_owned(),
            entity.clone(),
        );
        tactic.read().unwrap();
        tactic.apply().unwrap();
        assert_eq!(fs::read(&entity).unwrap(), b"stay\n");
    }

    // ── Serialized ─────────────────────────────────────────────────

    #[test]
    fn serialized_merges_stages_and_deletes() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base-config.yaml");
        let top = tmp.path().join("top-config.yaml");
        fs::write(
            &base,
            "options:\n  vip:\n    default: ''\n  bind-address:\n    default: '0.0.0.0'\n",
        )
        .unwrap();
        fs::write(&top, "options:\n  port:\n    default: 3306\n").unwrap();

        let dest = tmp.path().join("out/config.yaml");
        let lower = SerializedTactic::new(
            "config.yaml".to_owned(),
            "trusty/mysql".to_owned(),
            dest.clone(),
            Some("options".to_owned()),
            Stage::new(base, vec!["vip".to_owned()]),
        );
        let upper = SerializedTactic::new(
            "config.yaml".to_owned(),
            "trusty/tester".to_owned(),
            dest.clone(),
            Some("options".to_owned()),
            Stage::new(top, Vec::new()),
        );

        let combined = Tactic::Serialized(upper).combine(Tactic::Serialized(lower));
        let Tactic::Serialized(mut tactic) = combined else {
            panic!("expected serialized tactic");
        };
        tactic.read().unwrap();
        tactic.apply().unwrap();

        let text = fs::read_to_string(&dest).unwrap();
        let value: Value = serde_yaml::from_str(&text).unwrap();
        let options = value.get("options").unwrap();
        assert!(options.get("bind-address").is_some());
        assert!(options.get("port").is_some());
        assert!(options.get("vip").is_none());

        let signatures = tactic.sign().unwrap();
        let sig = signatures.get("config.yaml").unwrap();
        assert_eq!(sig.origin(), "trusty/tester");
        assert_eq!(sig.kind(), Kind::Dynamic);
    }

    #[test]
    fn serialized_combine_keeps_top_origin() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("a.yaml");
        let top = tmp.path().join("b.yaml");
        fs::write(&base, "provides:\n  shared-db:\n    interface: mysql\n").unwrap();
        fs::write(&top, "provides:\n  storage:\n    interface: block\n").unwrap();

        let dest = tmp.path().join("out/metadata.yaml");
        let lower = SerializedTactic::new(
            "metadata.yaml".to_owned(),
            "trusty/mysql".to_owned(),
            dest.clone(),
            None,
            Stage::new(base, Vec::new()),
        );
        let upper = SerializedTactic::new(
            "metadata.yaml".to_owned(),
            "trusty/tester".to_owned(),
            dest,
            None,
            Stage::new(top, Vec::new()),
        );
        let Tactic::Serialized(tactic) =
            Tactic::Serialized(upper).combine(Tactic::Serialized(lower))
        else {
            panic!("expected serialized tactic");
        };

        assert_eq!(tactic.origin, "trusty/tester");
        let merged = tactic.merged_document().unwrap();
        let provides = merged.get("provides").unwrap();
        assert!(provides.get("shared-db").is_some());
        assert!(provides.get("storage").is_some());
    }

    #[test]
    fn serialized_invalid_delete_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("metadata.yaml");
        fs::write(&source, "name: x\n").unwrap();

        let tactic = SerializedTactic::new(
            "metadata.yaml".to_owned(),
            "trusty/x".to_owned(),
            tmp.path().join("out/metadata.yaml"),
            None,
            Stage::new(source, vec!["missing.nested.key".to_owned()]),
        );
        assert!(tactic.merged_document().is_err());
    }

    // ── Composer rewrite ───────────────────────────────────────────

    #[test]
    fn composer_rewrites_includes_and_identity() {
        let tmp = tempfile::tempdir().unwrap();
        let entity = tmp.path().join("composer.yaml");
        fs::write(
            &entity,
            "includes:\n  - deep/path/trusty/mysql\n  - interface:mysql\n",
        )
        .unwrap();

        let dest = tmp.path().join("out/composer.yaml");
        let mut tactic = ComposerTactic::new(
            entity,
            "composer.yaml".to_owned(),
            "trusty/b".to_owned(),
            dest.clone(),
            "trusty/b".to_owned(),
        );
        tactic.read().unwrap();
        tactic.apply().unwrap();

        let value: Value =
            serde_yaml::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
        assert_eq!(value.get("is").unwrap().as_str(), Some("trusty/b"));
        let includes = value.get("includes").unwrap().as_sequence().unwrap();
        assert_eq!(includes.first().unwrap().as_str(), Some("trusty/mysql"));
        assert_eq!(includes.get(1).unwrap().as_str(), Some("interface:mysql"));
    }

    #[test]
    fn composer_promotes_scalar_includes() {
        let tmp = tempfile::tempdir().unwrap();
        let entity = tmp.path().join("composer.yaml");
        fs::write(&entity, "includes: trusty/mysql\n").unwrap();

        let dest = tmp.path().join("out/composer.yaml");
        let mut tactic = ComposerTactic::new(
            entity,
            "composer.yaml".to_owned(),
            "trusty/tester".to_owned(),
            dest.clone(),
            "trusty/tester".to_owned(),
        );
        tactic.read().unwrap();
        tactic.apply().unwrap();

        let value: Value =
            serde_yaml::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
        let includes = value.get("includes").unwrap().as_sequence().unwrap();
        assert_eq!(includes.len(), 1);
    }

    #[test]
    fn composer_preserves_other_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let entity = tmp.path().join("composer.yaml");
        fs::write(&entity, "includes: [trusty/mysql]\nconfig:\n  deletes: [vip]\n").unwrap();

        let dest = tmp.path().join("out/composer.yaml");
        let mut tactic = ComposerTactic::new(
            entity,
            "composer.yaml".to_owned(),
            "trusty/tester".to_owned(),
            dest.clone(),
            "trusty/tester".to_owned(),
        );
        tactic.read().unwrap();
        tactic.apply().unwrap();

        let value: Value =
            serde_yaml::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
        let deletes = value
            .get("config")
            .unwrap()
            .get("deletes")
            .unwrap()
            .as_sequence()
            .unwrap();
        assert_eq!(deletes.first().unwrap().as_str(), Some("vip"));
    }

    // ── Hooks ──────────────────────────────────────────────────────

    #[cfg(unix)]
    #[test]
    fn hook_lint_warns_on_non_executable() {
        let tmp = tempfile::tempdir().unwrap();
        let entity = tmp.path().join("layer/hooks/install");
        fs::create_dir_all(entity.parent().unwrap()).unwrap();
        fs::write(&entity, b"#!/bin/sh\n").unwrap();

        let copy = CopyTactic::new(
            entity,
            "hooks/install".to_owned(),
            "trusty/x".to_owned(),
            tmp.path().join("out/hooks/install"),
        );
        let tactic = HookTactic::new(copy, vec![tmp.path().join("layer")]);
        let warnings = tactic.lint();
        assert_eq!(warnings.len(), 1);
        assert!(warnings.first().unwrap().contains("not executable"));
    }

    #[test]
    fn hook_lint_warns_on_orphan_pre() {
        let tmp = tempfile::tempdir().unwrap();
        let entity = tmp.path().join("layer/hooks/start.pre");
        fs::create_dir_all(entity.parent().unwrap()).unwrap();
        fs::write(&entity, b"echo pre\n").unwrap();

        let copy = CopyTactic::new(
            entity,
            "hooks/start.pre".to_owned(),
            "trusty/x".to_owned(),
            tmp.path().join("out/hooks/start.pre"),
        );
        let tactic = HookTactic::new(copy, vec![tmp.path().join("layer")]);
        let warnings = tactic.lint();
        assert_eq!(warnings.len(), 1);
        assert!(warnings.first().unwrap().contains("divert"));
    }

    #[test]
    fn hook_lint_accepts_pre_with_underlying_hook() {
        let tmp = tempfile::tempdir().unwrap();
        let lower = tmp.path().join("lower");
        fs::create_dir_all(lower.join("hooks")).unwrap();
        fs::write(lower.join("hooks/start"), b"#!/bin/sh\n").unwrap();

        let entity = tmp.path().join("layer/hooks/start.pre");
        fs::create_dir_all(entity.parent().unwrap()).unwrap();
        fs::write(&entity, b"echo pre\n").unwrap();

        let copy = CopyTactic::new(
            entity,
            "hooks/start.pre".to_owned(),
            "trusty/x".to_owned(),
            tmp.path().join("out/hooks/start.pre"),
        );
        let tactic = HookTactic::new(copy, vec![tmp.path().join("layer"), lower]);
        assert!(tactic.lint().is_empty());
    }

    // ── Installer ──────────────────────────────────────────────────

    #[test]
    fn installer_lint_warns_on_empty_spec() {
        let tmp = tempfile::tempdir().unwrap();
        let entity = tmp.path().join("deps.pypi");
        fs::write(&entity, "\n").unwrap();

        let tactic = InstallerTactic::new(
            entity,
            "deps.pypi".to_owned(),
            tmp.path().join("out"),
        );
        assert_eq!(tactic.lint().len(), 1);
    }

    #[test]
    fn installer_empty_spec_applies_as_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let entity = tmp.path().join("deps.pypi");
        fs::write(&entity, "").unwrap();

        let mut tactic = InstallerTactic::new(
            entity,
            "deps.pypi".to_owned(),
            tmp.path().join("out"),
        );
        tactic.read().unwrap();
        tactic.apply().unwrap();
        assert!(Tactic::Installer(tactic).sign().unwrap().is_empty());
    }

    // ── Interface copy & bind ──────────────────────────────────────

    #[test]
    fn interface_copy_materialises_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let iface = tmp.path().join("iface");
        fs::create_dir_all(&iface).unwrap();
        fs::write(iface.join("interface.yaml"), "name: mysql\n").unwrap();
        fs::write(iface.join("requires.py"), "# requires\n").unwrap();

        let mut tactic = InterfaceCopyTactic::new(
            "hooks/relations/mysql".to_owned(),
            "interface:mysql".to_owned(),
            iface,
            tmp.path().join("out/hooks/relations/mysql"),
        );
        tactic.read().unwrap();
        tactic.apply().unwrap();

        assert!(tmp
            .path()
            .join("out/hooks/relations/mysql/requires.py")
            .exists());
        assert!(tmp
            .path()
            .join("out/hooks/relations/mysql/__init__.py")
            .exists());

        let signatures = tactic.sign().unwrap();
        let init = signatures
            .get("hooks/relations/mysql/__init__.py")
            .unwrap();
        assert_eq!(init.origin(), "interface:mysql");
        assert_eq!(init.kind(), Kind::Static);
    }

    #[test]
    fn interface_copy_leaves_existing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let iface = tmp.path().join("iface");
        fs::create_dir_all(&iface).unwrap();
        fs::write(iface.join("requires.py"), "# fresh\n").unwrap();

        let dest = tmp.path().join("out/hooks/relations/mysql");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("requires.py"), "# kept\n").unwrap();

        let mut tactic = InterfaceCopyTactic::new(
            "hooks/relations/mysql".to_owned(),
            "interface:mysql".to_owned(),
            iface,
            dest.clone(),
        );
        tactic.read().unwrap();
        tactic.apply().unwrap();

        assert_eq!(fs::read(dest.join("requires.py")).unwrap(), b"# kept\n");
    }

    #[cfg(unix)]
    #[test]
    fn interface_bind_produces_four_executable_hooks() {
        let tmp = tempfile::tempdir().unwrap();
        let mut tactic = InterfaceBindTactic::new(
            "hooks/shared-db-relation-joined".to_owned(),
            "interface:mysql".to_owned(),
            "shared-db".to_owned(),
            tmp.path().to_path_buf(),
        );
        tactic.read().unwrap();
        tactic.apply().unwrap();

        for event in RELATION_EVENTS {
            let hook = tmp.path().join(format!("hooks/shared-db-relation-{event}"));
            assert!(hook.exists(), "missing {event} hook");
            assert!(composer_util::fs::is_executable(&hook));
            let body = fs::read_to_string(&hook).unwrap();
            assert!(body.contains("shared-db"));
            assert!(body.starts_with("#!/bin/sh"));
        }

        let signatures = tactic.sign().unwrap();
        assert_eq!(signatures.len(), 4);
        for sig in signatures.values() {
            assert_eq!(sig.kind(), Kind::Dynamic);
        }
    }

    // ── Combine ────────────────────────────────────────────────────

    #[test]
    fn combine_replaces_copies_with_higher_layer() {
        let tmp = tempfile::tempdir().unwrap();
        let lower = copy_fixture(tmp.path(), "hooks/start", b"base\n");
        let mut upper = copy_fixture(tmp.path(), "hooks/start", b"Overridden\n");
        upper.origin = "trusty/tester".to_owned();

        let combined = Tactic::Copy(upper).combine(Tactic::Copy(lower));
        assert_eq!(combined.origin(), Some("trusty/tester"));
    }
}
