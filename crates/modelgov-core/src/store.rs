//! Manifest store - slot paths and atomic document I/O
//!
//! All named documents (candidate, active, previous-active, per-version
//! archives, registry state, ops-status sink) live in one models directory
//! and are persisted through [`write_atomic`]: temp file in the same
//! directory, durable flush, atomic rename. A crash mid-write leaves either
//! the fully-prior or the fully-new document, never a torn one.

use crate::error::{GovernanceError, Result, ResultExt};
use crate::manifest::Manifest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default candidate slot name, written by training collaborators
pub const DEFAULT_CANDIDATE_NAME: &str = "manifest_latest.json";

/// Default active slot name, read by the serving collaborator
pub const DEFAULT_ACTIVE_NAME: &str = "manifest_active.json";

/// Default previous-active slot name, the implicit rollback fallback
pub const DEFAULT_PREVIOUS_NAME: &str = "manifest_active_prev.json";

/// Named manifest slots inside the models directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Candidate,
    Active,
    PreviousActive,
}

/// Write a document atomically: temp file + `sync_all` + rename.
///
/// The temp name embeds the pid so a leftover from a crashed prior
/// invocation can never collide with or block a new run.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let dir = dir.unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let tmp = dir.join(format!(".{}.tmp.{}", name, std::process::id()));

    let mut file = fs::File::create(&tmp)
        .map_err(GovernanceError::from)
        .with_context(|| format!("creating temp file '{}'", tmp.display()))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)
        .map_err(GovernanceError::from)
        .with_context(|| format!("renaming into '{}'", path.display()))?;
    Ok(())
}

/// On-disk store of manifests and referenced model payload files
#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: PathBuf,
    candidate_name: String,
    active_name: String,
    previous_name: String,
}

impl ManifestStore {
    /// Store over a models directory with the default slot names
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_names(
            dir,
            DEFAULT_CANDIDATE_NAME,
            DEFAULT_ACTIVE_NAME,
            DEFAULT_PREVIOUS_NAME,
        )
    }

    /// Store with explicitly named slots
    pub fn with_names(
        dir: impl Into<PathBuf>,
        candidate: impl Into<String>,
        active: impl Into<String>,
        previous: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            candidate_name: candidate.into(),
            active_name: active.into(),
            previous_name: previous.into(),
        }
    }

    /// The models directory this store is rooted at
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path of a named slot
    pub fn path(&self, slot: Slot) -> PathBuf {
        let name = match slot {
            Slot::Candidate => &self.candidate_name,
            Slot::Active => &self.active_name,
            Slot::PreviousActive => &self.previous_name,
        };
        self.dir.join(name)
    }

    /// Path of the permanent per-version archive document
    pub fn archive_path(&self, version: &str) -> PathBuf {
        self.dir.join(format!("metadata_{}.json", version))
    }

    /// Whether a slot document exists
    pub fn exists(&self, slot: Slot) -> bool {
        self.path(slot).exists()
    }

    /// Whether a model payload file referenced by a manifest exists
    pub fn model_file_exists(&self, name: &str) -> bool {
        self.dir.join(name).is_file()
    }

    /// Read raw document bytes; missing file is a [`GovernanceError::ManifestMissing`]
    pub fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        if !path.exists() {
            return Err(GovernanceError::ManifestMissing(path.to_path_buf()));
        }
        fs::read(path)
            .map_err(GovernanceError::from)
            .with_context(|| format!("reading '{}'", path.display()))
    }

    /// Parse a document into a JSON value; unreadable JSON is fatal
    pub fn load_value(&self, path: &Path) -> Result<serde_json::Value> {
        let bytes = self.read_bytes(path)?;
        serde_json::from_slice(&bytes)
            .map_err(GovernanceError::from)
            .with_context(|| format!("parsing '{}'", path.display()))
    }

    /// Load a typed manifest; schema misfit here is fatal.
    ///
    /// Used for documents governance itself wrote (active, previous-active,
    /// archives). Candidates go through [`Manifest::from_value`] instead so
    /// a schema misfit becomes a validation failure.
    pub fn load_manifest(&self, path: &Path) -> Result<Manifest> {
        let bytes = self.read_bytes(path)?;
        serde_json::from_slice(&bytes)
            .map_err(GovernanceError::from)
            .with_context(|| format!("parsing manifest '{}'", path.display()))
    }

    /// Byte-copy a document into another slot, atomically at the destination.
    ///
    /// Copy, not move: the source document stays stable so repeat
    /// evaluations of the same candidate are idempotent.
    pub fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let bytes = self.read_bytes(from)?;
        write_atomic(to, &bytes)
    }

    /// Archive a manifest document under `metadata_<version>.json` unless an
    /// archive already exists. Archives are written once and never mutated.
    pub fn archive_if_absent(&self, version: &str, src: &Path) -> Result<()> {
        let dest = self.archive_path(version);
        if dest.exists() {
            return Ok(());
        }
        self.copy(src, &dest)
    }
}
