//! Directory-backed registry
//!
//! Layout under the root directory:
//!
//! ```text
//! MANIFEST.json          -> names the live generation and its artifact files
//! gen-<id>/              -> one complete set of artifacts
//! .staging-<id>/         -> a publish in progress
//! ```
//!
//! A publish writes a fresh generation into a staging directory, renames it
//! into place and then swaps the manifest with a write-then-rename. Readers
//! resolve every slot through the manifest they read, so they only ever see
//! whole generations.

use super::{ArtifactKey, ModelRegistry};
use crate::error::{Result, TabtrainError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const MANIFEST_FILE: &str = "MANIFEST.json";
const GENERATION_PREFIX: &str = "gen-";
const STAGING_PREFIX: &str = ".staging-";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    generation: String,
    /// Slot name to file name inside the generation directory
    artifacts: BTreeMap<String, String>,
}

/// Registry persisted under a directory; survives restarts
#[derive(Debug)]
pub struct FsModelRegistry {
    root: PathBuf,
    /// Serializes publishers within this process
    publish_lock: Mutex<()>,
}

impl FsModelRegistry {
    /// Create or open a registry rooted at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let registry = Self {
            root,
            publish_lock: Mutex::new(()),
        };
        registry.remove_stale_dirs()?;
        debug!(root = %registry.root.display(), "Model registry opened");
        Ok(registry)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_manifest(&self) -> Result<Option<Manifest>> {
        match fs::read(self.root.join(MANIFEST_FILE)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        let final_path = self.root.join(MANIFEST_FILE);
        let temp_path = self
            .root
            .join(format!("{}.tmp-{}", MANIFEST_FILE, Uuid::new_v4().simple()));

        let bytes = serde_json::to_vec_pretty(manifest)?;
        if let Err(e) = write_synced(&temp_path, &bytes).and_then(|_| {
            fs::rename(&temp_path, &final_path).map_err(TabtrainError::from)
        }) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        sync_dir(&self.root);
        Ok(())
    }

    /// Leftovers of interrupted publishes: staging dirs, orphaned generations, temp manifests
    fn remove_stale_dirs(&self) -> Result<()> {
        let live = self.read_manifest()?.map(|m| m.generation);

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();

            let stale = name.starts_with(STAGING_PREFIX)
                || (name.starts_with(GENERATION_PREFIX) && live.as_deref() != Some(name.as_str()))
                || name.starts_with(&format!("{}.tmp-", MANIFEST_FILE));
            if !stale {
                continue;
            }

            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match removed {
                Ok(()) => debug!(path = %path.display(), "Removed stale registry entry"),
                Err(e) => warn!(path = %path.display(), error = %e, "Could not remove stale registry entry"),
            }
        }
        Ok(())
    }

    fn stage_generation(
        &self,
        staging: &Path,
        previous: Option<&Manifest>,
        artifacts: Vec<(ArtifactKey, Vec<u8>)>,
    ) -> Result<BTreeMap<String, String>> {
        fs::create_dir(staging)?;
        let mut files = BTreeMap::new();

        // Slots this publish does not name are carried over from the live generation
        if let Some(prev) = previous {
            let prev_dir = self.root.join(&prev.generation);
            for (slot, file) in &prev.artifacts {
                if artifacts.iter().any(|(key, _)| key.slot_name() == slot) {
                    continue;
                }
                fs::copy(prev_dir.join(file), staging.join(file))?;
                files.insert(slot.clone(), file.clone());
            }
        }

        for (key, bytes) in artifacts {
            let file = key.file_name();
            write_synced(&staging.join(&file), &bytes)?;
            files.insert(key.slot_name().to_string(), file);
        }

        sync_dir(staging);
        Ok(files)
    }
}

impl ModelRegistry for FsModelRegistry {
    fn get(&self, key: ArtifactKey) -> Result<Vec<u8>> {
        let not_found = || TabtrainError::NotFound(key.to_string());

        let manifest = self.read_manifest()?.ok_or_else(not_found)?;
        let file = manifest.artifacts.get(key.slot_name()).ok_or_else(not_found)?;

        match fs::read(self.root.join(&manifest.generation).join(file)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    fn publish(&self, artifacts: Vec<(ArtifactKey, Vec<u8>)>) -> Result<()> {
        let _guard = self.publish_lock.lock();

        let previous = self.read_manifest()?;
        let id = Uuid::new_v4().simple().to_string();
        let generation = format!("{}{}", GENERATION_PREFIX, id);
        let staging = self.root.join(format!("{}{}", STAGING_PREFIX, id));
        let generation_dir = self.root.join(&generation);
        let n_artifacts = artifacts.len();

        let files = match self.stage_generation(&staging, previous.as_ref(), artifacts) {
            Ok(files) => files,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&staging, &generation_dir) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e.into());
        }

        let manifest = Manifest {
            generation: generation.clone(),
            artifacts: files,
        };
        if let Err(e) = self.write_manifest(&manifest) {
            let _ = fs::remove_dir_all(&generation_dir);
            return Err(e);
        }

        info!(generation = %generation, artifacts = n_artifacts, "Published model artifacts");

        if let Some(prev) = previous {
            let prev_dir = self.root.join(&prev.generation);
            if let Err(e) = fs::remove_dir_all(&prev_dir) {
                warn!(path = %prev_dir.display(), error = %e, "Could not remove previous generation");
            }
        }
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Best effort; not every platform can fsync a directory handle
fn sync_dir(path: &Path) {
    if let Ok(dir) = File::open(path) {
        let _ = dir.sync_all();
    }
}
