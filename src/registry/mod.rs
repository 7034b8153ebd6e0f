//! Model registry
//!
//! Durable named storage for the artifacts of the latest successful training
//! run: one slot per roster model plus one for the feature schema. A run is
//! published as a whole, so readers never observe models from one run next to
//! the schema of another.

mod fs;
mod memory;

pub use fs::FsModelRegistry;
pub use memory::MemoryModelRegistry;

use crate::error::{Result, TabtrainError};
use crate::preprocessing::FeatureSchema;
use crate::training::{FittedModel, ModelKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Artifact slot name for the feature schema
pub const FEATURE_SCHEMA_SLOT: &str = "feature_names";

/// Named slot in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactKey {
    Model(ModelKind),
    FeatureSchema,
}

impl ArtifactKey {
    /// Every slot a complete training run fills
    pub fn all() -> Vec<ArtifactKey> {
        ModelKind::ROSTER
            .into_iter()
            .map(ArtifactKey::Model)
            .chain(std::iter::once(ArtifactKey::FeatureSchema))
            .collect()
    }

    pub fn slot_name(&self) -> &'static str {
        match self {
            ArtifactKey::Model(kind) => kind.name(),
            ArtifactKey::FeatureSchema => FEATURE_SCHEMA_SLOT,
        }
    }

    pub fn from_slot_name(name: &str) -> Option<Self> {
        if name == FEATURE_SCHEMA_SLOT {
            return Some(ArtifactKey::FeatureSchema);
        }
        name.parse::<ModelKind>().ok().map(ArtifactKey::Model)
    }

    /// File name used by on-disk registries
    pub fn file_name(&self) -> String {
        match self {
            ArtifactKey::Model(kind) => format!("{}.bin", kind.name()),
            ArtifactKey::FeatureSchema => format!("{}.json", FEATURE_SCHEMA_SLOT),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slot_name())
    }
}

/// Named artifact storage shared by training and inference
pub trait ModelRegistry: Send + Sync {
    /// Store one artifact, replacing the slot's previous content
    fn put(&self, key: ArtifactKey, artifact: Vec<u8>) -> Result<()> {
        self.publish(vec![(key, artifact)])
    }

    /// Read a slot; `NotFound` when it was never written
    fn get(&self, key: ArtifactKey) -> Result<Vec<u8>>;

    /// Replace all given slots in one step
    ///
    /// Readers see either every slot from before the call or every slot from
    /// after it. Slots not named in `artifacts` keep their content. On failure
    /// the previous content stays readable.
    fn publish(&self, artifacts: Vec<(ArtifactKey, Vec<u8>)>) -> Result<()>;

    fn contains(&self, key: ArtifactKey) -> bool {
        self.get(key).is_ok()
    }
}

/// Publish the models and schema of one training run
pub fn save_run(
    registry: &dyn ModelRegistry,
    models: &[FittedModel],
    schema: &FeatureSchema,
) -> Result<()> {
    let mut artifacts = Vec::with_capacity(models.len() + 1);
    for model in models {
        artifacts.push((ArtifactKey::Model(model.kind()), model.to_bytes()?));
    }
    artifacts.push((ArtifactKey::FeatureSchema, serde_json::to_vec_pretty(schema)?));
    registry.publish(artifacts)
}

/// Feature schema of the latest run
pub fn load_schema(registry: &dyn ModelRegistry) -> Result<FeatureSchema> {
    let bytes = registry
        .get(ArtifactKey::FeatureSchema)
        .map_err(not_found_as_untrained)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Fitted model of the latest run
pub fn load_model(registry: &dyn ModelRegistry, kind: ModelKind) -> Result<FittedModel> {
    let bytes = registry
        .get(ArtifactKey::Model(kind))
        .map_err(not_found_as_untrained)?;
    FittedModel::from_bytes(&bytes)
}

fn not_found_as_untrained(err: TabtrainError) -> TabtrainError {
    match err {
        TabtrainError::NotFound(_) => TabtrainError::NoModelTrained,
        other => other,
    }
}
