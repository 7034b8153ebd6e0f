//! In-process registry

use super::{ArtifactKey, ModelRegistry};
use crate::error::{Result, TabtrainError};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Registry held in memory; lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryModelRegistry {
    slots: RwLock<HashMap<ArtifactKey, Vec<u8>>>,
}

impl MemoryModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelRegistry for MemoryModelRegistry {
    fn get(&self, key: ArtifactKey) -> Result<Vec<u8>> {
        self.slots
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| TabtrainError::NotFound(key.to_string()))
    }

    fn publish(&self, artifacts: Vec<(ArtifactKey, Vec<u8>)>) -> Result<()> {
        // Single write lock, so readers see all of the batch or none of it
        self.slots.write().extend(artifacts);
        Ok(())
    }
}
