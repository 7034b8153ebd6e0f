//! Application state management

use std::sync::Arc;

use crate::data::TableLoader;
use crate::error::Result;
use crate::registry::{FsModelRegistry, ModelRegistry};
use crate::session::Session;
use crate::training::TrainingConfig;

use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub session: Session,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// State backed by a registry under `config.models_dir`
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let registry: Arc<dyn ModelRegistry> = Arc::new(FsModelRegistry::open(&config.models_dir)?);
        Ok(Self::with_registry(config, registry, TrainingConfig::default()))
    }

    pub fn with_registry(
        config: &ServerConfig,
        registry: Arc<dyn ModelRegistry>,
        training: TrainingConfig,
    ) -> Self {
        let session = Session::new(registry, training)
            .with_loader(TableLoader::new().with_delimiter(config.csv_delimiter));
        Self {
            session,
            started_at: chrono::Utc::now(),
        }
    }
}
