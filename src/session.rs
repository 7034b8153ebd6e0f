//! The upload, train and predict workflow behind one handle
//!
//! A [`Session`] owns the current dataset and reaches trained models through
//! a registry. It moves between four states:
//!
//! ```text
//! Empty --upload--> DataLoaded --train--> Trained
//!                        ^                   |
//!                        +------upload-------+
//! ```
//!
//! Failures never change state. Uploading after training keeps the previous
//! models available for prediction until the next successful train.

use crate::data::{DatasetStore, TableLoader};
use crate::error::Result;
use crate::inference::{InferenceEngine, InferenceStats};
use crate::preprocessing::{ClassLabel, Record};
use crate::registry::{ArtifactKey, ModelRegistry};
use crate::training::{ModelKind, TrainEngine, TrainingConfig, TrainingResult};
use serde::Serialize;
use std::sync::Arc;

/// What the session can currently do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub dataset_loaded: bool,
    pub model_trained: bool,
}

pub struct Session {
    loader: TableLoader,
    dataset: DatasetStore,
    trainer: TrainEngine,
    inference: InferenceEngine,
    registry: Arc<dyn ModelRegistry>,
}

impl Session {
    pub fn new(registry: Arc<dyn ModelRegistry>, config: TrainingConfig) -> Self {
        Self {
            loader: TableLoader::new(),
            dataset: DatasetStore::new(),
            trainer: TrainEngine::new(config, registry.clone()),
            inference: InferenceEngine::new(registry.clone()),
            registry,
        }
    }

    /// Use a custom table loader (e.g. another delimiter)
    pub fn with_loader(mut self, loader: TableLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Parse `content` and make it the current dataset; returns its column names
    pub fn upload(&self, content: &[u8]) -> Result<Vec<String>> {
        let table = self.loader.parse(content)?;
        let columns = table.column_names();
        self.dataset.replace(table);
        Ok(columns)
    }

    /// Train the roster on the current dataset against `target_column`
    pub fn train(&self, target_column: &str) -> Result<TrainingResult> {
        self.trainer.train_all(&self.dataset, target_column)
    }

    /// Feature names of the latest successful training run
    pub fn features(&self) -> Result<Vec<String>> {
        self.inference.feature_names()
    }

    /// Classify `record` with the default model
    pub fn predict(&self, record: &Record) -> Result<ClassLabel> {
        self.inference.predict(record)
    }

    pub fn predict_with(&self, kind: ModelKind, record: &Record) -> Result<ClassLabel> {
        self.inference.predict_with(kind, record)
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            dataset_loaded: self.dataset.is_loaded(),
            model_trained: self.registry.contains(ArtifactKey::FeatureSchema),
        }
    }

    pub fn inference_stats(&self) -> InferenceStats {
        self.inference.stats()
    }

    pub fn training_config(&self) -> &TrainingConfig {
        self.trainer.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TabtrainError;
    use crate::preprocessing::FieldValue;
    use crate::registry::MemoryModelRegistry;

    fn session() -> Session {
        Session::new(
            Arc::new(MemoryModelRegistry::new()),
            TrainingConfig::default().with_n_estimators(10).with_boosting_rounds(10),
        )
    }

    #[test]
    fn test_state_transitions() {
        let s = session();
        assert_eq!(
            s.state(),
            SessionState { dataset_loaded: false, model_trained: false }
        );

        assert!(matches!(s.train("y"), Err(TabtrainError::NoDatasetLoaded)));

        s.upload(b"x;y\n1;a\n2;b\n3;a\n4;b\n").unwrap();
        assert!(s.state().dataset_loaded);
        assert!(!s.state().model_trained);
        assert!(matches!(s.features(), Err(TabtrainError::NoModelTrained)));

        s.train("y").unwrap();
        assert!(s.state().model_trained);

        // A new upload keeps the trained models
        s.upload(b"other;cols\n1;2\n").unwrap();
        assert_eq!(s.features().unwrap(), vec!["x"]);
    }

    #[test]
    fn test_failed_upload_keeps_dataset() {
        let s = session();
        s.upload(b"x;y\n1;a\n2;b\n3;a\n").unwrap();
        assert!(s.upload(b"").is_err());
        assert!(s.train("y").is_ok());
    }

    #[test]
    fn test_predict_with_named_model() {
        let s = session();
        s.upload(b"x;y\n1;a\n2;a\n3;a\n10;b\n11;b\n12;b\n").unwrap();
        s.train("y").unwrap();

        let record: Record = [("x".to_string(), FieldValue::from("2"))].into_iter().collect();
        for kind in ModelKind::ROSTER {
            let label = s.predict_with(kind, &record).unwrap();
            assert!(label == ClassLabel::from("a") || label == ClassLabel::from("b"));
        }
    }
}
