//! Training engine
//!
//! Runs one complete training pass: derive the schema, split, fit every
//! roster member and publish the results as a single registry update.

use super::config::TrainingConfig;
use super::models::{FittedModel, ModelKind};
use super::split::{take_rows, train_test_split};
use crate::data::{DatasetStore, RawTable};
use crate::error::{Result, TabtrainError};
use crate::preprocessing::{derive_schema_and_matrix, ClassLabel};
use crate::registry::{self, ModelRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Where clients go once training succeeds
pub const PREDICTION_URL: &str = "/predict";

/// Acknowledgement of a successful training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingResult {
    pub prediction_url: String,
    pub target: String,
    pub feature_names: Vec<String>,
    pub n_train: usize,
    /// Rows set aside from fitting; not evaluated
    pub n_held_out: usize,
}

/// Fits the roster and persists it
pub struct TrainEngine {
    config: TrainingConfig,
    registry: Arc<dyn ModelRegistry>,
}

impl TrainEngine {
    pub fn new(config: TrainingConfig, registry: Arc<dyn ModelRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train against the store's current table
    pub fn train_all(&self, store: &DatasetStore, target_column: &str) -> Result<TrainingResult> {
        let table = store.current()?;
        self.train_table(&table, target_column)
    }

    /// Train every roster member on `table`
    ///
    /// If any member fails, nothing is written and the registry keeps the
    /// previous run.
    pub fn train_table(&self, table: &RawTable, target_column: &str) -> Result<TrainingResult> {
        let start = Instant::now();

        let (schema, x, y) = derive_schema_and_matrix(table, target_column)?;
        let split = train_test_split(x.nrows(), self.config.test_size, self.config.random_seed);

        let x_train = take_rows(&x, &split.train);
        let y_train: Vec<ClassLabel> = split.train.iter().map(|&i| y[i].clone()).collect();

        info!(
            target = %target_column,
            features = schema.len(),
            train_rows = split.train.len(),
            held_out_rows = split.held_out.len(),
            "Training roster"
        );

        let mut models = Vec::with_capacity(ModelKind::ROSTER.len());
        for kind in ModelKind::ROSTER {
            let model_start = Instant::now();
            let model = FittedModel::fit(kind, &self.config, &schema, &x_train, &y_train)
                .map_err(|e| {
                    warn!(model = %kind, error = %e, "Model failed to fit");
                    TabtrainError::training(kind.name(), e)
                })?;
            info!(
                model = %kind,
                secs = model_start.elapsed().as_secs_f64(),
                "Model fitted"
            );
            models.push(model);
        }

        registry::save_run(self.registry.as_ref(), &models, &schema)?;

        info!(
            target = %target_column,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Training run published"
        );

        Ok(TrainingResult {
            prediction_url: PREDICTION_URL.to_string(),
            target: target_column.to_string(),
            feature_names: schema.names(),
            n_train: split.train.len(),
            n_held_out: split.held_out.len(),
        })
    }
}
