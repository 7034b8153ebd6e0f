//! Inference engine implementation
//!
//! Loads the latest schema and model from the registry on every call, so a
//! new training run is picked up without a restart.

use crate::error::{Result, TabtrainError};
use crate::preprocessing::{ClassLabel, FeatureSchema, Record};
use crate::registry::{self, ModelRegistry};
use crate::training::ModelKind;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Inference statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_predictions: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
}

/// Single-record classification against the registry
pub struct InferenceEngine {
    registry: Arc<dyn ModelRegistry>,
    total_predictions: AtomicU64,
    error_count: AtomicU64,
    total_latency_us: AtomicU64,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("total_predictions", &self.total_predictions.load(Ordering::Relaxed))
            .finish()
    }
}

impl InferenceEngine {
    pub fn new(registry: Arc<dyn ModelRegistry>) -> Self {
        Self {
            registry,
            total_predictions: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
        }
    }

    /// Feature names of the latest run, in model input order
    pub fn feature_names(&self) -> Result<Vec<String>> {
        Ok(self.schema()?.names())
    }

    pub fn schema(&self) -> Result<FeatureSchema> {
        registry::load_schema(self.registry.as_ref())
    }

    /// Classify `record` with the default model
    pub fn predict(&self, record: &Record) -> Result<ClassLabel> {
        self.predict_with(ModelKind::DEFAULT, record)
    }

    /// Classify `record` with a specific roster model
    pub fn predict_with(&self, kind: ModelKind, record: &Record) -> Result<ClassLabel> {
        let start = Instant::now();
        let result = self.predict_inner(kind, record);

        self.total_predictions.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
        if result.is_err() {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn predict_inner(&self, kind: ModelKind, record: &Record) -> Result<ClassLabel> {
        let schema = self.schema()?;
        let model = registry::load_model(self.registry.as_ref(), kind)?;

        if !model.matches_schema(&schema) {
            return Err(TabtrainError::PredictionFailure(format!(
                "{} was trained with a different feature schema",
                kind
            )));
        }

        let row = schema.align(record)?;
        if !row.substituted.is_empty() {
            debug!(
                model = %kind,
                missing = ?row.substituted,
                "Features missing from record, placeholder substituted"
            );
        }

        model.predict_row(&row.values)
    }

    pub fn stats(&self) -> InferenceStats {
        let total = self.total_predictions.load(Ordering::Relaxed);
        let latency_us = self.total_latency_us.load(Ordering::Relaxed);
        InferenceStats {
            total_predictions: total,
            error_count: self.error_count.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 {
                latency_us as f64 / total as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}
