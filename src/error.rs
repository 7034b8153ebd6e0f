//! Error types for tabtrain

use thiserror::Error;

/// Result type alias for tabtrain operations
pub type Result<T> = std::result::Result<T, TabtrainError>;

/// Main error type for the crate
///
/// Every public operation reports one of these. None of them is fatal: the
/// session stays usable for the next request after any failure.
#[derive(Error, Debug)]
pub enum TabtrainError {
    /// Malformed upload or a table that cannot be parsed as rectangular delimited text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid target variable: {0}")]
    InvalidTarget(String),

    #[error("No dataset loaded")]
    NoDatasetLoaded,

    /// A roster member failed to fit; nothing from the run was persisted
    #[error("Training failed for {model}: {reason}")]
    TrainingFailure { model: String, reason: String },

    #[error("No model trained")]
    NoModelTrained,

    #[error("Prediction failed: {0}")]
    PredictionFailure(String),

    /// Registry slot is empty
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl TabtrainError {
    /// Wrap an estimator error as a training failure for the named roster member
    pub fn training(model: impl Into<String>, err: impl std::fmt::Display) -> Self {
        TabtrainError::TrainingFailure {
            model: model.into(),
            reason: err.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for TabtrainError {
    fn from(err: polars::error::PolarsError) -> Self {
        TabtrainError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for TabtrainError {
    fn from(err: serde_json::Error) -> Self {
        TabtrainError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for TabtrainError {
    fn from(err: bincode::Error) -> Self {
        TabtrainError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TabtrainError {
    fn from(err: ndarray::ShapeError) -> Self {
        TabtrainError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
