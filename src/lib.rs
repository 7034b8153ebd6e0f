//! tabtrain - train a roster of classifiers on one uploaded table
//!
//! This crate provides:
//! - Loading of a delimited table as the single active dataset
//! - One-hot feature schema derivation and record alignment
//! - Training of a random forest, a gradient boosting classifier and an SVM
//! - Atomic persistence of fitted models with the schema they were fit on
//! - Single-record prediction through a web server and CLI
//!
//! # Modules
//!
//! - [`data`] - Table parsing and the active dataset
//! - [`preprocessing`] - Feature schema, one-hot encoding, label encoding
//! - [`training`] - Classifiers, data split and the training engine
//! - [`registry`] - Model and schema persistence
//! - [`inference`] - Prediction against the stored schema
//! - [`session`] - Upload, train and predict workflow
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod data;
pub mod preprocessing;
pub mod training;
pub mod registry;
pub mod inference;
pub mod session;

// Services
pub mod server;
pub mod cli;

pub use error::{Result, TabtrainError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, TabtrainError};

    // Data
    pub use crate::data::{DatasetStore, RawTable, TableLoader};

    // Preprocessing
    pub use crate::preprocessing::{ClassLabel, FeatureSchema, FieldValue, Record};

    // Training
    pub use crate::training::{ModelKind, TrainEngine, TrainingConfig, TrainingResult};

    // Persistence
    pub use crate::registry::{FsModelRegistry, MemoryModelRegistry, ModelRegistry};

    // Inference
    pub use crate::inference::{InferenceEngine, InferenceStats};

    // Workflow
    pub use crate::session::{Session, SessionState};
}
