//! Inference module
//!
//! Aligns a raw record to the stored feature schema and classifies it with a
//! persisted roster model.

mod engine;

pub use engine::{InferenceEngine, InferenceStats};
