//! Feature-schema contract
//!
//! Provides the mapping between raw columns and the positional feature
//! vectors models are fit on:
//! - Schema derivation and one-hot encoding of a training table
//! - Class label encoding for arbitrary target types
//! - Alignment of a raw prediction record to a stored schema

mod alignment;
mod encoder;
mod labels;

pub use alignment::{record_from_json, AlignedRow, FieldValue, Record, MISSING_PLACEHOLDER};
pub use encoder::{
    derive_schema_and_matrix, EncodedMatrix, Feature, FeatureSchema, FeatureSource, TargetVector,
};
pub use labels::{ClassLabel, LabelEncoder};
