//! Feature schema derivation and one-hot encoding
//!
//! Numeric columns pass through as a single feature. Every other column is
//! replaced, in place, by one indicator feature per distinct category observed
//! in the table. Categories are emitted in first-observed order and indicator
//! features are named `<column>_<category>`.

use super::labels::ClassLabel;
use crate::data::RawTable;
use crate::error::{Result, TabtrainError};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Row-major encoded features, one row per table row
pub type EncodedMatrix = Array2<f64>;

/// Target values, row-aligned with the encoded matrix
pub type TargetVector = Vec<ClassLabel>;

/// Where a feature's value comes from in the raw record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureSource {
    /// Numeric column passed through unchanged
    Numeric { column: String },
    /// 1.0 when `column` equals `category`, 0.0 otherwise
    Indicator { column: String, category: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub source: FeatureSource,
}

/// Ordered feature names a trained model expects, fixed at training time
///
/// Model invocation is positional: position `i` of every vector handed to a
/// model trained with this schema must hold feature `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    target: String,
    features: Vec<Feature>,
}

impl FeatureSchema {
    pub fn new(target: impl Into<String>, features: Vec<Feature>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(features.len());
        for feature in &features {
            if !seen.insert(feature.name.as_str()) {
                return Err(TabtrainError::InvalidInput(format!(
                    "feature name '{}' is produced more than once",
                    feature.name
                )));
            }
        }
        Ok(Self {
            target: target.into(),
            features,
        })
    }

    /// Column the schema was derived against
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
    )
}

fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

fn text_values(series: &Series) -> Result<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Distinct non-null values in first-observed order
fn observed_categories(values: &[Option<String>]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .flatten()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}

fn target_labels(series: &Series) -> Result<TargetVector> {
    let name = series.name().to_string();
    let labels: Vec<Option<ClassLabel>> = match series.dtype() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map(ClassLabel::Integer))
            .collect(),
        DataType::Float32 | DataType::Float64 | DataType::UInt64 => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()).map(ClassLabel::Float))
            .collect(),
        _ => text_values(series)?
            .into_iter()
            .map(|v| v.map(ClassLabel::Text))
            .collect(),
    };

    let missing = labels.iter().filter(|l| l.is_none()).count();
    if missing > 0 {
        return Err(TabtrainError::InvalidInput(format!(
            "target column '{}' has {} missing values",
            name, missing
        )));
    }
    Ok(labels.into_iter().flatten().collect())
}

/// Derive the feature schema, encoded matrix and target vector for `target_column`
///
/// Pure function of its inputs. Fails with `InvalidTarget` when the column is
/// not in the table.
pub fn derive_schema_and_matrix(
    table: &RawTable,
    target_column: &str,
) -> Result<(FeatureSchema, EncodedMatrix, TargetVector)> {
    if !table.has_column(target_column) {
        return Err(TabtrainError::InvalidTarget(target_column.to_string()));
    }

    let frame = table.frame();
    let n_rows = frame.height();

    let mut features = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for column in frame.get_columns() {
        let name = column.name().to_string();
        if name == target_column {
            continue;
        }
        let series = column.as_materialized_series();

        if is_numeric(series.dtype()) {
            columns.push(numeric_values(series)?);
            features.push(Feature {
                name: name.clone(),
                source: FeatureSource::Numeric { column: name },
            });
        } else {
            let values = text_values(series)?;
            let categories = observed_categories(&values);
            debug!(column = %name, categories = categories.len(), "One-hot expanding column");

            for category in categories {
                columns.push(
                    values
                        .iter()
                        .map(|v| if v.as_deref() == Some(category.as_str()) { 1.0 } else { 0.0 })
                        .collect(),
                );
                features.push(Feature {
                    name: format!("{}_{}", name, category),
                    source: FeatureSource::Indicator {
                        column: name.clone(),
                        category,
                    },
                });
            }
        }
    }

    let schema = FeatureSchema::new(target_column, features)?;
    let matrix = Array2::from_shape_fn((n_rows, columns.len()), |(r, c)| columns[c][r]);

    let target_series = frame.column(target_column)?.as_materialized_series();
    let target = target_labels(target_series)?;

    Ok((schema, matrix, target))
}
