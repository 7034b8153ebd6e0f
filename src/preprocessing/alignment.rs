//! Rebuilding a model input row from a raw record

use super::encoder::{FeatureSchema, FeatureSource};
use crate::error::{Result, TabtrainError};
use ndarray::{Array1, Array2, Axis};
use std::collections::HashMap;

/// Value substituted for features the record does not provide
pub const MISSING_PLACEHOLDER: f64 = f64::NAN;

/// A raw field value supplied by a prediction caller
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Field name to value mapping for a single prediction
pub type Record = HashMap<String, FieldValue>;

impl FieldValue {
    /// Absent values and blank strings both count as missing
    pub fn is_missing(&self) -> bool {
        match self {
            FieldValue::Missing => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn to_numeric(&self, feature: &str) -> Result<f64> {
        match self {
            FieldValue::Missing => Ok(MISSING_PLACEHOLDER),
            FieldValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FieldValue::Number(n) => Ok(*n),
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(MISSING_PLACEHOLDER);
                }
                if let Ok(n) = trimmed.parse::<f64>() {
                    return Ok(n);
                }
                match trimmed.to_ascii_lowercase().as_str() {
                    "true" => Ok(1.0),
                    "false" => Ok(0.0),
                    _ => Err(TabtrainError::PredictionFailure(format!(
                        "feature '{}' expects a number, got '{}'",
                        feature, s
                    ))),
                }
            }
        }
    }

    /// Category text used to match indicator features
    fn as_category(&self) -> Option<String> {
        match self {
            FieldValue::Missing => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Number(n) if n.fract() == 0.0 && n.is_finite() => {
                Some(format!("{}", *n as i64))
            }
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Text(s) => Some(s.clone()),
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Missing,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Missing),
            serde_json::Value::String(s) => FieldValue::Text(s),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Build a record from a JSON object body
pub fn record_from_json(map: serde_json::Map<String, serde_json::Value>) -> Record {
    map.into_iter()
        .map(|(name, value)| (name, FieldValue::from(value)))
        .collect()
}

/// A single input row laid out in schema order
#[derive(Debug, Clone)]
pub struct AlignedRow {
    pub values: Array1<f64>,
    /// Features filled with [`MISSING_PLACEHOLDER`]
    pub substituted: Vec<String>,
}

impl AlignedRow {
    /// The row as a `(1, n_features)` matrix
    pub fn to_matrix(&self) -> Array2<f64> {
        self.values.clone().insert_axis(Axis(0))
    }
}

impl FeatureSchema {
    /// Lay out `record` in schema order
    ///
    /// Each feature is looked up by its own name first. Indicator features not
    /// named in the record are derived from the raw categorical column when the
    /// record carries it. Anything else gets the missing placeholder.
    pub fn align(&self, record: &Record) -> Result<AlignedRow> {
        let mut values = Vec::with_capacity(self.len());
        let mut substituted = Vec::new();

        for feature in self.features() {
            let direct = record.get(&feature.name).filter(|v| !v.is_missing());
            if let Some(value) = direct {
                values.push(value.to_numeric(&feature.name)?);
                continue;
            }

            let derived = match &feature.source {
                FeatureSource::Indicator { column, category } => record
                    .get(column)
                    .and_then(FieldValue::as_category)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| if &v == category { 1.0 } else { 0.0 }),
                FeatureSource::Numeric { .. } => None,
            };

            match derived {
                Some(v) => values.push(v),
                None => {
                    values.push(MISSING_PLACEHOLDER);
                    substituted.push(feature.name.clone());
                }
            }
        }

        Ok(AlignedRow {
            values: Array1::from_vec(values),
            substituted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::encoder::Feature;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            "approved",
            vec![
                Feature {
                    name: "age".to_string(),
                    source: FeatureSource::Numeric { column: "age".to_string() },
                },
                Feature {
                    name: "city_NY".to_string(),
                    source: FeatureSource::Indicator {
                        column: "city".to_string(),
                        category: "NY".to_string(),
                    },
                },
                Feature {
                    name: "city_LA".to_string(),
                    source: FeatureSource::Indicator {
                        column: "city".to_string(),
                        category: "LA".to_string(),
                    },
                },
            ],
        )
        .unwrap()
    }

    fn record(fields: &[(&str, FieldValue)]) -> Record {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_align_by_feature_name() {
        let row = schema()
            .align(&record(&[
                ("city_LA", FieldValue::from("1")),
                ("age", FieldValue::from(31.0)),
                ("city_NY", FieldValue::from(false)),
            ]))
            .unwrap();
        assert_eq!(row.values.to_vec(), vec![31.0, 0.0, 1.0]);
        assert!(row.substituted.is_empty());
    }

    #[test]
    fn test_align_from_raw_column() {
        let row = schema()
            .align(&record(&[("age", "44".into()), ("city", "NY".into())]))
            .unwrap();
        assert_eq!(row.values.to_vec(), vec![44.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_fields_get_placeholder() {
        let row = schema()
            .align(&record(&[("city", "LA".into()), ("age", "".into())]))
            .unwrap();
        assert!(row.values[0].is_nan());
        assert_eq!(row.substituted, vec!["age"]);
        assert_eq!(row.to_matrix().dim(), (1, 3));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let row = schema()
            .align(&record(&[("zip", "10001".into())]))
            .unwrap();
        assert_eq!(row.values.len(), 3);
        assert_eq!(row.substituted.len(), 3);
    }

    #[test]
    fn test_non_numeric_value_fails() {
        let err = schema()
            .align(&record(&[("age", "forty".into())]))
            .unwrap_err();
        assert!(matches!(err, TabtrainError::PredictionFailure(_)));
    }

    #[test]
    fn test_record_from_json() {
        let body = serde_json::json!({"age": 30, "city": "NY", "note": null});
        let record = record_from_json(body.as_object().cloned().unwrap());
        assert_eq!(record["age"], FieldValue::Number(30.0));
        assert_eq!(record["note"], FieldValue::Missing);
    }
}
