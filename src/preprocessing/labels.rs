//! Class labels and their mapping to the numeric targets estimators fit on

use crate::error::{Result, TabtrainError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A target value, kept in the type it was uploaded with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassLabel {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ClassLabel {
    fn rank(&self) -> u8 {
        match self {
            ClassLabel::Integer(_) => 0,
            ClassLabel::Float(_) => 1,
            ClassLabel::Text(_) => 2,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            ClassLabel::Integer(v) => Some(*v as f64),
            ClassLabel::Float(v) => Some(*v),
            ClassLabel::Text(_) => None,
        }
    }

    /// JSON rendering that keeps numbers as numbers
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ClassLabel::Integer(v) => serde_json::json!(v),
            ClassLabel::Float(v) => serde_json::json!(v),
            ClassLabel::Text(v) => serde_json::json!(v),
        }
    }
}

impl Ord for ClassLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a
                .total_cmp(&b)
                .then_with(|| self.rank().cmp(&other.rank())),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => match (self, other) {
                (ClassLabel::Text(a), ClassLabel::Text(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
        }
    }
}

impl PartialOrd for ClassLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ClassLabel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ClassLabel {}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Integer(v) => write!(f, "{}", v),
            ClassLabel::Float(v) => write!(f, "{}", v),
            ClassLabel::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for ClassLabel {
    fn from(value: &str) -> Self {
        ClassLabel::Text(value.to_string())
    }
}

impl From<i64> for ClassLabel {
    fn from(value: i64) -> Self {
        ClassLabel::Integer(value)
    }
}

/// Maps labels to class indices `0..n_classes` in sorted label order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<ClassLabel>,
}

impl LabelEncoder {
    /// Collect the distinct classes of `labels`
    pub fn fit(labels: &[ClassLabel]) -> Self {
        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class index of every label, as the `f64` targets estimators expect
    pub fn encode(&self, labels: &[ClassLabel]) -> Result<Array1<f64>> {
        labels
            .iter()
            .map(|label| {
                self.classes
                    .binary_search(label)
                    .map(|idx| idx as f64)
                    .map_err(|_| {
                        TabtrainError::InvalidInput(format!("unknown class label: {}", label))
                    })
            })
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from_vec)
    }

    /// Label for an estimator output
    pub fn decode(&self, encoded: f64) -> Result<ClassLabel> {
        let idx = encoded.round();
        if !idx.is_finite() || idx < 0.0 || idx as usize >= self.classes.len() {
            return Err(TabtrainError::PredictionFailure(format!(
                "estimator returned class index {} outside 0..{}",
                encoded,
                self.classes.len()
            )));
        }
        Ok(self.classes[idx as usize].clone())
    }
}
