//! Gradient boosted decision trees for classification
//!
//! Each class gets a binary booster fit on log loss (one-vs-rest); two-class
//! problems use a single booster for the higher class index. Prediction picks
//! the class with the largest raw score.

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use crate::error::{Result, TabtrainError};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees per booster)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
        }
    }
}

/// Log-odds clamp so a pure class does not start at infinity
const PROB_EPS: f64 = 1e-6;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Binary booster: raw score = initial log odds + lr * sum(tree outputs)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryBooster {
    trees: Vec<DecisionTree>,
    initial_log_odds: f64,
}

impl BinaryBooster {
    /// Fit on 0/1 targets
    fn fit(config: &GradientBoostingConfig, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let n_samples = x.nrows();

        let p = y.mean().unwrap_or(0.5).clamp(PROB_EPS, 1.0 - PROB_EPS);
        let initial_log_odds = (p / (1.0 - p)).ln();
        let mut log_odds = Array1::from_elem(n_samples, initial_log_odds);

        let mut trees = Vec::with_capacity(config.n_estimators);

        for _ in 0..config.n_estimators {
            // Negative gradient of log loss
            let residuals: Array1<f64> = if n_samples > 10000 {
                let lo = &log_odds;
                (0..n_samples)
                    .into_par_iter()
                    .map(|i| y[i] - sigmoid(lo[i]))
                    .collect::<Vec<f64>>()
                    .into()
            } else {
                y.iter()
                    .zip(log_odds.iter())
                    .map(|(yi, &lo)| yi - sigmoid(lo))
                    .collect()
            };

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(config.max_depth)
                .with_min_samples_leaf(config.min_samples_leaf);
            tree.fit(x, &residuals)?;

            let tree_pred = tree.predict(x)?;
            log_odds.scaled_add(config.learning_rate, &tree_pred);

            trees.push(tree);
        }

        Ok(Self {
            trees,
            initial_log_odds,
        })
    }

    fn decision_function(&self, x: &Array2<f64>, learning_rate: f64) -> Result<Array1<f64>> {
        let mut scores = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            scores.scaled_add(learning_rate, &tree.predict(x)?);
        }
        Ok(scores)
    }
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    boosters: Vec<BinaryBooster>,
    n_classes: usize,
    n_features: usize,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            boosters: Vec::new(),
            n_classes: 0,
            n_features: 0,
        }
    }

    /// Fit on class indices `0..n_classes`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(TabtrainError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(TabtrainError::InvalidInput("no training rows".to_string()));
        }

        let n_classes = y.iter().fold(0.0f64, |m, &v| m.max(v)).round() as usize + 1;

        // One booster per positive class; a single class needs none
        let positives: Vec<usize> = match n_classes {
            1 => Vec::new(),
            2 => vec![1],
            k => (0..k).collect(),
        };

        let mut boosters = Vec::with_capacity(positives.len());
        for class in positives {
            let y_bin: Array1<f64> = y
                .iter()
                .map(|&v| if v.round() as usize == class { 1.0 } else { 0.0 })
                .collect();
            boosters.push(BinaryBooster::fit(&self.config, x, &y_bin)?);
        }

        self.boosters = boosters;
        self.n_classes = n_classes;
        self.n_features = x.ncols();
        Ok(())
    }

    /// Predict class indices
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.n_classes == 0 {
            return Err(TabtrainError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(TabtrainError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let lr = self.config.learning_rate;
        match self.n_classes {
            1 => Ok(Array1::zeros(x.nrows())),
            2 => {
                let scores = self.boosters[0].decision_function(x, lr)?;
                Ok(scores.mapv(|s| if s > 0.0 { 1.0 } else { 0.0 }))
            }
            _ => {
                let scores: Vec<Array1<f64>> = self
                    .boosters
                    .iter()
                    .map(|b| b.decision_function(x, lr))
                    .collect::<Result<_>>()?;
                Ok((0..x.nrows())
                    .map(|i| {
                        // First maximum wins
                        let mut best = 0;
                        for (class, s) in scores.iter().enumerate() {
                            if s[i] > scores[best][i] {
                                best = class;
                            }
                        }
                        best as f64
                    })
                    .collect())
            }
        }
    }
}
