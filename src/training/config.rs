//! Training configuration

use serde::{Deserialize, Serialize};

/// Settings shared by every training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out from fitting
    pub test_size: f64,
    /// Seed for the split and every model
    pub random_seed: u64,
    /// Trees in the random forest
    pub n_estimators: usize,
    /// Boosting rounds per booster
    pub boosting_rounds: usize,
    pub learning_rate: f64,
    /// Depth of each boosted tree
    pub boosting_max_depth: usize,
    /// SVM regularization
    pub svm_c: f64,
    /// SMO iteration cap
    pub svm_max_iter: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_seed: 42,
            n_estimators: 100,
            boosting_rounds: 100,
            learning_rate: 0.1,
            boosting_max_depth: 3,
            svm_c: 1.0,
            svm_max_iter: 1000,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_boosting_rounds(mut self, n: usize) -> Self {
        self.boosting_rounds = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_svm_c(mut self, c: f64) -> Self {
        self.svm_c = c;
        self
    }
}
