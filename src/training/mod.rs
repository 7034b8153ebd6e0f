//! Model training module
//!
//! Provides the classifier roster and the engine that fits it:
//! - Random forest (bagged Gini trees, sqrt features per split)
//! - Gradient boosting (log-loss boosted regression trees)
//! - Support vector machine (RBF kernel, SMO)

mod config;
mod engine;
mod models;
mod split;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod random_forest;
pub mod svm;

pub use config::TrainingConfig;
pub use engine::{TrainEngine, TrainingResult, PREDICTION_URL};
pub use models::{Classifier, Estimator, FittedModel, ModelKind};
pub use split::{train_test_split, SplitIndices};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use random_forest::RandomForest;
pub use svm::{Gamma, SVMClassifier, SVMConfig};
