//! Model roster, the classifier capability and fitted models

use super::config::TrainingConfig;
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::random_forest::RandomForest;
use super::svm::{SVMClassifier, SVMConfig};
use crate::error::{Result, TabtrainError};
use crate::preprocessing::{ClassLabel, FeatureSchema, LabelEncoder};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trait for classifiers fit on numeric class indices
pub trait Classifier: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predicted class index per row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RandomForest::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RandomForest::predict(self, x)
    }
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GradientBoostingClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        GradientBoostingClassifier::predict(self, x)
    }
}

impl Classifier for SVMClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        SVMClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        SVMClassifier::predict(self, x)
    }
}

/// Members of the training roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    GradientBoosting,
    Svm,
}

impl ModelKind {
    /// Every roster member, in training order
    pub const ROSTER: [ModelKind; 3] = [
        ModelKind::RandomForest,
        ModelKind::GradientBoosting,
        ModelKind::Svm,
    ];

    /// Model used when a prediction does not name one
    pub const DEFAULT: ModelKind = ModelKind::RandomForest;

    /// Stable name, also the artifact slot name
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::Svm => "svm",
        }
    }

    /// Unfitted estimator configured for this roster member
    pub fn estimator(&self, config: &TrainingConfig) -> Estimator {
        match self {
            ModelKind::RandomForest => Estimator::RandomForest(
                RandomForest::new(config.n_estimators).with_random_state(config.random_seed),
            ),
            ModelKind::GradientBoosting => {
                Estimator::GradientBoosting(GradientBoostingClassifier::new(GradientBoostingConfig {
                    n_estimators: config.boosting_rounds,
                    learning_rate: config.learning_rate,
                    max_depth: config.boosting_max_depth,
                    ..Default::default()
                }))
            }
            ModelKind::Svm => Estimator::Svm(SVMClassifier::new(SVMConfig {
                c: config.svm_c,
                max_iter: config.svm_max_iter,
                random_state: config.random_seed,
                ..Default::default()
            })),
        }
    }
}

impl Default for ModelKind {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = TabtrainError;

    fn from_str(s: &str) -> Result<Self> {
        ModelKind::ROSTER
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                TabtrainError::InvalidInput(format!(
                    "unknown model '{}', expected one of: random_forest, gradient_boosting, svm",
                    s
                ))
            })
    }
}

/// Enum to hold estimator variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingClassifier),
    Svm(SVMClassifier),
}

impl Estimator {
    fn as_classifier(&self) -> &dyn Classifier {
        match self {
            Estimator::RandomForest(m) => m,
            Estimator::GradientBoosting(m) => m,
            Estimator::Svm(m) => m,
        }
    }

    fn as_classifier_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Estimator::RandomForest(m) => m,
            Estimator::GradientBoosting(m) => m,
            Estimator::Svm(m) => m,
        }
    }
}

impl Classifier for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_classifier_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_classifier().predict(x)
    }
}

/// A trained roster member together with what it needs to answer in labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    kind: ModelKind,
    /// Feature names, in the order the estimator was fit on
    feature_names: Vec<String>,
    labels: LabelEncoder,
    estimator: Estimator,
}

impl FittedModel {
    /// Fit `kind` on `x` / `y`; columns of `x` follow `schema`
    pub fn fit(
        kind: ModelKind,
        config: &TrainingConfig,
        schema: &FeatureSchema,
        x: &Array2<f64>,
        y: &[ClassLabel],
    ) -> Result<Self> {
        if x.ncols() != schema.len() {
            return Err(TabtrainError::Shape {
                expected: format!("{} features", schema.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        if x.nrows() == 0 {
            return Err(TabtrainError::InvalidInput(
                "no rows left to fit after the held-out split".to_string(),
            ));
        }

        let labels = LabelEncoder::fit(y);
        let encoded = labels.encode(y)?;

        let mut estimator = kind.estimator(config);
        estimator.fit(x, &encoded)?;

        Ok(Self {
            kind,
            feature_names: schema.names(),
            labels,
            estimator,
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Class labels seen during fitting
    pub fn classes(&self) -> &[ClassLabel] {
        self.labels.classes()
    }

    /// Whether this model was fit against `schema`
    pub fn matches_schema(&self, schema: &FeatureSchema) -> bool {
        self.feature_names.len() == schema.len()
            && self
                .feature_names
                .iter()
                .zip(schema.features())
                .all(|(name, feature)| *name == feature.name)
    }

    /// Predicted label per row of `x`
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<ClassLabel>> {
        if x.ncols() != self.feature_names.len() {
            return Err(TabtrainError::PredictionFailure(format!(
                "{} expects {} features, got {}",
                self.kind,
                self.feature_names.len(),
                x.ncols()
            )));
        }

        let encoded = self
            .estimator
            .predict(x)
            .map_err(|e| TabtrainError::PredictionFailure(format!("{}: {}", self.kind, e)))?;

        encoded.iter().map(|&v| self.labels.decode(v)).collect()
    }

    /// Predicted label for a single row
    pub fn predict_row(&self, row: &Array1<f64>) -> Result<ClassLabel> {
        let x = row.clone().insert_axis(Axis(0));
        self.predict(&x)?
            .into_iter()
            .next()
            .ok_or_else(|| TabtrainError::PredictionFailure("empty prediction".to_string()))
    }

    /// Save model to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Load model from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{Feature, FeatureSource};
    use ndarray::array;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(
            "y",
            names
                .iter()
                .map(|n| Feature {
                    name: n.to_string(),
                    source: FeatureSource::Numeric { column: n.to_string() },
                })
                .collect(),
        )
        .unwrap()
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig::default()
            .with_n_estimators(10)
            .with_boosting_rounds(10)
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ModelKind::ROSTER {
            assert_eq!(kind.name().parse::<ModelKind>().unwrap(), kind);
        }
        assert!("knn".parse::<ModelKind>().is_err());
        assert_eq!(ModelKind::default(), ModelKind::RandomForest);
    }

    #[test]
    fn test_fit_and_predict_text_labels() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [8.0, 1.0], [9.0, 1.0]];
        let y: Vec<ClassLabel> = ["no", "no", "yes", "yes"].iter().map(|s| (*s).into()).collect();
        let schema = schema(&["a", "b"]);

        for kind in ModelKind::ROSTER {
            let model = FittedModel::fit(kind, &small_config(), &schema, &x, &y).unwrap();
            let predicted = model.predict(&x).unwrap();
            assert_eq!(predicted.len(), 4);
            assert!(predicted.iter().all(|p| y.contains(p)), "{} produced an unseen label", kind);
            assert!(model.matches_schema(&schema));
        }
    }

    #[test]
    fn test_width_mismatch_is_prediction_failure() {
        let x = array![[1.0], [2.0]];
        let y = vec![ClassLabel::Integer(0), ClassLabel::Integer(1)];
        let model =
            FittedModel::fit(ModelKind::RandomForest, &small_config(), &schema(&["a"]), &x, &y)
                .unwrap();

        let err = model.predict(&array![[1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, TabtrainError::PredictionFailure(_)));
    }

    #[test]
    fn test_empty_training_rows_rejected() {
        let x = Array2::<f64>::zeros((0, 1));
        assert!(FittedModel::fit(ModelKind::Svm, &small_config(), &schema(&["a"]), &x, &[]).is_err());
    }

    #[test]
    fn test_bytes_round_trip_keeps_predictions() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = vec![
            ClassLabel::Integer(0),
            ClassLabel::Integer(0),
            ClassLabel::Integer(1),
            ClassLabel::Integer(1),
        ];
        let model =
            FittedModel::fit(ModelKind::GradientBoosting, &small_config(), &schema(&["a"]), &x, &y)
                .unwrap();
        let restored = FittedModel::from_bytes(&model.to_bytes().unwrap()).unwrap();

        assert_eq!(restored.kind(), ModelKind::GradientBoosting);
        assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
    }
}
