//! Support vector classifier
//!
//! RBF-kernel SVM trained with SMO (Sequential Minimal Optimization). Two classes
//! use a single machine; more classes use one-vs-rest.

use crate::error::{Result, TabtrainError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training will return an error to prevent OOM.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// RBF kernel width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// `1 / (n_features * var(X))`, computed over every training value
    Scale,
    Fixed(f64),
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// RBF kernel width: K(x, y) = exp(-γ * ||x - y||²)
    pub gamma: Gamma,
    /// Tolerance for stopping criterion
    pub tol: f64,
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Random seed
    pub random_state: u64,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: Gamma::Scale,
            tol: 1e-3,
            max_iter: 1000,
            random_state: 42,
        }
    }
}

/// A single binary machine, `+1` for its positive class
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinarySVM {
    support_vectors: Array2<f64>,
    alphas: Array1<f64>,
    support_labels: Array1<f64>,
    bias: f64,
}

fn rbf(gamma: f64, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let norm_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    (-gamma * norm_sq).exp()
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    /// Kernel width resolved at fit time
    gamma: f64,
    /// Class indices seen during fit
    classes: Vec<i64>,
    /// One machine for two classes, one per class otherwise, none for a single class
    machines: Vec<BinarySVM>,
    n_features: usize,
    is_fitted: bool,
}

impl SVMClassifier {
    /// Create a new SVM classifier
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            gamma: 0.0,
            classes: Vec::new(),
            machines: Vec::new(),
            n_features: 0,
            is_fitted: false,
        }
    }

    /// Fit on class indices
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n != y.len() {
            return Err(TabtrainError::Shape {
                expected: format!("y length = {}", n),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n == 0 {
            return Err(TabtrainError::InvalidInput("no training rows".to_string()));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(TabtrainError::InvalidInput(
                "SVM input contains missing or infinite values".to_string(),
            ));
        }
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(TabtrainError::InvalidInput(format!(
                "Dataset has {} samples, exceeding the maximum {} for SVM kernel matrix. \
                 Consider subsampling or using a different algorithm.",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        let mut classes: Vec<i64> = y.iter().map(|&v| v.round() as i64).collect();
        classes.sort_unstable();
        classes.dedup();

        self.gamma = self.resolve_gamma(x);
        self.n_features = x.ncols();

        let positives: Vec<i64> = match classes.len() {
            1 => Vec::new(),
            2 => vec![classes[1]],
            _ => classes.clone(),
        };

        let kernel_matrix = if positives.is_empty() {
            Array2::zeros((0, 0))
        } else {
            self.compute_kernel_matrix(x)
        };

        let mut machines = Vec::with_capacity(positives.len());
        for cls in positives {
            let y_binary: Array1<f64> =
                y.mapv(|v| if v.round() as i64 == cls { 1.0 } else { -1.0 });
            machines.push(self.fit_machine(x, &y_binary, &kernel_matrix));
        }

        self.classes = classes;
        self.machines = machines;
        self.is_fitted = true;
        Ok(())
    }

    fn resolve_gamma(&self, x: &Array2<f64>) -> f64 {
        match self.config.gamma {
            Gamma::Fixed(gamma) => gamma,
            Gamma::Scale => {
                let denom = x.ncols() as f64 * x.var(0.0);
                if denom > 0.0 {
                    1.0 / denom
                } else {
                    1.0
                }
            }
        }
    }

    fn fit_machine(&self, x: &Array2<f64>, y_binary: &Array1<f64>, k: &Array2<f64>) -> BinarySVM {
        let (alphas, bias, support_indices) = self.smo_train(y_binary, k);

        let sv_count = support_indices.len();
        let mut support_vectors = Array2::zeros((sv_count, x.ncols()));
        let mut support_labels = Array1::zeros(sv_count);
        let mut support_alphas = Array1::zeros(sv_count);

        for (i, &idx) in support_indices.iter().enumerate() {
            support_vectors.row_mut(i).assign(&x.row(idx));
            support_labels[i] = y_binary[idx];
            support_alphas[i] = alphas[idx];
        }

        BinarySVM {
            support_vectors,
            alphas: support_alphas,
            support_labels,
            bias,
        }
    }

    /// SMO training algorithm
    fn smo_train(&self, y: &Array1<f64>, kernel_matrix: &Array2<f64>) -> (Array1<f64>, f64, Vec<usize>) {
        let n = y.len();
        let c = self.config.c;
        let tol = self.config.tol;

        let mut alphas = Array1::zeros(n);
        let mut bias = 0.0;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        let mut passes = 0;
        let max_passes = 5;
        let mut total_iter = 0;

        while n > 1 && passes < max_passes && total_iter < self.config.max_iter {
            let mut num_changed = 0;

            for i in 0..n {
                let e_i = Self::decision_cached(kernel_matrix, &alphas, y, bias, i) - y[i];

                // KKT violation
                if (y[i] * e_i < -tol && alphas[i] < c) || (y[i] * e_i > tol && alphas[i] > 0.0) {
                    let j = loop {
                        let j = rng.gen_range(0..n);
                        if j != i {
                            break j;
                        }
                    };

                    let e_j = Self::decision_cached(kernel_matrix, &alphas, y, bias, j) - y[j];

                    let alpha_i_old = alphas[i];
                    let alpha_j_old = alphas[j];

                    let (l, h) = if y[i] != y[j] {
                        ((alphas[j] - alphas[i]).max(0.0), (c + alphas[j] - alphas[i]).min(c))
                    } else {
                        ((alphas[i] + alphas[j] - c).max(0.0), (alphas[i] + alphas[j]).min(c))
                    };

                    if (l - h).abs() < 1e-10 {
                        continue;
                    }

                    let eta = 2.0 * kernel_matrix[[i, j]] - kernel_matrix[[i, i]] - kernel_matrix[[j, j]];
                    if eta >= 0.0 {
                        continue;
                    }

                    alphas[j] = (alphas[j] - y[j] * (e_i - e_j) / eta).clamp(l, h);

                    if (alphas[j] - alpha_j_old).abs() < 1e-5 {
                        continue;
                    }

                    alphas[i] += y[i] * y[j] * (alpha_j_old - alphas[j]);

                    let b1 = bias
                        - e_i
                        - y[i] * (alphas[i] - alpha_i_old) * kernel_matrix[[i, i]]
                        - y[j] * (alphas[j] - alpha_j_old) * kernel_matrix[[i, j]];
                    let b2 = bias
                        - e_j
                        - y[i] * (alphas[i] - alpha_i_old) * kernel_matrix[[i, j]]
                        - y[j] * (alphas[j] - alpha_j_old) * kernel_matrix[[j, j]];

                    bias = if alphas[i] > 0.0 && alphas[i] < c {
                        b1
                    } else if alphas[j] > 0.0 && alphas[j] < c {
                        b2
                    } else {
                        (b1 + b2) / 2.0
                    };

                    num_changed += 1;
                }
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        let support_indices: Vec<usize> = alphas
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > 1e-8)
            .map(|(i, _)| i)
            .collect();

        (alphas, bias, support_indices)
    }

    /// Compute kernel matrix (parallelized for large datasets)
    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let gamma = self.gamma;

        let rows: Vec<Vec<f64>> = if n < 100 {
            (0..n)
                .map(|i| (i..n).map(|j| rbf(gamma, x.row(i), x.row(j))).collect())
                .collect()
        } else {
            (0..n)
                .into_par_iter()
                .map(|i| (i..n).map(|j| rbf(gamma, x.row(i), x.row(j))).collect())
                .collect()
        };

        let mut k = Array2::zeros((n, n));
        for (i, row_vals) in rows.into_iter().enumerate() {
            for (offset, val) in row_vals.into_iter().enumerate() {
                let j = i + offset;
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }
        k
    }

    fn decision_cached(k: &Array2<f64>, alphas: &Array1<f64>, y: &Array1<f64>, bias: f64, idx: usize) -> f64 {
        let mut sum = bias;
        for i in 0..alphas.len() {
            if alphas[i] != 0.0 {
                sum += alphas[i] * y[i] * k[[i, idx]];
            }
        }
        sum
    }

    fn score_sample(&self, sample: ArrayView1<f64>, machine: &BinarySVM) -> f64 {
        let mut sum = machine.bias;
        for (j, sv) in machine.support_vectors.rows().into_iter().enumerate() {
            sum += machine.alphas[j] * machine.support_labels[j] * rbf(self.gamma, sample, sv);
        }
        sum
    }

    /// Predict class indices
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(TabtrainError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(TabtrainError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let predictions = x
            .rows()
            .into_iter()
            .map(|sample| match self.machines.len() {
                0 => self.classes[0] as f64,
                1 => {
                    if self.score_sample(sample, &self.machines[0]) >= 0.0 {
                        self.classes[1] as f64
                    } else {
                        self.classes[0] as f64
                    }
                }
                _ => {
                    let mut best_score = f64::NEG_INFINITY;
                    let mut best_class = self.classes[0];
                    for (k, machine) in self.machines.iter().enumerate() {
                        let score = self.score_sample(sample, machine);
                        if score > best_score {
                            best_score = score;
                            best_class = self.classes[k];
                        }
                    }
                    best_class as f64
                }
            })
            .collect();

        Ok(predictions)
    }

    /// RBF width resolved during fit
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.machines.iter().map(|m| m.support_vectors.nrows()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (10, 2),
            vec![
                1.0, 1.0, 1.5, 1.2, 2.0, 2.0, 1.2, 1.8, 0.8, 1.5, 5.0, 5.0, 5.5, 5.2, 6.0, 6.0,
                5.2, 5.8, 4.8, 5.5,
            ],
        )
        .unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        (x, y)
    }

    fn accuracy(y: &Array1<f64>, p: &Array1<f64>) -> f64 {
        y.iter().zip(p.iter()).filter(|(a, b)| a == b).count() as f64 / y.len() as f64
    }

    #[test]
    fn test_svm_classifier_rbf_scale() {
        let (x, y) = create_separable_data();
        let mut svm = SVMClassifier::new(SVMConfig::default());
        svm.fit(&x, &y).unwrap();

        let expected = 1.0 / (2.0 * x.var(0.0));
        assert!((svm.gamma() - expected).abs() < 1e-12);
        assert!(accuracy(&y, &svm.predict(&x).unwrap()) > 0.8);
    }

    #[test]
    fn test_svm_classifier_multiclass() {
        let x = Array2::from_shape_vec(
            (15, 2),
            vec![
                1.0, 1.0, 1.5, 1.2, 2.0, 2.0, 1.2, 1.8, 0.8, 1.5, 5.0, 5.0, 5.5, 5.2, 6.0, 6.0,
                5.2, 5.8, 4.8, 5.5, 1.0, 5.0, 1.5, 5.2, 2.0, 6.0, 1.2, 5.8, 0.8, 5.5,
            ],
        )
        .unwrap();
        let y = Array1::from_vec(vec![
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0,
        ]);

        let mut svm = SVMClassifier::new(SVMConfig {
            c: 10.0,
            gamma: Gamma::Fixed(0.5),
            ..Default::default()
        });
        svm.fit(&x, &y).unwrap();

        let predictions = svm.predict(&x).unwrap();
        assert!(predictions.iter().all(|&p| p == 0.0 || p == 1.0 || p == 2.0));
        assert!(accuracy(&y, &predictions) > 0.6);
    }

    #[test]
    fn test_fixed_gamma_kept() {
        let (x, y) = create_separable_data();
        let mut svm = SVMClassifier::new(SVMConfig {
            gamma: Gamma::Fixed(0.25),
            ..Default::default()
        });
        svm.fit(&x, &y).unwrap();
        assert_eq!(svm.gamma(), 0.25);
    }

    #[test]
    fn test_constant_input_falls_back_to_unit_gamma() {
        let x = Array2::from_elem((4, 2), 3.0);
        let y = Array1::from_vec(vec![0.0, 1.0, 0.0, 1.0]);
        let mut svm = SVMClassifier::new(SVMConfig::default());
        svm.fit(&x, &y).unwrap();
        assert_eq!(svm.gamma(), 1.0);
    }

    #[test]
    fn test_single_class_constant() {
        let x = Array2::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
        let y = Array1::from_vec(vec![1.0, 1.0]);
        let mut svm = SVMClassifier::new(SVMConfig::default());
        svm.fit(&x, &y).unwrap();

        let query = Array2::from_shape_vec((1, 1), vec![-4.0]).unwrap();
        assert_eq!(svm.predict(&query).unwrap()[0], 1.0);
    }

    #[test]
    fn test_missing_values_rejected() {
        let x = Array2::from_shape_vec((2, 1), vec![1.0, f64::NAN]).unwrap();
        let y = Array1::from_vec(vec![0.0, 1.0]);
        let mut svm = SVMClassifier::new(SVMConfig::default());
        assert!(matches!(svm.fit(&x, &y), Err(TabtrainError::InvalidInput(_))));
    }
}
