//! The pre-trained classifier artifact
//!
//! Loaded from a JSON bundle produced by the training side: per-class
//! coefficient rows and intercepts for a multinomial softmax model, the
//! class list, and optionally the raw feature names the preprocessing
//! schema can be seeded from.

use crate::error::{KoiError, Result};
use crate::model::{Classifier, Disposition};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Row count above which scoring fans out across threads
const PARALLEL_ROW_THRESHOLD: usize = 512;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    classes: Vec<Disposition>,
    /// One coefficient row per class
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    /// Raw (pre-engineering) training columns, used to seed the schema
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    /// Held-out accuracy reported by the training run
    #[serde(default)]
    accuracy: Option<f64>,
}

impl SoftmaxClassifier {
    /// Load and validate a model bundle.
    ///
    /// Any failure here is [`KoiError::ModelUnavailable`]: fatal to every
    /// prediction request until the artifact is fixed, never retried
    /// per-request.
    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            KoiError::ModelUnavailable(format!("cannot read model bundle {path}: {e}"))
        })?;
        Self::from_json(&json)
            .map_err(|e| KoiError::ModelUnavailable(format!("model bundle {path}: {e}")))
    }

    /// Parse and validate a bundle from its JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)
            .map_err(|e| KoiError::ModelUnavailable(format!("malformed bundle: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.classes != Disposition::ALL {
            return Err(KoiError::ModelUnavailable(format!(
                "bundle class order {:?} does not match the canonical label mapping",
                self.classes
            )));
        }
        if self.coefficients.len() != self.classes.len() {
            return Err(KoiError::ModelUnavailable(format!(
                "{} coefficient rows for {} classes",
                self.coefficients.len(),
                self.classes.len()
            )));
        }
        if self.intercepts.len() != self.classes.len() {
            return Err(KoiError::ModelUnavailable(format!(
                "{} intercepts for {} classes",
                self.intercepts.len(),
                self.classes.len()
            )));
        }
        let width = self.coefficients.first().map(Vec::len).unwrap_or(0);
        if width == 0 || self.coefficients.iter().any(|row| row.len() != width) {
            return Err(KoiError::ModelUnavailable(
                "coefficient rows are empty or ragged".to_string(),
            ));
        }
        Ok(())
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    fn class_scores(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(coefs, intercept)| {
                coefs
                    .iter()
                    .zip(row.iter())
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + intercept
            })
            .collect()
    }
}

/// Numerically stable softmax
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}

impl Classifier for SoftmaxClassifier {
    fn n_features(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }

    fn classes(&self) -> &[Disposition] {
        &self.classes
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(KoiError::PredictionFailure(format!(
                "feature matrix has {} columns, model expects {}",
                x.ncols(),
                self.n_features()
            )));
        }

        let n_rows = x.nrows();
        let n_classes = self.classes.len();

        let rows: Vec<Vec<f64>> = if n_rows >= PARALLEL_ROW_THRESHOLD {
            (0..n_rows)
                .into_par_iter()
                .map(|i| softmax(&self.class_scores(x.row(i))))
                .collect()
        } else {
            (0..n_rows)
                .map(|i| softmax(&self.class_scores(x.row(i))))
                .collect()
        };

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Array2::from_shape_vec((n_rows, n_classes), flat)
            .map_err(|e| KoiError::PredictionFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn test_model() -> SoftmaxClassifier {
        serde_json::from_value(serde_json::json!({
            "classes": ["CANDIDATE", "CONFIRMED", "FALSE POSITIVE"],
            "coefficients": [[1.0, 0.0], [0.0, 1.0], [-1.0, -1.0]],
            "intercepts": [0.0, 0.0, 0.0],
            "feature_names": ["f1", "f2"],
            "accuracy": 0.91
        }))
        .unwrap()
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = test_model();
        let x = array![[1.0, 2.0], [-3.0, 0.5], [0.0, 0.0]];
        let proba = model.predict_proba(&x).unwrap();

        for row in proba.rows() {
            let total: f64 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-4);
            assert!(row.iter().all(|p| *p >= 0.0));
        }
    }

    #[test]
    fn test_predict_is_argmax() {
        let model = test_model();
        // Second feature dominant: class 1 (CONFIRMED) should win
        let x = array![[0.0, 5.0]];
        let indices = model.predict(&x).unwrap();
        assert_eq!(indices, vec![1]);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let model = test_model();
        let x = array![[1.0, 2.0, 3.0]];
        let err = model.predict_proba(&x).unwrap_err();
        assert!(matches!(err, KoiError::PredictionFailure(_)));
    }

    #[test]
    fn test_ragged_bundle_rejected() {
        let err = SoftmaxClassifier::from_json(
            r#"{
                "classes": ["CANDIDATE", "CONFIRMED", "FALSE POSITIVE"],
                "coefficients": [[1.0, 2.0], [1.0], [0.5, 0.5]],
                "intercepts": [0.0, 0.0, 0.0]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, KoiError::ModelUnavailable(_)));
    }

    #[test]
    fn test_wrong_class_order_rejected() {
        let err = SoftmaxClassifier::from_json(
            r#"{
                "classes": ["FALSE POSITIVE", "CONFIRMED", "CANDIDATE"],
                "coefficients": [[1.0], [1.0], [1.0]],
                "intercepts": [0.0, 0.0, 0.0]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, KoiError::ModelUnavailable(_)));
    }

    #[test]
    fn test_missing_bundle_file() {
        let err = SoftmaxClassifier::load("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, KoiError::ModelUnavailable(_)));
    }
}
