//! The fit-once prediction service
//!
//! One `PredictionService` lives for the whole process. The first table
//! it sees fits the preprocessing pipeline under an exclusive lock; every
//! later request transforms through the shared fitted state and may run
//! fully in parallel.

mod format;

pub use format::{
    BatchPrediction, ClassProbabilities, DispositionSummary, PredictionRecord,
};

use crate::error::{KoiError, Result};
use crate::model::{Classifier, SoftmaxClassifier};
use crate::preprocessing::{FittedPipeline, TrainingSchema};
use polars::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

pub struct PredictionService {
    classifier: SoftmaxClassifier,
    pipeline: RwLock<Option<Arc<FittedPipeline>>>,
}

impl PredictionService {
    pub fn new(classifier: SoftmaxClassifier) -> Self {
        Self {
            classifier,
            pipeline: RwLock::new(None),
        }
    }

    /// Load the classifier bundle and build an unfitted service
    pub fn load(model_path: &str) -> Result<Self> {
        let classifier = SoftmaxClassifier::load(model_path)?;
        info!(
            model_path,
            n_features = classifier.n_features(),
            "Classifier bundle loaded"
        );
        Ok(Self::new(classifier))
    }

    pub fn is_fitted(&self) -> bool {
        self.pipeline
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Held-out accuracy reported by the training run, if the bundle has it
    pub fn accuracy(&self) -> Option<f64> {
        self.classifier.accuracy()
    }

    /// Raw training columns the pipeline schema is seeded from, if present
    pub fn feature_names(&self) -> Option<&[String]> {
        self.classifier.feature_names()
    }

    /// Return the fitted pipeline, fitting it from `df` if this is the
    /// first table the service has ever seen.
    ///
    /// Double-checked under the write lock so that two concurrent first
    /// requests fit at most once; the loser of the race reuses the
    /// winner's state.
    fn fitted_for(&self, df: &DataFrame) -> Result<Arc<FittedPipeline>> {
        {
            let guard = self.pipeline.read().map_err(|_| lock_poisoned())?;
            if let Some(fitted) = guard.as_ref() {
                return Ok(Arc::clone(fitted));
            }
        }

        let mut guard = self.pipeline.write().map_err(|_| lock_poisoned())?;
        if let Some(fitted) = guard.as_ref() {
            return Ok(Arc::clone(fitted));
        }

        let seed = self
            .classifier
            .feature_names()
            .map(|names| TrainingSchema::from_columns(names.to_vec()));
        let fitted = Arc::new(FittedPipeline::fit(df, seed)?);
        info!(
            n_features = fitted.n_features(),
            "Preprocessing pipeline fitted"
        );
        *guard = Some(Arc::clone(&fitted));
        Ok(fitted)
    }

    /// Classify every row of a table. All-or-nothing: any stage failure
    /// fails the whole batch.
    pub fn predict_table(&self, df: &DataFrame) -> Result<BatchPrediction> {
        if df.height() == 0 {
            return Err(KoiError::EmptyDataset(
                "prediction input has no rows".to_string(),
            ));
        }

        let pipeline = self.fitted_for(df)?;
        let (matrix, report) = pipeline.transform(df)?;

        if matrix.ncols() != self.classifier.n_features() {
            return Err(KoiError::SchemaMismatch(format!(
                "pipeline produced {} features, model expects {}",
                matrix.ncols(),
                self.classifier.n_features()
            )));
        }

        let proba = self.classifier.predict_proba(&matrix).map_err(|e| match e {
            KoiError::PredictionFailure(_) => e,
            other => KoiError::PredictionFailure(format!("classifier inference failed: {other}")),
        })?;
        let indices = format::argmax_rows(&proba);

        format::format_batch(&indices, &proba, &report)
    }

    /// Classify a single flat feature-name to value mapping
    pub fn predict_single(&self, features: &HashMap<String, f64>) -> Result<PredictionRecord> {
        if features.is_empty() {
            return Err(KoiError::EmptyDataset(
                "no features provided".to_string(),
            ));
        }

        let columns: Vec<Column> = features
            .iter()
            .map(|(name, value)| Column::new(name.as_str().into(), [*value]))
            .collect();
        let df = DataFrame::new(columns).map_err(|e| KoiError::DataError(e.to_string()))?;

        let batch = self.predict_table(&df)?;
        batch
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| KoiError::PredictionFailure("empty batch result".to_string()))
    }
}

fn lock_poisoned() -> KoiError {
    KoiError::PredictionFailure("pipeline lock poisoned".to_string())
}
