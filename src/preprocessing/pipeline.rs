//! The preprocessing pipeline: reconcile, impute, engineer, scale

use crate::error::{KoiError, Result};
use crate::preprocessing::{
    engineer_features, FittedImputer, FittedScaler, MedianImputer, ReconcileReport,
    StandardScaler, TrainingSchema,
};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Everything fit once and reused for every subsequent request.
///
/// Construction happens through [`FittedPipeline::fit`], exactly once per
/// process, under the owner's lock; afterwards the pipeline only
/// transforms and is shared immutably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    schema: TrainingSchema,
    imputer: FittedImputer,
    scaler: FittedScaler,
    /// Post-engineering feature order, matching the classifier input
    output_columns: Vec<String>,
}

impl FittedPipeline {
    /// The one-time fit: freeze the schema (seeded from the model bundle
    /// when available, otherwise inferred from this batch), then fit the
    /// imputer and scaler on the batch.
    pub fn fit(df: &DataFrame, seed: Option<TrainingSchema>) -> Result<Self> {
        let schema = match seed {
            Some(s) if !s.is_empty() => s,
            _ => TrainingSchema::infer(df)?,
        };

        let (reconciled, _) = schema.reconcile(df)?;
        let imputer = MedianImputer::fit(&reconciled, schema.columns())?;
        let imputed = imputer.transform(&reconciled)?;
        let engineered = engineer_features(&imputed)?;

        let output_columns: Vec<String> = engineered
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let scaler = StandardScaler::fit(&engineered, &output_columns)?;

        Ok(Self {
            schema,
            imputer,
            scaler,
            output_columns,
        })
    }

    /// Run a table through the fitted stages and produce the dense matrix
    /// handed to the classifier, column-for-column in training order.
    pub fn transform(&self, df: &DataFrame) -> Result<(Array2<f64>, ReconcileReport)> {
        let (reconciled, report) = self.schema.reconcile(df)?;
        let imputed = self.imputer.transform(&reconciled)?;
        let engineered = engineer_features(&imputed)?;
        let scaled = self.scaler.transform(&engineered)?;
        let matrix = to_matrix(&scaled, &self.output_columns)?;
        Ok((matrix, report))
    }

    pub fn schema(&self) -> &TrainingSchema {
        &self.schema
    }

    pub fn output_columns(&self) -> &[String] {
        &self.output_columns
    }

    pub fn n_features(&self) -> usize {
        self.output_columns.len()
    }

    /// Save the fitted state to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load previously fitted state from a file
    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let pipeline: Self = serde_json::from_str(&json)?;
        Ok(pipeline)
    }
}

fn to_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let height = df.height();
    let width = columns.len();
    let mut data = vec![0.0f64; height * width];

    for (c_idx, name) in columns.iter().enumerate() {
        let ca = df
            .column(name)
            .map_err(|_| KoiError::DataError(format!("column not found: {name}")))?
            .f64()
            .map_err(|e| KoiError::DataError(e.to_string()))?;
        for (r_idx, value) in ca.into_iter().enumerate() {
            data[r_idx * width + c_idx] = value.unwrap_or(0.0);
        }
    }

    Array2::from_shape_vec((height, width), data).map_err(|e| KoiError::DataError(e.to_string()))
}
