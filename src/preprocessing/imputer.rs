//! Missing-value imputation

use crate::error::{KoiError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-column median imputation.
///
/// Deterministic stand-in for an iterative multivariate estimator: the
/// fitted state is a plain name-to-median map, cheap to serialize and to
/// reason about.
pub struct MedianImputer;

impl MedianImputer {
    /// Learn one median per column from the presented frame.
    ///
    /// A column with zero observed values cannot be fitted; that is total
    /// unavailability and fails, while partial missingness is fine.
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<FittedImputer> {
        let mut fill_values = HashMap::with_capacity(columns.len());
        let mut starved: Vec<String> = Vec::new();

        for name in columns {
            let column = df
                .column(name)
                .map_err(|_| KoiError::DataError(format!("column not found: {name}")))?;
            let ca = column
                .f64()
                .map_err(|e| KoiError::DataError(e.to_string()))?;

            match ca.median() {
                Some(median) => {
                    fill_values.insert(name.clone(), median);
                }
                None => starved.push(name.clone()),
            }
        }

        if !starved.is_empty() {
            return Err(KoiError::SchemaMismatch(format!(
                "no observed values to fit imputation for: {}",
                starved.join(", ")
            )));
        }

        Ok(FittedImputer { fill_values })
    }
}

/// Fitted imputer state; transform-only, never refits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedImputer {
    fill_values: HashMap<String, f64>,
}

impl FittedImputer {
    /// Fill every missing cell from fitted state
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();

        for (name, fill) in &self.fill_values {
            if let Ok(column) = df.column(name) {
                let filled = column
                    .f64()
                    .map_err(|e| KoiError::DataError(e.to_string()))?
                    .fill_null_with_values(*fill)
                    .map_err(|e| KoiError::DataError(e.to_string()))?;
                result = result
                    .with_column(filled.into_series())
                    .map_err(|e| KoiError::DataError(e.to_string()))?
                    .clone();
            }
        }

        Ok(result)
    }

    /// Fitted fill value for a column, if it was part of the fit
    pub fn fill_value(&self, name: &str) -> Option<f64> {
        self.fill_values.get(name).copied()
    }
}
