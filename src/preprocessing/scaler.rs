//! Feature scaling

use crate::error::{KoiError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnStats {
    mean: f64,
    std: f64,
}

/// Standard (z-score) scaling
pub struct StandardScaler;

impl StandardScaler {
    /// Compute per-column mean and standard deviation
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<FittedScaler> {
        let mut params = Vec::with_capacity(columns.len());

        for name in columns {
            let column = df
                .column(name)
                .map_err(|_| KoiError::DataError(format!("column not found: {name}")))?;
            let ca = column
                .f64()
                .map_err(|e| KoiError::DataError(e.to_string()))?;

            let mean = ca.mean().unwrap_or(0.0);
            let std = ca.std(1).unwrap_or(0.0);
            params.push((name.clone(), ColumnStats { mean, std }));
        }

        Ok(FittedScaler { params })
    }
}

/// Fitted scaler state; transform-only, never refits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedScaler {
    params: Vec<(String, ColumnStats)>,
}

impl FittedScaler {
    /// Apply `(x - mean) / std` per column.
    ///
    /// A column whose fitted deviation is zero scales to exactly 0.0 for
    /// every row, so nothing downstream ever sees NaN or Inf.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let replacements: Vec<Series> = self
            .params
            .iter()
            .map(|(name, stats)| {
                let column = df
                    .column(name)
                    .map_err(|_| KoiError::DataError(format!("column not found: {name}")))?;
                let ca = column
                    .f64()
                    .map_err(|e| KoiError::DataError(e.to_string()))?;

                let scaled: Float64Chunked = if stats.std == 0.0 {
                    ca.into_iter().map(|opt| opt.map(|_| 0.0)).collect()
                } else {
                    ca.into_iter()
                        .map(|opt| opt.map(|v| (v - stats.mean) / stats.std))
                        .collect()
                };
                Ok(scaled.with_name(name.as_str().into()).into_series())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result = result
                .with_column(scaled)
                .map_err(|e| KoiError::DataError(e.to_string()))?
                .clone();
        }

        Ok(result)
    }
}
