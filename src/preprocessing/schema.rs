//! Training schema capture and reconciliation

use crate::error::{KoiError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identifier and label columns never used as model features, even when numeric
pub const EXCLUDED_COLUMNS: [&str; 3] = ["kepid", "rowid", "koi_disposition"];

/// The frozen, ordered feature list the classifier was trained on.
///
/// Captured once (inferred from the first fitted batch or seeded from the
/// model bundle) and immutable afterwards; every inbound table is
/// reconciled to exactly these columns in exactly this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSchema {
    columns: Vec<String>,
}

/// What reconciliation had to do to make an input match the schema
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    /// Schema columns absent from the input, inserted as all-missing
    pub missing_columns: Vec<String>,
    /// Input columns with no place in the schema, dropped
    pub dropped_columns: Vec<String>,
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

impl TrainingSchema {
    /// Build a schema from an explicit ordered column list (model bundle path)
    pub fn from_columns(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Infer the schema from a table: numeric columns only, identifier and
    /// label columns excluded, all-missing columns dropped. Input order is
    /// preserved and becomes the frozen feature order.
    pub fn infer(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::new();
        for col in df.get_columns() {
            let name = col.name().to_string();
            if EXCLUDED_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            if !is_numeric_dtype(col.dtype()) {
                continue;
            }
            if col.null_count() == col.len() {
                continue;
            }
            columns.push(name);
        }

        if columns.is_empty() {
            return Err(KoiError::SchemaMismatch(
                "input has no usable numeric feature columns".to_string(),
            ));
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Produce a frame with exactly the schema's columns, in the schema's
    /// order, as Float64. Extra input columns are dropped; absent ones are
    /// inserted as all-missing and reported. Fails when every feature
    /// value would be missing, since no imputation can recover from that.
    pub fn reconcile(&self, df: &DataFrame) -> Result<(DataFrame, ReconcileReport)> {
        let height = df.height();
        let mut report = ReconcileReport::default();
        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len());

        for name in &self.columns {
            let column = match df.column(name) {
                Ok(col) => match col.as_materialized_series().cast(&DataType::Float64) {
                    Ok(series) => series.into_column(),
                    // Present but not numeric-coercible: treated as missing values
                    Err(_) => Column::full_null(name.as_str().into(), height, &DataType::Float64),
                },
                Err(_) => {
                    report.missing_columns.push(name.clone());
                    Column::full_null(name.as_str().into(), height, &DataType::Float64)
                }
            };
            columns.push(column);
        }

        let schema_names: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        for col in df.get_columns() {
            let name = col.name().as_str();
            if !schema_names.contains(name) {
                report.dropped_columns.push(name.to_string());
            }
        }

        if columns.iter().all(|c| c.null_count() == c.len()) {
            return Err(KoiError::SchemaMismatch(format!(
                "none of the {} training feature columns carry any values",
                self.columns.len()
            )));
        }

        let frame = DataFrame::new(columns).map_err(|e| KoiError::DataError(e.to_string()))?;
        Ok((frame, report))
    }
}
