//! KOI Portal - Kepler Objects of Interest disposition service
//!
//! This crate ingests tabular exoplanet survey data (CSV and Excel
//! workbooks in unreliable encodings), normalizes it against the frozen
//! feature schema the classifier was trained on, and serves disposition
//! predictions (CANDIDATE / CONFIRMED / FALSE POSITIVE) with per-class
//! probabilities.
//!
//! # Modules
//!
//! - [`ingest`] - Format and encoding detection, workbook parsing, table cleanup
//! - [`preprocessing`] - Schema reconciliation, imputation, derived features, scaling
//! - [`model`] - Disposition taxonomy and the pre-trained classifier artifact
//! - [`service`] - The fit-once prediction service and response formatting
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

pub mod error;

pub mod ingest;
pub mod preprocessing;
pub mod model;
pub mod service;

pub mod server;
pub mod cli;

pub use error::{KoiError, Result, UnreadableKind};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{KoiError, Result, UnreadableKind};
    pub use crate::ingest::{read_table, sniff_table};
    pub use crate::model::{Classifier, Disposition, SoftmaxClassifier};
    pub use crate::preprocessing::{FittedPipeline, ReconcileReport, TrainingSchema};
    pub use crate::service::{BatchPrediction, PredictionRecord, PredictionService};
}
