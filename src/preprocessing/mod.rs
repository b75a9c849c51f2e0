//! Data preprocessing pipeline
//!
//! Normalizes heterogeneous survey tables into the fixed-shape numeric
//! matrix the classifier was trained on:
//! - Schema reconciliation against the frozen training feature order
//! - Missing-value imputation (per-column median)
//! - Derived transit features (stellar density, radius ratio, a/Rs)
//! - Standard scaling
//!
//! Stateful stages follow an explicit fit/transform split: `fit` returns
//! an immutable fitted-state object and `transform` never mutates it.

mod features;
mod imputer;
mod pipeline;
mod scaler;
mod schema;

pub use features::{
    engineer_features, GRAVITATIONAL_CONSTANT, SECONDS_PER_DAY, SOLAR_RADIUS_M,
};
pub use imputer::{FittedImputer, MedianImputer};
pub use pipeline::FittedPipeline;
pub use scaler::{FittedScaler, StandardScaler};
pub use schema::{ReconcileReport, TrainingSchema, EXCLUDED_COLUMNS};
