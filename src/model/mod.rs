//! Disposition taxonomy and the classifier interface

mod artifact;

pub use artifact::SoftmaxClassifier;

use crate::error::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// The three-class KOI disposition taxonomy.
///
/// Canonical label-index mapping: 0 = CANDIDATE, 1 = CONFIRMED,
/// 2 = FALSE POSITIVE. Model bundles are validated against this order at
/// load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    #[serde(rename = "CANDIDATE")]
    Candidate,
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[serde(rename = "FALSE POSITIVE")]
    FalsePositive,
}

impl Disposition {
    /// Class labels in canonical index order
    pub const ALL: [Disposition; 3] = [
        Disposition::Candidate,
        Disposition::Confirmed,
        Disposition::FalsePositive,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        match self {
            Disposition::Candidate => 0,
            Disposition::Confirmed => 1,
            Disposition::FalsePositive => 2,
        }
    }

    /// Human-readable label, as it appears in the source catalogs
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Candidate => "CANDIDATE",
            Disposition::Confirmed => "CONFIRMED",
            Disposition::FalsePositive => "FALSE POSITIVE",
        }
    }

    /// Identifier-safe key used in JSON probability maps
    pub fn key(&self) -> &'static str {
        match self {
            Disposition::Candidate => "CANDIDATE",
            Disposition::Confirmed => "CONFIRMED",
            Disposition::FalsePositive => "FALSE_POSITIVE",
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The contract a pre-trained classifier artifact must expose.
///
/// The pipeline treats the model as opaque: a fixed feature count, the
/// class list, and batch scoring.
pub trait Classifier: Send + Sync {
    /// Width of the feature matrix the model was trained on
    fn n_features(&self) -> usize;

    /// Class labels in index order
    fn classes(&self) -> &[Disposition];

    /// Per-row probability distribution over the classes; each row is
    /// non-negative and sums to 1
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Per-row predicted class index (argmax of the probabilities)
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(idx, _)| idx)
                    .unwrap_or(0)
            })
            .collect())
    }
}
