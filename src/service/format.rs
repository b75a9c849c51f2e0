//! Prediction response formatting
//!
//! Pure mapping from classifier output to the response payload; no state,
//! no side effects.

use crate::error::{KoiError, Result};
use crate::model::Disposition;
use crate::preprocessing::ReconcileReport;
use ndarray::Array2;
use serde::Serialize;

/// Probability per disposition, keyed by label
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClassProbabilities {
    #[serde(rename = "CANDIDATE")]
    pub candidate: f64,
    #[serde(rename = "CONFIRMED")]
    pub confirmed: f64,
    #[serde(rename = "FALSE_POSITIVE")]
    pub false_positive: f64,
}

/// One classified input row
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord {
    pub index: usize,
    pub prediction: Disposition,
    pub prediction_code: usize,
    /// Maximum entry of the probability distribution
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
}

/// Count of predictions per disposition across a batch
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DispositionSummary {
    #[serde(rename = "CANDIDATE")]
    pub candidate: usize,
    #[serde(rename = "CONFIRMED")]
    pub confirmed: usize,
    #[serde(rename = "FALSE_POSITIVE")]
    pub false_positive: usize,
}

/// Batch prediction response payload
#[derive(Debug, Clone, Serialize)]
pub struct BatchPrediction {
    pub predictions: Vec<PredictionRecord>,
    pub total_samples: usize,
    pub summary: DispositionSummary,
    /// Training features absent from the upload, filled by imputation
    pub missing_features: Vec<String>,
}

/// Per-row argmax over a probability matrix
pub(crate) fn argmax_rows(proba: &Array2<f64>) -> Vec<usize> {
    proba
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx)
                .unwrap_or(0)
        })
        .collect()
}

/// Assemble the response payload from classifier output
pub(crate) fn format_batch(
    indices: &[usize],
    proba: &Array2<f64>,
    report: &ReconcileReport,
) -> Result<BatchPrediction> {
    let mut predictions = Vec::with_capacity(indices.len());
    let mut summary = DispositionSummary::default();

    for (index, (&code, row)) in indices.iter().zip(proba.rows()).enumerate() {
        let label = Disposition::from_index(code).ok_or_else(|| {
            KoiError::PredictionFailure(format!("classifier produced unknown class index {code}"))
        })?;

        let probabilities = ClassProbabilities {
            candidate: row[0],
            confirmed: row[1],
            false_positive: row[2],
        };
        let confidence = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        match label {
            Disposition::Candidate => summary.candidate += 1,
            Disposition::Confirmed => summary.confirmed += 1,
            Disposition::FalsePositive => summary.false_positive += 1,
        }

        predictions.push(PredictionRecord {
            index,
            prediction: label,
            prediction_code: code,
            confidence,
            probabilities,
        });
    }

    Ok(BatchPrediction {
        total_samples: predictions.len(),
        predictions,
        summary,
        missing_features: report.missing_columns.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_format_batch_summary_and_confidence() {
        let proba = array![[0.7, 0.2, 0.1], [0.1, 0.1, 0.8]];
        let indices = argmax_rows(&proba);
        let report = ReconcileReport::default();

        let batch = format_batch(&indices, &proba, &report).unwrap();
        assert_eq!(batch.total_samples, 2);
        assert_eq!(batch.summary.candidate, 1);
        assert_eq!(batch.summary.false_positive, 1);
        assert_eq!(batch.predictions[0].prediction, Disposition::Candidate);
        assert!((batch.predictions[0].confidence - 0.7).abs() < 1e-12);
        assert!((batch.predictions[1].confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_class_index_fails() {
        let proba = array![[0.5, 0.3, 0.2]];
        let report = ReconcileReport::default();
        let err = format_batch(&[9], &proba, &report).unwrap_err();
        assert!(matches!(err, KoiError::PredictionFailure(_)));
    }

    #[test]
    fn test_serialized_shape() {
        let proba = array![[0.5, 0.3, 0.2]];
        let batch = format_batch(&[0], &proba, &ReconcileReport::default()).unwrap();
        let json = serde_json::to_value(&batch).unwrap();

        assert_eq!(json["predictions"][0]["prediction"], "CANDIDATE");
        assert_eq!(json["predictions"][0]["probabilities"]["FALSE_POSITIVE"], 0.2);
        assert_eq!(json["summary"]["CANDIDATE"], 1);
    }
}
