//! Integration tests: end-to-end upload-to-prediction flow

use koi_portal::ingest::read_table;
use koi_portal::model::Disposition;
use koi_portal::service::PredictionService;
use koi_portal::KoiError;
use std::io::Write;

/// The 19 raw catalog columns the reference model was trained on
const RAW_FEATURES: [&str; 19] = [
    "koi_period",
    "koi_time0bk",
    "koi_impact",
    "koi_duration",
    "koi_depth",
    "koi_prad",
    "koi_teq",
    "koi_insol",
    "koi_model_snr",
    "koi_steff",
    "koi_slogg",
    "koi_srad",
    "ra",
    "dec",
    "koi_kepmag",
    "koi_fpflag_nt",
    "koi_fpflag_ss",
    "koi_fpflag_co",
    "koi_fpflag_ec",
];

/// Earth-analog sample row, aligned with RAW_FEATURES
const EARTH_ANALOG: [f64; 19] = [
    365.25, 131.5, 0.5, 6.0, 1000.0, 1.0, 288.0, 1.0, 20.0, 5778.0, 4.44, 1.0, 290.0, 42.0, 12.0,
    0.0, 0.0, 0.0, 0.0,
];

/// Build a valid bundle: 19 raw columns collapse to 19 engineered
/// features (three consumed, three derived), so coefficients are 3 x 19.
fn write_bundle() -> tempfile::NamedTempFile {
    let bundle = serde_json::json!({
        "classes": ["CANDIDATE", "CONFIRMED", "FALSE POSITIVE"],
        "feature_names": RAW_FEATURES,
        "coefficients": [vec![0.0f64; 19], vec![0.0f64; 19], vec![0.0f64; 19]],
        "intercepts": [0.3, 0.2, 0.1],
        "accuracy": 0.91
    });

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{bundle}").unwrap();
    file.flush().unwrap();
    file
}

fn load_service() -> PredictionService {
    let bundle = write_bundle();
    PredictionService::load(bundle.path().to_str().unwrap()).unwrap()
}

fn earth_csv() -> Vec<u8> {
    let header = RAW_FEATURES.join(",");
    let row = EARTH_ANALOG
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{header}\n{row}\n").into_bytes()
}

#[test]
fn test_end_to_end_earth_analog_csv() {
    let service = load_service();
    let df = read_table(&earth_csv(), "earth.csv").unwrap();
    let batch = service.predict_table(&df).unwrap();

    assert_eq!(batch.total_samples, 1);
    let record = &batch.predictions[0];
    assert!(Disposition::ALL.contains(&record.prediction));

    let total = record.probabilities.candidate
        + record.probabilities.confirmed
        + record.probabilities.false_positive;
    assert!((total - 1.0).abs() < 1e-4);

    let max = record
        .probabilities
        .candidate
        .max(record.probabilities.confirmed)
        .max(record.probabilities.false_positive);
    assert_eq!(record.confidence, max);
}

#[test]
fn test_summary_counts_cover_batch() {
    let service = load_service();
    let header = RAW_FEATURES.join(",");
    let row = EARTH_ANALOG
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let csv = format!("{header}\n{row}\n{row}\n{row}\n");

    let df = read_table(csv.as_bytes(), "batch.csv").unwrap();
    let batch = service.predict_table(&df).unwrap();

    assert_eq!(batch.total_samples, 3);
    let counted =
        batch.summary.candidate + batch.summary.confirmed + batch.summary.false_positive;
    assert_eq!(counted, 3);
}

#[test]
fn test_predictions_are_idempotent() {
    let service = load_service();
    let df = read_table(&earth_csv(), "earth.csv").unwrap();

    let first = service.predict_table(&df).unwrap();
    let second = service.predict_table(&df).unwrap();

    let a = &first.predictions[0];
    let b = &second.predictions[0];
    assert_eq!(a.prediction, b.prediction);
    assert_eq!(a.probabilities.candidate, b.probabilities.candidate);
    assert_eq!(a.probabilities.confirmed, b.probabilities.confirmed);
    assert_eq!(a.probabilities.false_positive, b.probabilities.false_positive);
}

#[test]
fn test_half_missing_columns_on_first_fit_is_schema_mismatch() {
    // Fresh, unfitted service: statistics cannot be established for the
    // absent half of the schema
    let service = load_service();
    let csv = b"koi_period,koi_prad,koi_slogg,koi_srad\n365.25,1.0,4.44,1.0\n";
    let df = read_table(csv, "partial.csv").unwrap();

    let err = service.predict_table(&df).unwrap_err();
    assert!(matches!(err, KoiError::SchemaMismatch(_)));
}

#[test]
fn test_missing_columns_after_fit_are_flagged() {
    let service = load_service();

    // Establish statistics from a complete batch first
    let df = read_table(&earth_csv(), "earth.csv").unwrap();
    service.predict_table(&df).unwrap();

    // Then an upload missing most of the schema still classifies, with
    // the inserted columns reported
    let csv = b"koi_period,koi_prad,koi_slogg,koi_srad\n10.5,2.0,4.3,1.1\n";
    let partial = read_table(csv, "partial.csv").unwrap();
    let batch = service.predict_table(&partial).unwrap();

    assert_eq!(batch.total_samples, 1);
    assert!(batch.missing_features.contains(&"koi_depth".to_string()));
    assert!(batch.missing_features.contains(&"ra".to_string()));
}

#[test]
fn test_windows_1252_upload_classifies() {
    let service = load_service();

    let header = RAW_FEATURES.join(",");
    let row = EARTH_ANALOG
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    // Append a text column with a Windows-1252 é so the bytes are not UTF-8
    let mut bytes = format!("{header},note\n{row},Kepler-").into_bytes();
    bytes.push(0xE9);
    bytes.extend_from_slice(b"\n");

    let df = read_table(&bytes, "catalog.csv").unwrap();
    let batch = service.predict_table(&df).unwrap();
    assert_eq!(batch.total_samples, 1);
}

#[test]
fn test_unrelated_table_is_schema_mismatch() {
    let service = load_service();
    let df = read_table(b"x,y\n1,2\n3,4\n", "other.csv").unwrap();

    let err = service.predict_table(&df).unwrap_err();
    assert!(matches!(err, KoiError::SchemaMismatch(_)));
}
