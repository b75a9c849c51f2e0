//! Integration tests: preprocessing pipeline invariants

use koi_portal::preprocessing::{FittedPipeline, TrainingSchema};
use koi_portal::KoiError;
use polars::prelude::*;

fn training_batch() -> DataFrame {
    df!(
        "kepid" => &[100i64, 101, 102, 103, 104],
        "koi_period" => &[365.25, 10.5, 88.0, 225.0, 3.2],
        "koi_prad" => &[1.0, 2.3, 0.4, 0.9, 11.0],
        "koi_slogg" => &[4.44, 4.3, 4.5, 4.45, 4.1],
        "koi_srad" => &[1.0, 1.2, 0.8, 0.95, 1.6],
        "koi_teq" => &[288.0, 1500.0, 400.0, 700.0, 2100.0],
        "koi_fpflag_nt" => &[0.0, 0.0, 0.0, 0.0, 0.0],
        "koi_disposition" => &["CONFIRMED", "CANDIDATE", "FALSE POSITIVE", "CONFIRMED", "CANDIDATE"]
    )
    .unwrap()
}

#[test]
fn test_schema_invariant_holds_for_any_input() {
    let pipeline = FittedPipeline::fit(&training_batch(), None).unwrap();
    let n_features = pipeline.n_features();

    // Reordered, with junk columns and one feature missing
    let weird = df!(
        "junk_a" => &["x", "y"],
        "koi_teq" => &[300.0, 900.0],
        "koi_prad" => &[1.1, 3.0],
        "koi_srad" => &[1.0, 1.3],
        "koi_slogg" => &[4.4, 4.2],
        "koi_period" => &[12.0, 45.0],
        "junk_b" => &[1.0, 2.0]
    )
    .unwrap();

    let (matrix, report) = pipeline.transform(&weird).unwrap();
    assert_eq!(matrix.ncols(), n_features);
    assert_eq!(matrix.nrows(), 2);
    assert!(report
        .missing_columns
        .contains(&"koi_fpflag_nt".to_string()));
    assert!(report.dropped_columns.contains(&"junk_a".to_string()));
}

#[test]
fn test_transform_is_deterministic() {
    let df = training_batch();
    let pipeline = FittedPipeline::fit(&df, None).unwrap();

    let (first, _) = pipeline.transform(&df).unwrap();
    let (second, _) = pipeline.transform(&df).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_zero_variance_feature_stays_zero() {
    let df = training_batch();
    let pipeline = FittedPipeline::fit(&df, None).unwrap();

    // koi_fpflag_nt is constant in the fit batch; find its output column
    let flag_idx = pipeline
        .output_columns()
        .iter()
        .position(|c| c == "koi_fpflag_nt")
        .unwrap();

    // A transform batch where the flag takes values the fit never saw
    let later = df!(
        "koi_period" => &[12.0, 45.0],
        "koi_prad" => &[1.1, 3.0],
        "koi_slogg" => &[4.4, 4.2],
        "koi_srad" => &[1.0, 1.3],
        "koi_teq" => &[300.0, 900.0],
        "koi_fpflag_nt" => &[1.0, 5.0]
    )
    .unwrap();

    let (matrix, _) = pipeline.transform(&later).unwrap();
    for row in 0..matrix.nrows() {
        assert_eq!(matrix[[row, flag_idx]], 0.0);
    }
    assert!(matrix.iter().all(|v| v.is_finite()));
}

#[test]
fn test_fit_once_schema_is_immutable() {
    let pipeline = FittedPipeline::fit(&training_batch(), None).unwrap();
    let frozen: Vec<String> = pipeline.schema().columns().to_vec();

    // Transforming differently-shaped data never mutates the schema
    let other = df!(
        "koi_period" => &[1.0],
        "koi_prad" => &[1.0],
        "koi_slogg" => &[4.0],
        "koi_srad" => &[1.0],
        "koi_teq" => &[300.0],
        "koi_fpflag_nt" => &[0.0],
        "surprise" => &[42.0]
    )
    .unwrap();
    pipeline.transform(&other).unwrap();

    assert_eq!(pipeline.schema().columns(), frozen.as_slice());
}

#[test]
fn test_seeded_schema_defines_feature_order() {
    let seed = TrainingSchema::from_columns(vec![
        "koi_teq".to_string(),
        "koi_prad".to_string(),
        "koi_period".to_string(),
        "koi_slogg".to_string(),
        "koi_srad".to_string(),
    ]);
    let pipeline = FittedPipeline::fit(&training_batch(), Some(seed)).unwrap();

    // Seed order wins over input order; consumed raw columns are replaced
    // by the derived ones at the end
    assert_eq!(
        pipeline.output_columns(),
        &[
            "koi_teq".to_string(),
            "koi_prad".to_string(),
            "stellar_density".to_string(),
            "prad_srad_ratio".to_string(),
            "a_div_rs".to_string()
        ]
    );
}

#[test]
fn test_all_features_missing_is_schema_mismatch() {
    let pipeline = FittedPipeline::fit(&training_batch(), None).unwrap();

    let unrelated = df!(
        "x" => &[1.0, 2.0],
        "y" => &[3.0, 4.0]
    )
    .unwrap();
    let err = pipeline.transform(&unrelated).unwrap_err();
    assert!(matches!(err, KoiError::SchemaMismatch(_)));
}

#[test]
fn test_missing_values_are_imputed_not_fatal() {
    let df = df!(
        "koi_period" => &[Some(365.25), Some(10.5), Some(88.0)],
        "koi_prad" => &[Some(1.0), None, Some(0.4)],
        "koi_slogg" => &[4.44, 4.3, 4.5],
        "koi_srad" => &[1.0, 1.2, 0.8],
        "koi_teq" => &[Some(288.0), Some(1500.0), None]
    )
    .unwrap();

    let pipeline = FittedPipeline::fit(&df, None).unwrap();
    let (matrix, _) = pipeline.transform(&df).unwrap();
    assert!(matrix.iter().all(|v| v.is_finite()));
}
