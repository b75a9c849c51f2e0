//! Derived transit features
//!
//! Closed-form astrophysical quantities computed per row from the raw
//! catalog measurements. The raw columns consumed here are removed
//! afterwards so they cannot count as both raw and derived features.

use crate::error::{KoiError, Result};
use polars::prelude::*;
use std::f64::consts::PI;

pub const GRAVITATIONAL_CONSTANT: f64 = 6.674_30e-11; // m^3 kg^-1 s^-2
pub const SOLAR_RADIUS_M: f64 = 6.957e8;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

// Catalog log g is log10 of surface gravity in cgs units
const CGS_GRAVITY_TO_SI: f64 = 1e-2;

const SURFACE_GRAVITY_LOG: &str = "koi_slogg";
const STELLAR_RADIUS: &str = "koi_srad";
const ORBITAL_PERIOD: &str = "koi_period";
const PLANET_RADIUS: &str = "koi_prad";

fn column_f64(df: &DataFrame, name: &str) -> Option<Float64Chunked> {
    df.column(name)
        .ok()
        .and_then(|col| col.f64().ok().cloned())
}

/// Scaled semi-major axis from Kepler's third law.
///
/// Implied stellar mass comes from surface gravity and radius
/// (`g R^2 / G`), then `a = (G M T^2 / 4 pi^2)^(1/3)` is expressed in
/// units of the stellar radius.
fn semi_major_axis_ratio(slogg: f64, srad: f64, period_days: f64) -> f64 {
    let gravity_si = 10f64.powf(slogg) * CGS_GRAVITY_TO_SI;
    let radius_m = srad * SOLAR_RADIUS_M;
    let stellar_mass = gravity_si * radius_m * radius_m / GRAVITATIONAL_CONSTANT;
    let period_s = period_days * SECONDS_PER_DAY;
    let semi_major_axis = (GRAVITATIONAL_CONSTANT * stellar_mass * period_s * period_s
        / (4.0 * PI * PI))
        .cbrt();
    semi_major_axis / radius_m
}

/// Compute the derived feature columns and drop the raw columns they
/// consume. Pure and stateless; each derived column is only produced when
/// all of its inputs are present.
pub fn engineer_features(df: &DataFrame) -> Result<DataFrame> {
    let mut result = df.clone();

    let slogg = column_f64(df, SURFACE_GRAVITY_LOG);
    let srad = column_f64(df, STELLAR_RADIUS);
    let period = column_f64(df, ORBITAL_PERIOD);
    let prad = column_f64(df, PLANET_RADIUS);

    if let Some(slogg) = slogg.as_ref() {
        let density: Float64Chunked = slogg
            .into_iter()
            .map(|opt| opt.map(|v| 10f64.powf(v)))
            .collect();
        result = result
            .with_column(density.with_name("stellar_density".into()).into_series())
            .map_err(|e| KoiError::DataError(e.to_string()))?
            .clone();
    }

    if let (Some(prad), Some(srad)) = (prad.as_ref(), srad.as_ref()) {
        let ratio: Float64Chunked = prad
            .into_iter()
            .zip(srad.into_iter())
            .map(|(p, s)| match (p, s) {
                (Some(p), Some(s)) => Some(p / s),
                _ => None,
            })
            .collect();
        result = result
            .with_column(ratio.with_name("prad_srad_ratio".into()).into_series())
            .map_err(|e| KoiError::DataError(e.to_string()))?
            .clone();
    }

    if let (Some(slogg), Some(srad), Some(period)) = (slogg.as_ref(), srad.as_ref(), period.as_ref())
    {
        let ratio: Float64Chunked = slogg
            .into_iter()
            .zip(srad.into_iter())
            .zip(period.into_iter())
            .map(|((g, s), t)| match (g, s, t) {
                (Some(g), Some(s), Some(t)) => Some(semi_major_axis_ratio(g, s, t)),
                _ => None,
            })
            .collect();
        result = result
            .with_column(ratio.with_name("a_div_rs".into()).into_series())
            .map_err(|e| KoiError::DataError(e.to_string()))?
            .clone();
    }

    for name in [SURFACE_GRAVITY_LOG, STELLAR_RADIUS, ORBITAL_PERIOD] {
        if result.column(name).is_ok() {
            result = result
                .drop(name)
                .map_err(|e| KoiError::DataError(e.to_string()))?;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn earth_analog() -> DataFrame {
        df!(
            "koi_period" => &[365.25],
            "koi_prad" => &[1.0],
            "koi_slogg" => &[4.44],
            "koi_srad" => &[1.0],
            "koi_teq" => &[288.0]
        )
        .unwrap()
    }

    #[test]
    fn test_earth_analog_semi_major_axis() {
        // Earth-Sun geometry: a / R_sun ~ 215
        let out = engineer_features(&earth_analog()).unwrap();
        let value = out
            .column("a_div_rs")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert!(
            (value - 215.0).abs() / 215.0 < 0.05,
            "a/Rs = {value}, expected ~215"
        );
    }

    #[test]
    fn test_stellar_density_formula() {
        let out = engineer_features(&earth_analog()).unwrap();
        let value = out
            .column("stellar_density")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert!((value - 10f64.powf(4.44)).abs() < 1e-6);
    }

    #[test]
    fn test_radius_ratio() {
        let df = df!(
            "koi_prad" => &[2.0],
            "koi_srad" => &[0.5],
            "koi_slogg" => &[4.4],
            "koi_period" => &[10.0]
        )
        .unwrap();
        let out = engineer_features(&df).unwrap();
        let value = out
            .column("prad_srad_ratio")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert!((value - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_consumed_columns_dropped() {
        let out = engineer_features(&earth_analog()).unwrap();
        assert!(out.column("koi_slogg").is_err());
        assert!(out.column("koi_srad").is_err());
        assert!(out.column("koi_period").is_err());
        // Non-consumed raw columns survive
        assert!(out.column("koi_prad").is_ok());
        assert!(out.column("koi_teq").is_ok());
    }

    #[test]
    fn test_missing_inputs_skip_derivation() {
        let df = df!("koi_teq" => &[288.0]).unwrap();
        let out = engineer_features(&df).unwrap();
        assert!(out.column("stellar_density").is_err());
        assert!(out.column("a_div_rs").is_err());
        assert_eq!(out.width(), 1);
    }
}
