//! Polynomial detrending
use polyfit_rs::polyfit_rs::polyfit;
use thiserror::Error;

use crate::utils::mean;

/// Detrending errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// More samples than polynomial coefficients are required
    #[error("detrending requires at least {0} samples")]
    NotEnoughSamples(usize),
    /// All samples share the same timestamp
    #[error("degenerate time axis")]
    DegenerateTimeAxis,
    /// Non finite input or solver failure
    #[error("polynomial regression failure")]
    RegressionFailure,
}

/// Evaluates a polynomial, coefficients by increasing order.
fn evaluate(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Fits a polynomial of desired degree to `(times, values)`
/// and returns the residuals (values minus fit).
/// Time is centered and scaled to [-1, 1], values are centered,
/// before fitting.
pub fn detrend(times: &[f64], values: &[f64], degree: usize) -> Result<Vec<f64>, FitError> {
    let size = times.len().min(values.len());
    if size <= degree + 1 {
        return Err(FitError::NotEnoughSamples(degree + 2));
    }

    let (times, values) = (&times[..size], &values[..size]);

    if times.iter().chain(values.iter()).any(|v| !v.is_finite()) {
        return Err(FitError::RegressionFailure);
    }

    let (t_min, t_max) = times
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), t| {
            (min.min(*t), max.max(*t))
        });

    let half_span = (t_max - t_min) / 2.0;
    if half_span <= 0.0 {
        return Err(FitError::DegenerateTimeAxis);
    }

    let t_mid = (t_max + t_min) / 2.0;
    let y_mean = mean(values).ok_or(FitError::NotEnoughSamples(degree + 2))?;

    let x = times
        .iter()
        .map(|t| (t - t_mid) / half_span)
        .collect::<Vec<_>>();

    let y = values.iter().map(|v| v - y_mean).collect::<Vec<_>>();

    let coefficients = polyfit(&x, &y, degree).or(Err(FitError::RegressionFailure))?;

    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(FitError::RegressionFailure);
    }

    Ok(x
        .iter()
        .zip(y.iter())
        .map(|(x, y)| y - evaluate(&coefficients, *x))
        .collect())
}
