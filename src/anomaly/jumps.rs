//! Residual discontinuities
use crate::{
    prelude::{Epoch, SV},
    utils::{diff, median, std_dev},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// [AnomalyEvent]: one residual discontinuity of one satellite
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnomalyEvent {
    /// Satellite
    pub sv: SV,
    /// Index of the sample following the discontinuity
    pub index: usize,
    /// Elapsed time of that sample (s)
    pub elapsed_s: f64,
    /// Datation of that sample, when the series origin is known
    pub epoch: Option<Epoch>,
    /// Residual step (m), signed
    pub magnitude: f64,
    /// Step expressed in multiples of the robust noise level
    pub significance: f64,
}

/// Robust noise level of the differenced residuals: standard deviation
/// of the differences smaller than 3 times the median absolute difference.
pub fn robust_std(diffs: &[f64]) -> Option<f64> {
    let magnitudes = diffs.iter().map(|d| d.abs()).collect::<Vec<_>>();
    let cutoff = 3.0 * median(&magnitudes)?;

    let inliers = diffs
        .iter()
        .copied()
        .filter(|d| d.abs() < cutoff)
        .collect::<Vec<_>>();

    std_dev(&inliers)
}

/// Flags every residual step exceeding `threshold_sigma` times the robust
/// noise level. A null noise level flags nothing.
pub fn detect_jumps(
    sv: SV,
    times: &[f64],
    residuals: &[f64],
    threshold_sigma: f64,
) -> Vec<AnomalyEvent> {
    let diffs = diff(residuals);

    let sigma = match robust_std(&diffs) {
        Some(sigma) if sigma > 0.0 => sigma,
        _ => return Vec::new(),
    };

    diffs
        .iter()
        .enumerate()
        .filter(|(_, d)| d.abs() > threshold_sigma * sigma)
        .filter_map(|(i, d)| {
            let elapsed_s = *times.get(i + 1)?;
            Some(AnomalyEvent {
                sv,
                index: i + 1,
                elapsed_s,
                epoch: None,
                magnitude: *d,
                significance: d.abs() / sigma,
            })
        })
        .collect()
}
