//! Code minus carrier variability
use super::{detrend, FitError};
use crate::{
    prelude::SV,
    series::SatelliteTimeSeries,
    utils::std_dev,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// [MultipathAnalysis]: variability of the code minus carrier
/// combination of one satellite. The combination is a relative
/// indicator, ambiguities and the phase unit are not resolved.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultipathAnalysis {
    /// Satellite
    pub sv: SV,
    /// Samples carrying both code and phase
    pub samples: usize,
    /// Standard deviation of the linearly detrended combination
    pub std: f64,
    /// Largest absolute value of the linearly detrended combination
    pub max: f64,
}

/// Linearly detrends the pseudo range minus carrier phase of `series`,
/// using the samples where both are finite.
/// Fails with fewer than `min_samples` such samples.
pub fn multipath(
    series: &SatelliteTimeSeries,
    min_samples: usize,
) -> Result<MultipathAnalysis, FitError> {
    let (times, combination): (Vec<f64>, Vec<f64>) = series
        .samples()
        .iter()
        .filter(|s| s.pseudorange.is_finite() && s.phase.is_finite())
        .map(|s| (s.elapsed_s, s.pseudorange - s.phase))
        .unzip();

    if times.len() < min_samples {
        return Err(FitError::NotEnoughSamples(min_samples));
    }

    let residuals = detrend(&times, &combination, 1)?;

    Ok(MultipathAnalysis {
        sv: series.sv,
        samples: times.len(),
        std: std_dev(&residuals).unwrap_or(0.0),
        max: residuals.iter().fold(0.0_f64, |max, r| max.max(r.abs())),
    })
}
