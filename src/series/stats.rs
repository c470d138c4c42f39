use crate::utils::{diff, mean, median, std_dev};

use itertools::{Itertools, MinMaxResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sane epoch whose satellite count departs from the median
/// by more than 3 standard deviations
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteCountAnomaly {
    /// Elapsed time of the epoch (s)
    pub elapsed_s: f64,
    /// Satellites reporting in that epoch
    pub satellites: usize,
    /// Signed departure from the median count
    pub deviation: f64,
}

/// Flags the counts departing from their median by more than 3 standard deviations.
fn count_anomalies(satellites: &[(f64, usize)]) -> Vec<SatelliteCountAnomaly> {
    let counts = satellites
        .iter()
        .map(|(_, n)| *n as f64)
        .collect::<Vec<_>>();

    let (typical, sigma) = match (median(&counts), std_dev(&counts)) {
        (Some(typical), Some(sigma)) => (typical, sigma),
        _ => return Vec::new(),
    };

    satellites
        .iter()
        .filter_map(|(elapsed_s, n)| {
            let deviation = *n as f64 - typical;
            if deviation.abs() > 3.0 * sigma {
                Some(SatelliteCountAnomaly {
                    elapsed_s: *elapsed_s,
                    satellites: *n,
                    deviation,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Sampling regularity of a file
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SamplingStats {
    /// Number of epochs (any flag)
    pub epochs: usize,
    /// Mean epoch interval (s)
    pub mean_interval_s: Option<f64>,
    /// Median epoch interval (s)
    pub median_interval_s: Option<f64>,
    /// Standard deviation of the epoch interval (s)
    pub std_interval_s: Option<f64>,
    /// Shortest epoch interval (s)
    pub min_interval_s: Option<f64>,
    /// Longest epoch interval (s)
    pub max_interval_s: Option<f64>,
    /// Fewest satellites in a sane epoch
    pub min_satellites: usize,
    /// Average number of satellites in sane epochs
    pub mean_satellites: f64,
    /// Most satellites in a sane epoch
    pub max_satellites: usize,
    /// Sane epochs with an unusual number of satellites
    pub satellite_anomalies: Vec<SatelliteCountAnomaly>,
}

impl SamplingStats {
    /// Derives [SamplingStats] from epoch elapsed times (s)
    /// and the (elapsed time, number of satellites) of each sane epoch.
    pub(crate) fn new(epoch_times: &[f64], satellites: &[(f64, usize)]) -> Self {
        let intervals = diff(epoch_times);

        let (min_interval_s, max_interval_s) = match intervals
            .iter()
            .copied()
            .minmax_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        {
            MinMaxResult::NoElements => (None, None),
            MinMaxResult::OneElement(dt) => (Some(dt), Some(dt)),
            MinMaxResult::MinMax(min, max) => (Some(min), Some(max)),
        };

        let (min_satellites, max_satellites) = match satellites.iter().map(|(_, n)| *n).minmax() {
            MinMaxResult::NoElements => (0, 0),
            MinMaxResult::OneElement(n) => (n, n),
            MinMaxResult::MinMax(min, max) => (min, max),
        };

        let mean_satellites = if satellites.is_empty() {
            0.0
        } else {
            satellites.iter().map(|(_, n)| *n).sum::<usize>() as f64 / satellites.len() as f64
        };

        Self {
            epochs: epoch_times.len(),
            mean_interval_s: mean(&intervals),
            median_interval_s: median(&intervals),
            std_interval_s: std_dev(&intervals),
            min_interval_s,
            max_interval_s,
            min_satellites,
            mean_satellites,
            max_satellites,
            satellite_anomalies: count_anomalies(satellites),
        }
    }
}
