use crate::{prelude::SV, utils::median};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One [Sample] of a [SatelliteTimeSeries]
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Elapsed time since first epoch of the file (s)
    pub elapsed_s: f64,
    /// Pseudo range (m)
    pub pseudorange: f64,
    /// Carrier phase (cycles), possibly NaN
    pub phase: f64,
}

/// [SatelliteTimeSeries]: chronological [Sample]s of one [SV].
/// Elapsed times never decrease.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteTimeSeries {
    /// Satellite
    pub sv: SV,
    samples: Vec<Sample>,
}

impl SatelliteTimeSeries {
    /// Allocates a new [SatelliteTimeSeries]
    pub fn new(sv: SV) -> Self {
        Self {
            sv,
            samples: Vec::with_capacity(1024),
        }
    }

    /// Appends a new [Sample]. Returns false (and drops it)
    /// when it would go backwards in time.
    pub(crate) fn push(&mut self, sample: Sample) -> bool {
        if let Some(last) = self.samples.last() {
            if sample.elapsed_s < last.elapsed_s {
                return false;
            }
        }
        self.samples.push(sample);
        true
    }

    /// All [Sample]s
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Elapsed times (s)
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.elapsed_s).collect()
    }

    /// Pseudo ranges (m)
    pub fn pseudoranges(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.pseudorange).collect()
    }

    /// Carrier phases
    pub fn phases(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.phase).collect()
    }

    /// Time span (s)
    pub fn duration_s(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.elapsed_s - first.elapsed_s,
            _ => 0.0,
        }
    }

    /// Median interval between consecutive samples (s)
    pub fn median_interval_s(&self) -> Option<f64> {
        let intervals = self
            .samples
            .windows(2)
            .map(|w| w[1].elapsed_s - w[0].elapsed_s)
            .collect::<Vec<_>>();
        median(&intervals)
    }
}
