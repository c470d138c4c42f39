//! RINEX observation header
mod formatting;
mod parsing;
mod time_system;
mod version;

pub(crate) use parsing::HeaderParser;
pub use time_system::TimeSystem;
pub use version::Version;

use crate::prelude::{Constellation, Epoch};
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// WGS84 semi major axis (m)
const WGS84_SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;

/// WGS84 first eccentricity squared
const WGS84_ECCENTRICITY_SQUARED: f64 = 0.006_694_379_990_14;

/// ECEF coordinates (m)
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinates {
    /// Converts these ECEF [Coordinates] to geodetic
    /// (latitude (ddeg), longitude (ddeg), height above ellipsoid (m)), WGS84.
    pub fn to_geodetic(&self) -> (f64, f64, f64) {
        let a = WGS84_SEMI_MAJOR_AXIS_M;
        let e2 = WGS84_ECCENTRICITY_SQUARED;

        let lon = self.y.atan2(self.x);
        let p = (self.x.powi(2) + self.y.powi(2)).sqrt();

        let mut lat = self.z.atan2(p * (1.0 - e2));

        for _ in 0..5 {
            let n = a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
            let h = p / lat.cos() - n;
            lat = self.z.atan2(p * (1.0 - e2 * n / (n + h)));
        }

        let n = a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        let h = p / lat.cos() - n;

        (lat.to_degrees(), lon.to_degrees(), h)
    }
}

/// Indices of the observables we track, within one satellite record.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct FieldMap {
    /// First code (pseudo range) observable
    pub pseudorange: Option<usize>,
    /// First carrier phase observable
    pub phase: Option<usize>,
    /// First signal strength observable
    pub signal_strength: Option<usize>,
}

impl FieldMap {
    /// Locates our observables within an observable list.
    /// Without list, the first two fields are assumed to be code and phase.
    pub fn new(codes: &[String]) -> Self {
        if codes.is_empty() {
            return Self {
                pseudorange: Some(0),
                phase: Some(1),
                signal_strength: None,
            };
        }
        Self {
            pseudorange: codes
                .iter()
                .position(|code| code.starts_with('C') || code.starts_with('P')),
            phase: codes.iter().position(|code| code.starts_with('L')),
            signal_strength: codes.iter().position(|code| code.starts_with('S')),
        }
    }
}

/// RINEX observation [Header]
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Header {
    /// File revision
    pub version: Version,
    /// True for Compact RINEX (Hatanaka) files
    pub crinex: bool,
    /// Declared constellation (possibly mixed)
    pub constellation: Option<Constellation>,
    /// Station / marker name
    pub marker: Option<String>,
    /// Approximate receiver position
    pub position: Option<Coordinates>,
    /// Sampling interval (s)
    pub interval: Option<f64>,
    /// Timestamp of first observation
    pub time_of_first_obs: Option<Epoch>,
    /// Time system of the observations
    pub time_system: TimeSystem,
    /// Observables per constellation (RINEX3)
    pub observables: HashMap<Constellation, Vec<String>>,
    /// Observables shared by all constellations (RINEX2)
    pub global_observables: Vec<String>,
    /// Header comments
    pub comments: Vec<String>,
}

impl Header {
    /// Returns the observables of given [Constellation]:
    /// the per constellation table when it exists, the global table otherwise.
    pub fn observables_of(&self, constellation: Constellation) -> &[String] {
        match self.observables.get(&constellation) {
            Some(codes) => codes,
            None => &self.global_observables,
        }
    }

    /// Number of observables per satellite record, for this [Constellation].
    pub fn nb_observables(&self, constellation: Constellation) -> usize {
        self.observables_of(constellation).len()
    }

    /// Returns the [FieldMap] to use for this [Constellation].
    pub fn field_map(&self, constellation: Constellation) -> FieldMap {
        FieldMap::new(self.observables_of(constellation))
    }

    /// Returns [Header] with desired sampling interval (s).
    pub fn with_interval(&self, interval: f64) -> Self {
        let mut s = self.clone();
        s.interval = Some(interval);
        s
    }

    /// Returns [Header] with desired [Coordinates].
    pub fn with_position(&self, position: Coordinates) -> Self {
        let mut s = self.clone();
        s.position = Some(position);
        s
    }

    /// Returns [Header] with desired marker name.
    pub fn with_marker(&self, marker: &str) -> Self {
        let mut s = self.clone();
        s.marker = Some(marker.to_string());
        s
    }

    /// Returns [Header] with observables for this [Constellation].
    pub fn with_observables(&self, constellation: Constellation, codes: &[&str]) -> Self {
        let mut s = self.clone();
        s.observables.insert(
            constellation,
            codes.iter().map(|code| code.to_string()).collect(),
        );
        s
    }

    /// Returns [Header] with desired first observation [Epoch].
    pub fn with_time_of_first_obs(&self, epoch: Epoch) -> Self {
        let mut s = self.clone();
        s.time_of_first_obs = Some(epoch);
        s
    }
}
