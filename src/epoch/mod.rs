//! Observation epochs: timestamped sets of satellite observations.
mod formatting;
mod observation;
mod parsing;

pub(crate) use observation::{split_fields, RINEX2_FIELDS_PER_LINE};
pub(crate) use parsing::{
    calendar_epoch, parse_epoch_header, parse_sv, parse_sv_list, EpochHeader,
    RINEX2_SATS_PER_LINE, RINEX2_SV_LIST_END, RINEX2_SV_LIST_START,
};
pub use parsing::resolve_year;

use crate::{
    errors::ParsingError,
    header::FieldMap,
    prelude::{Epoch, SV},
};

use strum_macros::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// [EpochFlag] qualifies each epoch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EpochFlag {
    /// Epoch is sane
    Ok,
    /// Power failure since previous epoch
    PowerFailure,
    /// Antenna is being moved
    AntennaBeingMoved,
    /// Site has changed, end of kinematic data
    NewSiteOccupation,
    /// Header information follows
    HeaderInformationFollows,
    /// External event
    ExternalEvent,
    /// Cycle slip records follow
    CycleSlip,
}

impl Default for EpochFlag {
    fn default() -> Self {
        Self::Ok
    }
}

impl EpochFlag {
    /// True if this epoch may be used in the time series.
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// True if this flag announces special records (header lines, events)
    /// instead of satellite records.
    pub fn announces_special_records(self) -> bool {
        matches!(
            self,
            Self::AntennaBeingMoved
                | Self::NewSiteOccupation
                | Self::HeaderInformationFollows
                | Self::ExternalEvent
        )
    }

    /// RINEX digit of this flag
    pub fn digit(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::PowerFailure => 1,
            Self::AntennaBeingMoved => 2,
            Self::NewSiteOccupation => 3,
            Self::HeaderInformationFollows => 4,
            Self::ExternalEvent => 5,
            Self::CycleSlip => 6,
        }
    }
}

impl std::str::FromStr for EpochFlag {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self::Ok),
            "1" => Ok(Self::PowerFailure),
            "2" => Ok(Self::AntennaBeingMoved),
            "3" => Ok(Self::NewSiteOccupation),
            "4" => Ok(Self::HeaderInformationFollows),
            "5" => Ok(Self::ExternalEvent),
            "6" => Ok(Self::CycleSlip),
            _ => Err(ParsingError::EpochFlag),
        }
    }
}

/// Epoch header layouts we know how to decode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EpochFormat {
    /// Fixed columns, 2 digit year, satellite list on the epoch line(s)
    Rinex2,
    /// `>` prefixed, 4 digit year, one line per satellite record
    Rinex3,
    /// Compact RINEX: `&` prefixed (V1) or `>` prefixed (V3)
    /// initialization lines. Only the epoch header is decoded.
    Crinex,
}

impl EpochFormat {
    /// Identifies an epoch header line from its leading characters.
    /// `crinex` indicates a Compact RINEX file, where `>` lines are
    /// compressed epochs and blank-led lines are differential content.
    pub fn detect(line: &str, crinex: bool) -> Option<Self> {
        let bytes = line.as_bytes();
        match bytes.first()? {
            b'>' => {
                if crinex {
                    Some(Self::Crinex)
                } else {
                    Some(Self::Rinex3)
                }
            },
            b'&' => Some(Self::Crinex),
            b' ' => {
                // year digits, then the F11.7 seconds decimal point
                if crinex || bytes.len() < 29 || bytes[18] != b'.' {
                    return None;
                }
                let year = line.get(1..3)?.trim();
                if !year.is_empty() && year.bytes().all(|b| b.is_ascii_digit()) {
                    Some(Self::Rinex2)
                } else {
                    None
                }
            },
            _ => None,
        }
    }
}

/// Observations of one satellite, at one epoch.
/// Missing observations are NaN.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteObservation {
    /// Satellite
    pub sv: SV,
    /// Pseudo range (m)
    pub pseudorange: f64,
    /// Carrier phase (cycles)
    pub phase: f64,
    /// Signal strength (dB-Hz)
    pub signal_strength: f64,
}

impl PartialEq for SatelliteObservation {
    fn eq(&self, rhs: &Self) -> bool {
        fn same(a: f64, b: f64) -> bool {
            (a.is_nan() && b.is_nan()) || a == b
        }
        self.sv == rhs.sv
            && same(self.pseudorange, rhs.pseudorange)
            && same(self.phase, rhs.phase)
            && same(self.signal_strength, rhs.signal_strength)
    }
}

impl SatelliteObservation {
    /// Satellite without measurements.
    pub fn empty(sv: SV) -> Self {
        Self {
            sv,
            pseudorange: f64::NAN,
            phase: f64::NAN,
            signal_strength: f64::NAN,
        }
    }

    /// Picks our observables out of a decoded record.
    pub fn from_fields(sv: SV, fields: &[f64], map: &FieldMap) -> Self {
        let pick = |index: Option<usize>| {
            index
                .and_then(|i| fields.get(i).copied())
                .unwrap_or(f64::NAN)
        };
        Self {
            sv,
            pseudorange: pick(map.pseudorange),
            phase: pick(map.phase),
            signal_strength: pick(map.signal_strength),
        }
    }

    /// Returns [SatelliteObservation] with desired pseudo range (m).
    pub fn with_pseudorange(&self, pseudorange: f64) -> Self {
        let mut s = *self;
        s.pseudorange = pseudorange;
        s
    }

    /// Returns [SatelliteObservation] with desired carrier phase.
    pub fn with_phase(&self, phase: f64) -> Self {
        let mut s = *self;
        s.phase = phase;
        s
    }

    /// Returns [SatelliteObservation] with desired signal strength.
    pub fn with_signal_strength(&self, signal_strength: f64) -> Self {
        let mut s = *self;
        s.signal_strength = signal_strength;
        s
    }
}

/// [ObservationEpoch]: one observation cycle across all tracked satellites.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationEpoch {
    /// Sampling instant
    pub epoch: Epoch,
    /// Epoch qualification
    pub flag: EpochFlag,
    /// Layout this epoch was decoded from
    pub format: EpochFormat,
    /// Number of satellites (or special records) declared by the epoch header
    pub declared: usize,
    /// Satellite observations, in file order
    pub observations: Vec<SatelliteObservation>,
}

impl ObservationEpoch {
    /// Builds an empty [ObservationEpoch].
    pub fn new(epoch: Epoch, flag: EpochFlag, format: EpochFormat, declared: usize) -> Self {
        Self {
            epoch,
            flag,
            format,
            declared,
            observations: Vec::with_capacity(declared),
        }
    }

    /// True if this epoch is flagged sane.
    pub fn is_ok(&self) -> bool {
        self.flag.is_ok()
    }

    /// True once all declared satellite records were collected.
    pub fn is_complete(&self) -> bool {
        self.observations.len() >= self.declared
    }

    /// Returns the observation of this [SV], if any.
    pub fn observation(&self, sv: SV) -> Option<&SatelliteObservation> {
        self.observations.iter().find(|obs| obs.sv == sv)
    }

    /// Returns [ObservationEpoch] with one more [SatelliteObservation].
    pub fn with_observation(&self, observation: SatelliteObservation) -> Self {
        let mut s = self.clone();
        s.observations.push(observation);
        s
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn flags() {
        for (digit, flag) in [
            ("0", EpochFlag::Ok),
            ("1", EpochFlag::PowerFailure),
            ("4", EpochFlag::HeaderInformationFollows),
            ("6", EpochFlag::CycleSlip),
        ] {
            let parsed = EpochFlag::from_str(digit).unwrap();
            assert_eq!(parsed, flag);
            assert_eq!(parsed.digit().to_string(), digit);
        }
        assert!(EpochFlag::from_str("7").is_err());
        assert!(EpochFlag::from_str("").is_err());
        assert!(EpochFlag::Ok.is_ok());
        assert!(!EpochFlag::PowerFailure.is_ok());
        assert!(EpochFlag::ExternalEvent.announces_special_records());
        assert!(!EpochFlag::CycleSlip.announces_special_records());
    }

    #[test]
    fn format_detection() {
        for (line, crinex, expected) in [
            (
                " 22  1  5  0  0  0.0000000  0  3G01G03G07",
                false,
                Some(EpochFormat::Rinex2),
            ),
            (
                "> 2022 01 05 00 00  0.0000000  0  3",
                false,
                Some(EpochFormat::Rinex3),
            ),
            (
                "> 2022 01 05 00 00  0.0000000  0  3",
                true,
                Some(EpochFormat::Crinex),
            ),
            (
                "&22  1  5  0  0  0.0000000  0  3G01G03G07",
                true,
                Some(EpochFormat::Crinex),
            ),
            (" 22  1  5  0  0  0.0000000  0  3G01G03G07", true, None),
            ("G01  23619095.450  -53875.632", false, None),
            ("  23619095.450  -53875.632 8", false, None),
            (" 22  1  5", false, None),
            ("", false, None),
        ] {
            assert_eq!(EpochFormat::detect(line, crinex), expected, "\"{}\"", line);
        }
    }
}
