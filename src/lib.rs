#![doc(html_logo_url = "https://raw.githubusercontent.com/rtk-rs/.github/master/logos/logo2.jpg")]
#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

/*
 * gnss-anomaly is part of the rtk-rs framework.
 * Authors: Guillaume W. Bres <guillaume.bressaix@gmail.com> et al.
 * (cf. https://github.com/rtk-rs/gnss-anomaly/graphs/contributors)
 * This framework is shipped under Mozilla Public V2 license.
 *
 * Documentation: https://github.com/rtk-rs/gnss-anomaly
 */

extern crate gnss_rs as gnss;

#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

pub mod anomaly;
pub mod decoder;
pub mod epoch;
pub mod errors;
pub mod header;
pub mod sbf;
pub mod series;

mod utils;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use crate::{
        anomaly::{
            AnomalyEvent, AnomalyReport, CorrelatedAnomaly, Detector, DetectorConfig,
            MultipathAnalysis, RankBy, SatelliteAnalysis, SpectralPeak,
        },
        decoder::{Decoder, DecoderOptions, DecodingStats},
        epoch::{EpochFlag, EpochFormat, ObservationEpoch, SatelliteObservation},
        errors::{Error, ParsingError},
        header::{Coordinates, Header, TimeSystem, Version},
        sbf::{ScanOptions, ScanReport},
        series::{
            Assembler, Gap, Sample, SamplingStats, SatelliteCountAnomaly, SatelliteTimeSeries,
            TimeSeries,
        },
    };

    // pub re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::prelude::{Duration, Epoch, TimeScale};
}
