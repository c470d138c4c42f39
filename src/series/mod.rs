//! Per satellite time series assembly
mod satellite;
mod stats;

pub use satellite::{Sample, SatelliteTimeSeries};
pub use stats::{SamplingStats, SatelliteCountAnomaly};

use crate::{
    epoch::ObservationEpoch,
    header::Header,
    prelude::{Duration, Epoch, SV},
    utils::median,
};

use log::{debug, warn};
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interval between two consecutive epochs exceeding twice the sampling interval.
/// Gaps annotate the series, they do not split them.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gap {
    /// Last epoch before the gap
    pub start: Epoch,
    /// Elapsed time of the last epoch before the gap (s)
    pub start_s: f64,
    /// Gap duration (s)
    pub duration_s: f64,
}

/// Assembled [TimeSeries]
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeSeries {
    /// First epoch of the file (any flag), origin of all elapsed times
    pub t0: Option<Epoch>,
    /// Series, per satellite
    pub series: BTreeMap<SV, SatelliteTimeSeries>,
    /// Sampling gaps
    pub gaps: Vec<Gap>,
    /// Sampling statistics
    pub stats: SamplingStats,
    /// Epochs dropped because they went backwards in time
    pub dropped_epochs: usize,
}

impl TimeSeries {
    /// [SatelliteTimeSeries] of this [SV]
    pub fn get(&self, sv: &SV) -> Option<&SatelliteTimeSeries> {
        self.series.get(sv)
    }

    /// Satellites that reported at least once
    pub fn satellites(&self) -> impl Iterator<Item = &SV> + '_ {
        self.series.keys()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// [Assembler] consumes [ObservationEpoch]s in arrival order
/// and grows one [SatelliteTimeSeries] per satellite.
#[derive(Debug, Default, Clone)]
pub struct Assembler {
    /// Header sampling interval (s)
    interval: Option<f64>,
    /// First epoch (any flag)
    t0: Option<Epoch>,
    /// Previous epoch (any flag)
    prev_t: Option<Epoch>,
    /// Elapsed time of every accepted epoch
    epoch_times: Vec<f64>,
    /// Elapsed time and number of satellites of each sane epoch
    satellites: Vec<(f64, usize)>,
    gaps: Vec<Gap>,
    dropped_epochs: usize,
    series: BTreeMap<SV, SatelliteTimeSeries>,
}

impl Assembler {
    /// Allocates a new [Assembler]. Without sampling interval,
    /// gaps are determined against the median epoch interval
    /// once the assembly is finished.
    pub fn new() -> Self {
        Self {
            epoch_times: Vec::with_capacity(1024),
            satellites: Vec::with_capacity(1024),
            ..Default::default()
        }
    }

    /// Allocates a new [Assembler] using the [Header] sampling interval.
    pub fn from_header(header: &Header) -> Self {
        match header.interval {
            Some(interval) => Self::new().with_sampling_interval(interval),
            None => Self::new(),
        }
    }

    /// Returns [Assembler] with desired sampling interval (s).
    /// Non positive intervals are ignored.
    pub fn with_sampling_interval(&self, interval: f64) -> Self {
        let mut s = self.clone();
        if interval > 0.0 {
            s.interval = Some(interval);
        }
        s
    }

    fn gap(&self, start_s: f64, duration_s: f64) -> Option<Gap> {
        let t0 = self.t0?;
        debug!("{:.3}s data gap at t0 + {:.3}s", duration_s, start_s);
        Some(Gap {
            start: t0 + Duration::from_seconds(start_s),
            start_s,
            duration_s,
        })
    }

    /// Consumes a new [ObservationEpoch].
    /// Epochs are accounted for whatever their flag, only sane epochs
    /// contribute to the series.
    pub fn consume(&mut self, epoch: &ObservationEpoch) {
        let t = epoch.epoch;

        if let Some(prev_t) = self.prev_t {
            if t < prev_t {
                warn!("{:?}: epoch goes backwards in time, dropped", t);
                self.dropped_epochs += 1;
                return;
            }
        }

        let t0 = *self.t0.get_or_insert(t);
        let elapsed_s = (t - t0).to_seconds();

        if let (Some(interval), Some(prev_s)) = (self.interval, self.epoch_times.last()) {
            let dt = elapsed_s - prev_s;
            if dt > 2.0 * interval {
                let start_s = *prev_s;
                if let Some(gap) = self.gap(start_s, dt) {
                    self.gaps.push(gap);
                }
            }
        }

        self.prev_t = Some(t);
        self.epoch_times.push(elapsed_s);

        if !epoch.is_ok() {
            return;
        }

        let mut reporting = 0;

        for observation in epoch.observations.iter() {
            if observation.pseudorange.is_nan() {
                continue;
            }

            let series = self
                .series
                .entry(observation.sv)
                .or_insert_with(|| SatelliteTimeSeries::new(observation.sv));

            if series.push(Sample {
                elapsed_s,
                pseudorange: observation.pseudorange,
                phase: observation.phase,
            }) {
                reporting += 1;
            }
        }

        self.satellites.push((elapsed_s, reporting));
    }

    /// [SatelliteTimeSeries] of this [SV], as assembled so far
    pub fn series(&self, sv: &SV) -> Option<&SatelliteTimeSeries> {
        self.series.get(sv)
    }

    /// Completes the assembly.
    pub fn finish(mut self) -> TimeSeries {
        if self.interval.is_none() {
            let intervals = self
                .epoch_times
                .windows(2)
                .map(|w| w[1] - w[0])
                .collect::<Vec<_>>();

            if let Some(typical) = median(&intervals) {
                for (nth, dt) in intervals.iter().enumerate() {
                    if *dt > 2.0 * typical {
                        let start_s = self.epoch_times[nth];
                        if let Some(gap) = self.gap(start_s, *dt) {
                            self.gaps.push(gap);
                        }
                    }
                }
            }
        }

        let stats = SamplingStats::new(&self.epoch_times, &self.satellites);

        TimeSeries {
            t0: self.t0,
            series: self.series,
            gaps: self.gaps,
            stats,
            dropped_epochs: self.dropped_epochs,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::{
        Constellation, EpochFlag, EpochFormat, SatelliteObservation, TimeScale,
    };

    fn epoch(t_s: f64, flag: EpochFlag, observations: &[(u8, f64)]) -> ObservationEpoch {
        let t0 = Epoch::from_gregorian(2022, 1, 5, 0, 0, 0, 0, TimeScale::GPST);
        let mut epoch = ObservationEpoch::new(
            t0 + Duration::from_seconds(t_s),
            flag,
            EpochFormat::Rinex3,
            observations.len(),
        );
        for (prn, pr) in observations {
            epoch.observations.push(
                SatelliteObservation::empty(SV::new(Constellation::GPS, *prn))
                    .with_pseudorange(*pr)
                    .with_phase(*pr / 2.0),
            );
        }
        epoch
    }

    #[test]
    fn ok_epochs_only() {
        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);

        let mut assembler = Assembler::new().with_sampling_interval(1.0);
        for epoch in [
            epoch(0.0, EpochFlag::Ok, &[(1, 10.0), (2, 20.0)]),
            epoch(1.0, EpochFlag::PowerFailure, &[(1, 11.0), (2, 21.0)]),
            epoch(2.0, EpochFlag::Ok, &[(1, 12.0), (2, f64::NAN)]),
            epoch(3.0, EpochFlag::Ok, &[(2, 23.0)]),
        ] {
            assembler.consume(&epoch);
        }

        assert_eq!(assembler.series(&g01).map(|s| s.len()), Some(2));

        let series = assembler.finish();
        assert_eq!(series.len(), 2);
        assert!(series.gaps.is_empty());
        assert_eq!(series.stats.epochs, 4);
        assert_eq!(series.stats.max_satellites, 2);
        assert_eq!(series.stats.min_satellites, 1);

        let g01 = series.get(&g01).unwrap();
        assert_eq!(g01.times(), vec![0.0, 2.0]);
        assert_eq!(g01.pseudoranges(), vec![10.0, 12.0]);
        assert_eq!(g01.phases(), vec![5.0, 6.0]);

        let g02 = series.get(&g02).unwrap();
        assert_eq!(g02.times(), vec![0.0, 3.0]);
        assert_eq!(g02.pseudoranges(), vec![20.0, 23.0]);
    }

    #[test]
    fn gaps_do_not_split_series() {
        let g01 = SV::new(Constellation::GPS, 1);

        let mut assembler = Assembler::new().with_sampling_interval(30.0);
        for t in [0.0, 30.0, 60.0, 150.0, 180.0, 181.0] {
            assembler.consume(&epoch(t, EpochFlag::Ok, &[(1, t)]));
        }

        let series = assembler.finish();
        assert_eq!(series.gaps.len(), 1);
        assert_eq!(series.gaps[0].start_s, 60.0);
        assert_eq!(series.gaps[0].duration_s, 90.0);
        assert_eq!(series.get(&g01).unwrap().len(), 6);
    }

    #[test]
    fn gaps_from_median_interval() {
        let mut assembler = Assembler::new();
        for t in [0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0] {
            assembler.consume(&epoch(t, EpochFlag::Ok, &[(1, t)]));
        }

        // any flag counts for gap detection
        assembler.consume(&epoch(20.0, EpochFlag::PowerFailure, &[]));

        let series = assembler.finish();
        assert_eq!(series.gaps.len(), 2);
        assert_eq!(series.gaps[0].start_s, 3.0);
        assert_eq!(series.gaps[0].duration_s, 7.0);
        assert_eq!(series.gaps[1].start_s, 12.0);
        assert_eq!(series.stats.median_interval_s, Some(1.0));
    }

    #[test]
    fn satellite_count_anomalies() {
        let all = (1..=10_u8).map(|prn| (prn, 2.0E7)).collect::<Vec<_>>();

        let mut assembler = Assembler::new().with_sampling_interval(30.0);
        for i in 0..20 {
            let t = i as f64 * 30.0;
            if i == 12 {
                assembler.consume(&epoch(t, EpochFlag::Ok, &all[..3]));
            } else {
                assembler.consume(&epoch(t, EpochFlag::Ok, &all));
            }
        }
        // not sane: never accounted for
        assembler.consume(&epoch(600.0, EpochFlag::PowerFailure, &[]));

        let series = assembler.finish();
        assert_eq!(series.stats.epochs, 21);
        assert_eq!(series.stats.satellite_anomalies.len(), 1);

        let anomaly = series.stats.satellite_anomalies[0];
        assert_eq!(anomaly.elapsed_s, 360.0);
        assert_eq!(anomaly.satellites, 3);
        assert_eq!(anomaly.deviation, -7.0);
    }

    #[test]
    fn backwards_epochs_are_dropped() {
        let mut assembler = Assembler::new();
        for t in [0.0, 1.0, 0.5, 2.0] {
            assembler.consume(&epoch(t, EpochFlag::Ok, &[(1, t)]));
        }
        let series = assembler.finish();
        assert_eq!(series.dropped_epochs, 1);
        assert_eq!(
            series.get(&SV::new(Constellation::GPS, 1)).unwrap().times(),
            vec![0.0, 1.0, 2.0]
        );
    }
}
