//! Residual anomaly detection
mod correlation;
mod detrend;
mod jumps;
mod multipath;
mod spectral;

pub use correlation::{correlate, CorrelatedAnomaly};
pub use detrend::{detrend, FitError};
pub use jumps::{detect_jumps, robust_std, AnomalyEvent};
pub use multipath::{multipath, MultipathAnalysis};
pub use spectral::{band_peak, welch, Psd, SpectralPeak};

use crate::{
    prelude::{Duration, SV},
    series::{SatelliteTimeSeries, TimeSeries},
    utils::{diff, mean, std_dev},
};

use log::debug;
use std::cmp::Ordering;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Satellite ranking criterion
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RankBy {
    /// Residual standard deviation
    #[default]
    ResidualStd,
    /// Residual standard deviation times largest residual step
    Score,
    /// Target band signal to noise ratio
    Snr,
}

/// [Detector] configuration
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorConfig {
    /// Satellites with fewer samples are skipped
    pub min_samples: usize,
    /// Detrending polynomial degree (1 or 2)
    pub degree: usize,
    /// Longest Welch segment
    pub max_segment: usize,
    /// Coarser samplings are not analyzed spectrally (s)
    pub max_spectral_interval_s: f64,
    /// Searched frequency band (mHz)
    pub target_band_mhz: (f64, f64),
    /// Background frequency band (mHz)
    pub reference_band_mhz: (f64, f64),
    /// Discontinuity threshold, in robust noise multiples
    pub threshold_sigma: f64,
    /// Correlation window (s)
    pub window_s: f64,
    /// Distinct satellites required to declare a [CorrelatedAnomaly]
    pub min_satellites: usize,
    /// Ranking criterion
    pub rank_by: RankBy,
    /// Satellites with fewer code and phase samples get no [MultipathAnalysis]
    pub min_multipath_samples: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_samples: 100,
            degree: 2,
            max_segment: 1024,
            max_spectral_interval_s: 2.0,
            target_band_mhz: (30.0, 50.0),
            reference_band_mhz: (20.0, 60.0),
            threshold_sigma: 5.0,
            window_s: 60.0,
            min_satellites: 4,
            rank_by: RankBy::default(),
            min_multipath_samples: 50,
        }
    }
}

impl DetectorConfig {
    /// Returns [DetectorConfig] with desired minimal number of samples
    pub fn with_min_samples(&self, min_samples: usize) -> Self {
        let mut s = *self;
        s.min_samples = min_samples;
        s
    }

    /// Returns [DetectorConfig] with desired detrending degree,
    /// clamped to 1..=2.
    pub fn with_degree(&self, degree: usize) -> Self {
        let mut s = *self;
        s.degree = degree.clamp(1, 2);
        s
    }

    /// Returns [DetectorConfig] with desired longest Welch segment
    pub fn with_max_segment(&self, max_segment: usize) -> Self {
        let mut s = *self;
        s.max_segment = max_segment;
        s
    }

    /// Returns [DetectorConfig] with desired longest sampling interval (s)
    /// for the spectral analysis
    pub fn with_max_spectral_interval(&self, interval_s: f64) -> Self {
        let mut s = *self;
        s.max_spectral_interval_s = interval_s;
        s
    }

    /// Returns [DetectorConfig] with desired target band (mHz)
    pub fn with_target_band(&self, low_mhz: f64, high_mhz: f64) -> Self {
        let mut s = *self;
        s.target_band_mhz = (low_mhz.min(high_mhz), low_mhz.max(high_mhz));
        s
    }

    /// Returns [DetectorConfig] with desired reference band (mHz)
    pub fn with_reference_band(&self, low_mhz: f64, high_mhz: f64) -> Self {
        let mut s = *self;
        s.reference_band_mhz = (low_mhz.min(high_mhz), low_mhz.max(high_mhz));
        s
    }

    /// Returns [DetectorConfig] with desired discontinuity threshold
    pub fn with_threshold_sigma(&self, threshold_sigma: f64) -> Self {
        let mut s = *self;
        s.threshold_sigma = threshold_sigma;
        s
    }

    /// Returns [DetectorConfig] with desired correlation window (s)
    pub fn with_correlation_window(&self, window_s: f64) -> Self {
        let mut s = *self;
        s.window_s = window_s;
        s
    }

    /// Returns [DetectorConfig] with desired number of satellites
    /// to declare a [CorrelatedAnomaly]
    pub fn with_min_satellites(&self, min_satellites: usize) -> Self {
        let mut s = *self;
        s.min_satellites = min_satellites;
        s
    }

    /// Returns [DetectorConfig] with desired ranking criterion
    pub fn with_ranking(&self, rank_by: RankBy) -> Self {
        let mut s = *self;
        s.rank_by = rank_by;
        s
    }

    /// Returns [DetectorConfig] with desired minimal number of
    /// code and phase samples for the [MultipathAnalysis]
    pub fn with_min_multipath_samples(&self, min_samples: usize) -> Self {
        let mut s = *self;
        s.min_multipath_samples = min_samples;
        s
    }
}

/// Analysis of one satellite
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteAnalysis {
    /// Satellite
    pub sv: SV,
    /// Number of samples
    pub samples: usize,
    /// Mean pseudo range (m)
    pub mean_range: f64,
    /// Standard deviation of the detrended residuals (m)
    pub residual_std: f64,
    /// Largest step between consecutive residuals (m)
    pub max_jump: f64,
    /// residual_std × max_jump
    pub score: f64,
    /// Target band peak, when the series is long enough
    pub spectral: Option<SpectralPeak>,
    /// Residual discontinuities
    pub events: Vec<AnomalyEvent>,
}

impl SatelliteAnalysis {
    /// Target band SNR, 0 without spectral analysis
    pub fn snr(&self) -> f64 {
        self.spectral.map(|peak| peak.snr).unwrap_or(0.0)
    }

    fn rank(&self, rank_by: RankBy) -> f64 {
        match rank_by {
            RankBy::ResidualStd => self.residual_std,
            RankBy::Score => self.score,
            RankBy::Snr => self.snr(),
        }
    }
}

/// [AnomalyReport] gathers the results of one [Detector] run
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnomalyReport {
    /// Analyzed satellites, most anomalous first
    pub satellites: Vec<SatelliteAnalysis>,
    /// All discontinuities, chronologically
    pub events: Vec<AnomalyEvent>,
    /// Correlated anomalies, sorted by window
    pub correlated: Vec<CorrelatedAnomaly>,
    /// Satellites excluded from the analysis
    pub skipped: Vec<SV>,
    /// Code minus carrier variability, most variable first
    pub multipath: Vec<MultipathAnalysis>,
}

impl AnomalyReport {
    /// [SatelliteAnalysis] of this [SV]
    pub fn analysis(&self, sv: &SV) -> Option<&SatelliteAnalysis> {
        self.satellites.iter().find(|analysis| analysis.sv == *sv)
    }
}

/// [Detector] runs the per satellite analysis, then correlates
/// the discontinuities across satellites.
#[derive(Debug, Default, Copy, Clone)]
pub struct Detector {
    config: DetectorConfig,
}

impl Detector {
    /// Builds a new [Detector]
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Analyzes a single [SatelliteTimeSeries]
    pub fn analyze(&self, series: &SatelliteTimeSeries) -> Result<SatelliteAnalysis, FitError> {
        let samples = series.len();
        if samples < self.config.min_samples {
            return Err(FitError::NotEnoughSamples(self.config.min_samples));
        }

        let times = series.times();
        let ranges = series.pseudoranges();

        let residuals = detrend(&times, &ranges, self.config.degree)?;

        let residual_std = std_dev(&residuals).unwrap_or(0.0);

        let max_jump = diff(&residuals)
            .iter()
            .fold(0.0_f64, |max, d| max.max(d.abs()));

        let spectral = match series.median_interval_s() {
            Some(dt) if dt > 0.0 && dt <= self.config.max_spectral_interval_s => {
                welch(&residuals, 1.0 / dt, self.config.max_segment).and_then(|psd| {
                    band_peak(
                        &psd,
                        self.config.target_band_mhz,
                        self.config.reference_band_mhz,
                    )
                })
            },
            Some(dt) => {
                debug!("{:?}: {:.3}s sampling, no spectral analysis", series.sv, dt);
                None
            },
            None => None,
        };

        let events = detect_jumps(series.sv, &times, &residuals, self.config.threshold_sigma);

        Ok(SatelliteAnalysis {
            sv: series.sv,
            samples,
            mean_range: mean(&ranges).unwrap_or(0.0),
            residual_std,
            max_jump,
            score: residual_std * max_jump,
            spectral,
            events,
        })
    }

    /// Runs the analysis over all satellites of the [TimeSeries]
    pub fn run(&self, series: &TimeSeries) -> AnomalyReport {
        let satellites = series.series.values().collect::<Vec<_>>();

        let min_multipath = self.config.min_multipath_samples;

        #[cfg(feature = "parallel")]
        let results = satellites
            .par_iter()
            .map(|series| {
                (
                    series.sv,
                    self.analyze(series),
                    multipath(series, min_multipath),
                )
            })
            .collect::<Vec<_>>();

        #[cfg(not(feature = "parallel"))]
        let results = satellites
            .iter()
            .map(|series| {
                (
                    series.sv,
                    self.analyze(series),
                    multipath(series, min_multipath),
                )
            })
            .collect::<Vec<_>>();

        let mut report = AnomalyReport::default();

        for (sv, result, mp) in results {
            match result {
                Ok(analysis) => report.satellites.push(analysis),
                Err(e) => {
                    debug!("{:?}: skipped ({})", sv, e);
                    report.skipped.push(sv);
                },
            }
            match mp {
                Ok(analysis) => report.multipath.push(analysis),
                Err(e) => debug!("{:?}: no multipath analysis ({})", sv, e),
            }
        }

        report
            .multipath
            .sort_by(|a, b| b.std.partial_cmp(&a.std).unwrap_or(Ordering::Equal));

        let rank_by = self.config.rank_by;
        report.satellites.sort_by(|a, b| {
            b.rank(rank_by)
                .partial_cmp(&a.rank(rank_by))
                .unwrap_or(Ordering::Equal)
        });

        report.events = report
            .satellites
            .iter()
            .flat_map(|analysis| analysis.events.iter().copied())
            .map(|mut event| {
                event.epoch = series
                    .t0
                    .map(|t0| t0 + Duration::from_seconds(event.elapsed_s));
                event
            })
            .collect();

        report.events.sort_by(|a, b| {
            a.elapsed_s
                .partial_cmp(&b.elapsed_s)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.sv.cmp(&b.sv))
        });

        report.correlated = correlate(
            &report.events,
            self.config.window_s,
            self.config.min_satellites,
        );

        report
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        prelude::{Constellation, Epoch, TimeScale},
        series::Sample,
    };

    fn series(prn: u8, size: usize, value: impl Fn(f64) -> f64) -> SatelliteTimeSeries {
        let mut series = SatelliteTimeSeries::new(SV::new(Constellation::GPS, prn));
        for i in 0..size {
            let t = i as f64;
            series.push(Sample {
                elapsed_s: t,
                pseudorange: value(t),
                phase: f64::NAN,
            });
        }
        series
    }

    #[test]
    fn default_config() {
        let cfg = DetectorConfig::default();
        assert_eq!(cfg.min_samples, 100);
        assert_eq!(cfg.degree, 2);
        assert_eq!(cfg.max_segment, 1024);
        assert_eq!(cfg.target_band_mhz, (30.0, 50.0));
        assert_eq!(cfg.reference_band_mhz, (20.0, 60.0));
        assert_eq!(cfg.threshold_sigma, 5.0);
        assert_eq!(cfg.window_s, 60.0);
        assert_eq!(cfg.min_satellites, 4);
        assert_eq!(cfg.rank_by, RankBy::ResidualStd);
        assert_eq!(cfg.max_spectral_interval_s, 2.0);
        assert_eq!(cfg.min_multipath_samples, 50);

        let cfg = cfg
            .with_degree(5)
            .with_target_band(50.0, 30.0)
            .with_ranking(RankBy::Snr);
        assert_eq!(cfg.degree, 2);
        assert_eq!(cfg.target_band_mhz, (30.0, 50.0));
        assert_eq!(cfg.rank_by, RankBy::Snr);
    }

    #[test]
    fn short_series_are_skipped() {
        let detector = Detector::default();
        assert_eq!(
            detector.analyze(&series(1, 50, |t| t)),
            Err(FitError::NotEnoughSamples(100))
        );
    }

    #[test]
    fn smooth_series() {
        let detector = Detector::new(DetectorConfig::default());
        let analysis = detector
            .analyze(&series(1, 600, |t| 2.0E7 + 100.0 * t))
            .unwrap();

        assert_eq!(analysis.samples, 600);
        assert!(analysis.residual_std < 1.0E-6);
        assert!(analysis.max_jump < 1.0E-6);
        assert!(analysis.events.is_empty());
        assert!((analysis.mean_range - (2.0E7 + 100.0 * 299.5)).abs() < 1.0E-3);
        // 300 samples segments: ~3.3 mHz resolution
        assert!(analysis.spectral.is_some());
    }

    #[test]
    fn coarse_sampling_has_no_spectrum() {
        // 30s sampling, the band of interest is below Nyquist
        let mut coarse = SatelliteTimeSeries::new(SV::new(Constellation::GPS, 1));
        for i in 0..600 {
            let t = i as f64 * 30.0;
            coarse.push(Sample {
                elapsed_s: t,
                pseudorange: 2.0E7 + 100.0 * t + (2.0 * std::f64::consts::PI * 0.007 * t).sin(),
                phase: f64::NAN,
            });
        }

        let config = DetectorConfig::default()
            .with_target_band(5.0, 10.0)
            .with_reference_band(2.0, 15.0);

        let analysis = Detector::new(config).analyze(&coarse).unwrap();
        assert_eq!(analysis.samples, 600);
        assert!(analysis.spectral.is_none());

        let analysis = Detector::new(config.with_max_spectral_interval(30.0))
            .analyze(&coarse)
            .unwrap();
        let peak = analysis.spectral.unwrap();
        assert!((peak.frequency_mhz - 7.0).abs() < 0.5, "{:?}", peak);

        // default band is out of reach anyway
        let analysis = Detector::default().analyze(&coarse).unwrap();
        assert!(analysis.spectral.is_none());
    }

    #[test]
    fn multipath_ranking() {
        let mut time_series = TimeSeries::default();

        for (prn, amplitude, with_phase) in [
            (1, 0.1, true),
            (2, 1.0, true),
            (3, 0.5, true),
            (4, 1.0, false),
        ] {
            let mut s = SatelliteTimeSeries::new(SV::new(Constellation::GPS, prn));
            for i in 0..600 {
                let t = i as f64;
                let range = 2.0E7 + 100.0 * t;
                s.push(Sample {
                    elapsed_s: t,
                    pseudorange: range + amplitude * (2.0 * std::f64::consts::PI * t / 60.0).cos(),
                    phase: if with_phase { range / 0.19 } else { f64::NAN },
                });
            }
            time_series.series.insert(s.sv, s);
        }

        let report = Detector::default().run(&time_series);
        assert_eq!(report.satellites.len(), 4);

        let ranked = report.multipath.iter().map(|mp| mp.sv.prn).collect::<Vec<_>>();
        assert_eq!(ranked, vec![2, 3, 1]);
        assert!(report.multipath[0].max > report.multipath[1].max);
        assert!(report.multipath.iter().all(|mp| mp.samples == 600));
    }

    #[test]
    fn ranking_and_correlation() {
        let mut time_series = TimeSeries::default();
        time_series.t0 = Some(Epoch::from_gregorian(2022, 1, 5, 0, 0, 0, 0, TimeScale::GPST));

        // four satellites stepping within the same minute
        for (prn, step_t, amplitude) in [
            (1, 365.0, 5.0),
            (2, 375.0, 10.0),
            (3, 385.0, 20.0),
            (4, 395.0, 40.0),
        ] {
            let s = series(prn, 1000, |t| {
                let zigzag = if (t as usize) % 2 == 0 { 0.01 } else { -0.01 };
                if t >= step_t {
                    zigzag + amplitude
                } else {
                    zigzag
                }
            });
            time_series.series.insert(s.sv, s);
        }

        // too short
        let s = series(5, 10, |t| t);
        time_series.series.insert(s.sv, s);

        let report = Detector::new(DetectorConfig::default().with_degree(1)).run(&time_series);

        assert_eq!(report.skipped, vec![SV::new(Constellation::GPS, 5)]);
        assert_eq!(report.satellites.len(), 4);

        // largest step ranks first
        let ranked = report.satellites.iter().map(|a| a.sv.prn).collect::<Vec<_>>();
        assert_eq!(ranked, vec![4, 3, 2, 1]);

        assert_eq!(report.events.len(), 4);
        let times = report.events.iter().map(|e| e.elapsed_s).collect::<Vec<_>>();
        assert_eq!(times, vec![365.0, 375.0, 385.0, 395.0]);
        assert!(report.events.iter().all(|e| e.epoch.is_some()));

        assert_eq!(report.correlated.len(), 1);
        assert_eq!(report.correlated[0].bin, 6);
        assert_eq!(report.correlated[0].satellites.len(), 4);
        assert_eq!(report.correlated[0].events, 4);

        assert!(report.analysis(&SV::new(Constellation::GPS, 3)).is_some());
    }
}
