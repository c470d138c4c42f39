//! Welch power spectral density and band peak search
use rustfft::{num_complex::Complex64, Fft, FftPlanner};

use crate::utils::median;

use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shortest segment we accept to run the periodogram
const MIN_SEGMENT: usize = 8;

/// One sided power spectral density
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    /// Frequency axis (mHz)
    pub frequencies_mhz: Vec<f64>,
    /// Power density (unit²/Hz)
    pub density: Vec<f64>,
}

/// Strongest spectral component within a frequency band
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpectralPeak {
    /// Peak frequency (mHz)
    pub frequency_mhz: f64,
    /// Peak power density
    pub power: f64,
    /// Median power density of the reference band
    pub background: f64,
    /// power / background, 0 when background is not positive
    pub snr: f64,
}

/// Periodic Hann window
fn hann(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}

/// Welch PSD estimate: Hann windowed segments of `min(max_segment, n / 2)`
/// samples, 50% overlap, mean removed per segment, averaged one sided
/// periodograms scaled as a density.
/// Returns None when the series is too short.
pub fn welch(values: &[f64], sample_rate_hz: f64, max_segment: usize) -> Option<Psd> {
    let segment = max_segment.min(values.len() / 2);
    if segment < MIN_SEGMENT || !(sample_rate_hz > 0.0) {
        return None;
    }

    let step = segment - segment / 2;
    let window = hann(segment);
    let window_power = window.iter().map(|w| w * w).sum::<f64>();
    let scale = 1.0 / (sample_rate_hz * window_power);

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(segment);

    let nb_bins = segment / 2 + 1;
    let mut accumulated = vec![0.0_f64; nb_bins];
    let mut nb_segments = 0;

    let mut buffer = vec![Complex64::new(0.0, 0.0); segment];

    let mut start = 0;
    while start + segment <= values.len() {
        let chunk = &values[start..start + segment];
        let offset = chunk.iter().sum::<f64>() / segment as f64;

        for (i, value) in chunk.iter().enumerate() {
            buffer[i] = Complex64::new((value - offset) * window[i], 0.0);
        }

        fft.process(&mut buffer);

        for (bin, acc) in accumulated.iter_mut().enumerate() {
            let power = buffer[bin].norm_sqr() * scale;
            // fold negative frequencies, DC and Nyquist excepted
            let nyquist = segment % 2 == 0 && bin == segment / 2;
            if bin == 0 || nyquist {
                *acc += power;
            } else {
                *acc += 2.0 * power;
            }
        }

        nb_segments += 1;
        start += step;
    }

    let resolution_mhz = sample_rate_hz * 1.0E3 / segment as f64;

    Some(Psd {
        frequencies_mhz: (0..nb_bins).map(|bin| bin as f64 * resolution_mhz).collect(),
        density: accumulated
            .iter()
            .map(|acc| acc / nb_segments as f64)
            .collect(),
    })
}

/// Locates the strongest bin of the target band (mHz, inclusive)
/// and compares it to the median density of the reference band.
/// Returns None with fewer than 3 bins in the target band.
pub fn band_peak(psd: &Psd, target_mhz: (f64, f64), reference_mhz: (f64, f64)) -> Option<SpectralPeak> {
    let within = |f: f64, band: (f64, f64)| f >= band.0 && f <= band.1;

    let target = psd
        .frequencies_mhz
        .iter()
        .zip(psd.density.iter())
        .filter(|(f, _)| within(**f, target_mhz))
        .collect::<Vec<_>>();

    if target.len() < 3 {
        return None;
    }

    let (frequency_mhz, power) = target.iter().fold(
        (f64::NAN, f64::NEG_INFINITY),
        |(f_max, p_max), (f, p)| {
            if **p > p_max {
                (**f, **p)
            } else {
                (f_max, p_max)
            }
        },
    );

    let reference = psd
        .frequencies_mhz
        .iter()
        .zip(psd.density.iter())
        .filter(|(f, _)| within(**f, reference_mhz))
        .map(|(_, p)| *p)
        .collect::<Vec<_>>();

    let background = median(&reference).unwrap_or(0.0);

    let snr = if background > 0.0 {
        power / background
    } else {
        0.0
    };

    Some(SpectralPeak {
        frequency_mhz,
        power,
        background,
        snr,
    })
}
