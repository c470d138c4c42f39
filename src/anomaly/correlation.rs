//! Cross satellite correlation
use super::AnomalyEvent;
use crate::prelude::SV;

use itertools::Itertools;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// [CorrelatedAnomaly]: time window in which several satellites
/// exhibited discontinuities
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CorrelatedAnomaly {
    /// Window index, `floor(elapsed / window)`
    pub bin: i64,
    /// Window start (s)
    pub start_s: f64,
    /// Distinct satellites, sorted
    pub satellites: Vec<SV>,
    /// Total number of events within the window
    pub events: usize,
}

/// Bins `events` in windows of `window_s` and retains the windows
/// holding events from at least `min_satellites` distinct satellites.
/// Output is sorted by bin.
pub fn correlate(
    events: &[AnomalyEvent],
    window_s: f64,
    min_satellites: usize,
) -> Vec<CorrelatedAnomaly> {
    if !(window_s > 0.0) {
        return Vec::new();
    }

    let bin = |event: &AnomalyEvent| (event.elapsed_s / window_s).floor() as i64;

    let chunks = events
        .iter()
        .filter(|event| event.elapsed_s.is_finite())
        .sorted_by_key(|event| bin(*event))
        .chunk_by(|event| bin(*event));

    let correlated = chunks
        .into_iter()
        .filter_map(|(bin, chunk)| {
            let chunk = chunk.collect::<Vec<_>>();

            let satellites = chunk
                .iter()
                .map(|event| event.sv)
                .sorted()
                .dedup()
                .collect::<Vec<_>>();

            if satellites.len() < min_satellites.max(1) {
                return None;
            }

            Some(CorrelatedAnomaly {
                bin,
                start_s: bin as f64 * window_s,
                satellites,
                events: chunk.len(),
            })
        })
        .collect();

    correlated
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::Constellation;

    fn event(prn: u8, elapsed_s: f64) -> AnomalyEvent {
        AnomalyEvent {
            sv: SV::new(Constellation::GPS, prn),
            index: 0,
            elapsed_s,
            epoch: None,
            magnitude: 1.0,
            significance: 10.0,
        }
    }

    #[test]
    fn common_window() {
        let events = [
            event(1, 125.0),
            event(2, 130.0),
            event(3, 150.0),
            event(4, 179.0),
            event(4, 170.0),
        ];

        let correlated = correlate(&events, 60.0, 3);
        assert_eq!(correlated.len(), 1);

        let anomaly = &correlated[0];
        assert_eq!(anomaly.bin, 2);
        assert_eq!(anomaly.start_s, 120.0);
        assert_eq!(anomaly.events, 5);
        assert_eq!(
            anomaly.satellites,
            (1..=4)
                .map(|prn| SV::new(Constellation::GPS, prn))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn spread_events() {
        let events = [
            event(1, 10.0),
            event(2, 70.0),
            event(3, 130.0),
            event(4, 190.0),
        ];
        assert!(correlate(&events, 60.0, 3).is_empty());
    }

    #[test]
    fn single_satellite_bursts() {
        let events = [event(1, 0.0), event(1, 1.0), event(1, 2.0)];
        assert!(correlate(&events, 60.0, 2).is_empty());
        assert_eq!(correlate(&events, 60.0, 1).len(), 1);
        assert!(correlate(&events, 0.0, 1).is_empty());
    }
}
