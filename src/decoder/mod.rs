//! Streaming RINEX observation decoder
mod options;

pub use options::{DecoderOptions, DecodingStats};

use crate::{
    epoch::{
        parse_epoch_header, parse_sv, parse_sv_list, split_fields, EpochFormat, EpochHeader,
        ObservationEpoch, SatelliteObservation, RINEX2_FIELDS_PER_LINE,
        RINEX2_SATS_PER_LINE, RINEX2_SV_LIST_END, RINEX2_SV_LIST_START,
    },
    errors::Error,
    header::{FieldMap, Header, HeaderParser},
    prelude::{Constellation, TimeScale, SV},
    utils::{column, read_line},
};

use log::{debug, error, trace};

use std::{
    collections::{HashMap, VecDeque},
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// What the lines of the epoch in progress are expected to be.
#[derive(Debug, Copy, Clone, PartialEq)]
enum Expecting {
    /// RINEX2 satellite list continuation lines
    SatelliteList { remaining: usize },
    /// Satellite records, `lines_per_record` lines each
    Records { remaining: usize },
    /// Lines we consume without decoding: special records
    /// or compressed CRINEX content.
    Opaque { remaining: usize },
}

/// Epoch under construction
#[derive(Debug, Clone)]
struct Pending {
    epoch: ObservationEpoch,
    /// Satellites listed by the epoch header (RINEX2)
    satellites: Vec<SV>,
    expecting: Expecting,
    /// RINEX2 record in progress
    fields: Vec<f64>,
    record_lines: usize,
    raw_fields: usize,
}

#[derive(Debug, Clone)]
enum State {
    /// Waiting for an epoch header line
    ExpectEpoch,
    /// Collecting the records of an epoch
    InEpoch(Pending),
}

/// [Decoder] turns a RINEX observation stream into [ObservationEpoch]s.
/// The [Header] is parsed when the decoder is built, epochs are then
/// decoded one at a time by iterating. Malformed content never stops
/// the decoding: it is logged and accounted for in [DecodingStats].
///
/// ```
/// use gnss_anomaly::prelude::*;
/// use std::io::BufReader;
///
/// let content = format!(
///     "{:<60}END OF HEADER\n> 2022 01 05 00 00  0.0000000  0  1\nG01  23619095.450      -53875.632\n",
///     ""
/// );
///
/// let decoder = Decoder::new(BufReader::new(content.as_bytes())).unwrap();
/// let epochs = decoder.collect::<Vec<_>>();
/// assert_eq!(epochs.len(), 1);
/// assert_eq!(epochs[0].observations[0].pseudorange, 23619095.450);
/// ```
pub struct Decoder<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    header: Header,
    state: State,
    options: DecoderOptions,
    stats: DecodingStats,
    time_scale: TimeScale,
    /// (field map, number of observables), per constellation
    layouts: HashMap<Constellation, (FieldMap, usize)>,
    /// Epochs ready to be handed out
    ready: VecDeque<ObservationEpoch>,
    done: bool,
}

impl Decoder<Box<dyn BufRead>> {
    /// Opens a RINEX file. Files ending with `.gz` are gunzipped
    /// when the `flate2` feature is enabled.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_file_with_options(path, DecoderOptions::default())
    }

    /// Opens a RINEX file with desired [DecoderOptions].
    pub fn from_file_with_options<P: AsRef<Path>>(
        path: P,
        options: DecoderOptions,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        let fd = File::open(path)?;

        #[cfg(feature = "flate2")]
        {
            let gzip = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("gz"))
                .unwrap_or(false);

            if gzip {
                let reader: Box<dyn BufRead> =
                    Box::new(BufReader::new(flate2::read::GzDecoder::new(fd)));
                return Self::with_options(reader, options);
            }
        }

        let reader: Box<dyn BufRead> = Box::new(BufReader::new(fd));
        Self::with_options(reader, options)
    }
}

impl<R: BufRead> Decoder<R> {
    /// Builds a new [Decoder], parsing the [Header] right away.
    pub fn new(reader: R) -> Result<Self, Error> {
        Self::with_options(reader, DecoderOptions::default())
    }

    /// Builds a new [Decoder] with desired [DecoderOptions].
    pub fn with_options(reader: R, options: DecoderOptions) -> Result<Self, Error> {
        let mut decoder = Self {
            reader,
            options,
            buf: Vec::with_capacity(256),
            header: Header::default(),
            state: State::ExpectEpoch,
            stats: DecodingStats::default(),
            time_scale: TimeScale::GPST,
            layouts: HashMap::with_capacity(4),
            ready: VecDeque::with_capacity(2),
            done: false,
        };
        decoder.parse_header()?;
        Ok(decoder)
    }

    /// [Header] of this stream
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Statistics so far
    pub fn stats(&self) -> &DecodingStats {
        &self.stats
    }

    fn next_line(&mut self) -> Result<Option<String>, Error> {
        if let Some(max_bytes) = self.options.max_bytes {
            if self.stats.bytes >= max_bytes {
                debug!("byte budget ({}) reached", max_bytes);
                return Ok(None);
            }
        }

        match read_line(&mut self.reader, &mut self.buf)? {
            Some((line, size)) => {
                self.stats.lines += 1;
                self.stats.bytes += size;
                Ok(Some(line))
            },
            None => Ok(None),
        }
    }

    fn parse_header(&mut self) -> Result<(), Error> {
        let mut parser = HeaderParser::default();
        let mut complete = false;

        while let Some(line) = self.next_line()? {
            if parser.feed(&line) {
                complete = true;
                break;
            }
        }

        if !complete {
            debug!("no END OF HEADER after {} lines", self.stats.lines);
        }

        self.header = parser.finish();
        self.time_scale = TimeScale::from(self.header.time_system.clone());
        Ok(())
    }

    fn layout(&mut self, constellation: Constellation) -> (FieldMap, usize) {
        let header = &self.header;
        *self.layouts.entry(constellation).or_insert_with(|| {
            (
                header.field_map(constellation),
                header.nb_observables(constellation),
            )
        })
    }

    /// Number of lines of one RINEX2 satellite record
    fn rinex2_lines_per_record(&self) -> usize {
        let nb_types = self.header.global_observables.len();
        ((nb_types + RINEX2_FIELDS_PER_LINE - 1) / RINEX2_FIELDS_PER_LINE).max(1)
    }

    fn publish(&mut self, epoch: ObservationEpoch) {
        trace!(
            "{:?} ({}): {} observations",
            epoch.epoch,
            epoch.flag,
            epoch.observations.len()
        );
        self.stats.epochs += 1;
        self.ready.push_back(epoch);
    }

    /// Starts a new epoch from an epoch header line.
    /// Returns the next [State].
    fn begin_epoch(&mut self, line: &str) -> State {
        let format = match EpochFormat::detect(line, self.header.crinex) {
            Some(format) => format,
            None => {
                if !line.trim().is_empty() {
                    self.stats.malformed_lines += 1;
                    debug!("line {}: not an epoch header", self.stats.lines);
                }
                return State::ExpectEpoch;
            },
        };

        let EpochHeader {
            epoch,
            flag,
            format,
            declared,
            satellites,
        } = match parse_epoch_header(line, format, self.time_scale) {
            Ok(header) => header,
            Err(e) => {
                self.stats.malformed_lines += 1;
                debug!("line {}: {}", self.stats.lines, e);
                return State::ExpectEpoch;
            },
        };

        let mut epoch = ObservationEpoch::new(epoch, flag, format, declared);

        let expecting = if flag.announces_special_records() {
            self.stats.special_records += declared;
            Expecting::Opaque {
                remaining: declared,
            }
        } else {
            match format {
                EpochFormat::Crinex => {
                    // observation values are not decompressed
                    epoch.observations = satellites
                        .iter()
                        .map(|sv| SatelliteObservation::empty(*sv))
                        .collect();
                    // clock offset line, then one line per satellite
                    Expecting::Opaque {
                        remaining: declared + 1,
                    }
                },
                EpochFormat::Rinex2 => {
                    let listed_lines = (declared + RINEX2_SATS_PER_LINE - 1) / RINEX2_SATS_PER_LINE;
                    let continuation = listed_lines.saturating_sub(1);
                    if continuation > 0 {
                        Expecting::SatelliteList {
                            remaining: continuation,
                        }
                    } else {
                        Expecting::Records {
                            remaining: declared,
                        }
                    }
                },
                EpochFormat::Rinex3 => Expecting::Records {
                    remaining: declared,
                },
            }
        };

        let pending = Pending {
            epoch,
            satellites,
            expecting,
            fields: Vec::new(),
            record_lines: 0,
            raw_fields: 0,
        };

        if pending.is_done() {
            self.publish(pending.epoch);
            State::ExpectEpoch
        } else {
            State::InEpoch(pending)
        }
    }

    /// Decodes one RINEX3 satellite record.
    fn rinex3_record(&mut self, line: &str) -> Option<SatelliteObservation> {
        let sv = match parse_sv(column(line, 0, 3).unwrap_or("")) {
            Ok(sv) => sv,
            Err(e) => {
                self.stats.malformed_lines += 1;
                debug!("line {}: {}", self.stats.lines, e);
                return None;
            },
        };

        let fields = split_fields(column(line, 3, line.len()).unwrap_or(""));
        let (map, nb_observables) = self.layout(sv.constellation);

        if fields.len() < nb_observables {
            self.stats.short_records += 1;
        }

        Some(SatelliteObservation::from_fields(sv, &fields, &map))
    }

    /// Consumes one line of the epoch in progress.
    /// Returns the next [State].
    fn continue_epoch(&mut self, mut pending: Pending, line: &str) -> State {
        match pending.expecting {
            Expecting::Opaque { remaining } => {
                pending.expecting = Expecting::Opaque {
                    remaining: remaining - 1,
                };
            },
            Expecting::SatelliteList { remaining } => {
                let list = column(line, RINEX2_SV_LIST_START, RINEX2_SV_LIST_END).unwrap_or("");
                match parse_sv_list(list) {
                    Ok(satellites) => pending.satellites.extend(satellites),
                    Err(e) => {
                        self.stats.malformed_lines += 1;
                        debug!("line {}: {}", self.stats.lines, e);
                    },
                }
                pending.expecting = if remaining > 1 {
                    Expecting::SatelliteList {
                        remaining: remaining - 1,
                    }
                } else {
                    Expecting::Records {
                        remaining: pending.epoch.declared,
                    }
                };
            },
            Expecting::Records { remaining } => match pending.epoch.format {
                EpochFormat::Rinex2 => {
                    let lines_per_record = self.rinex2_lines_per_record();

                    let mut fields = split_fields(line);
                    pending.raw_fields += fields.len();
                    fields.resize(RINEX2_FIELDS_PER_LINE, f64::NAN);
                    pending.fields.extend(fields);
                    pending.record_lines += 1;

                    if pending.record_lines == lines_per_record {
                        let nth = pending.epoch.declared - remaining;
                        match pending.satellites.get(nth) {
                            Some(sv) => {
                                let (map, nb_observables) = self.layout(sv.constellation);
                                if pending.raw_fields < nb_observables {
                                    self.stats.short_records += 1;
                                }
                                pending.epoch.observations.push(
                                    SatelliteObservation::from_fields(*sv, &pending.fields, &map),
                                );
                            },
                            None => {
                                self.stats.malformed_lines += 1;
                                debug!(
                                    "line {}: record #{} has no satellite",
                                    self.stats.lines, nth
                                );
                            },
                        }
                        pending.fields.clear();
                        pending.record_lines = 0;
                        pending.raw_fields = 0;
                        pending.expecting = Expecting::Records {
                            remaining: remaining - 1,
                        };
                    }
                },
                _ => {
                    if let Some(observation) = self.rinex3_record(line) {
                        pending.epoch.observations.push(observation);
                    }
                    pending.expecting = Expecting::Records {
                        remaining: remaining - 1,
                    };
                },
            },
        }

        if pending.is_done() {
            self.publish(pending.epoch);
            State::ExpectEpoch
        } else {
            State::InEpoch(pending)
        }
    }

    /// Closes the epoch in progress before all its records were read.
    fn close_early(&mut self, pending: Pending) {
        self.stats.truncated_epochs += 1;
        debug!(
            "{:?}: closed after {}/{} records",
            pending.epoch.epoch,
            pending.epoch.observations.len(),
            pending.epoch.declared
        );
        self.publish(pending.epoch);
    }

    /// True when `line` is a valid epoch header, while decoding records.
    /// RINEX2 record lines never carry the seconds decimal point at column 18,
    /// the date must decode as well.
    fn starts_epoch(&self, line: &str) -> bool {
        if line.starts_with('>') {
            return true;
        }
        match EpochFormat::detect(line, self.header.crinex) {
            Some(EpochFormat::Rinex2) => {
                parse_epoch_header(line, EpochFormat::Rinex2, self.time_scale).is_ok()
            },
            _ => false,
        }
    }

    /// Consumes one line
    fn consume(&mut self, line: &str) {
        let state = std::mem::replace(&mut self.state, State::ExpectEpoch);
        self.state = match state {
            State::ExpectEpoch => self.begin_epoch(line),
            State::InEpoch(pending) => {
                let interrupted = !matches!(pending.expecting, Expecting::Opaque { .. })
                    && self.starts_epoch(line);
                if interrupted {
                    self.close_early(pending);
                    self.begin_epoch(line)
                } else {
                    self.continue_epoch(pending, line)
                }
            },
        };
    }

    fn terminate(&mut self) {
        self.done = true;
        let state = std::mem::replace(&mut self.state, State::ExpectEpoch);
        if let State::InEpoch(pending) = state {
            self.close_early(pending);
        }
        debug!("{:?}", self.stats);
    }
}

impl Pending {
    fn is_done(&self) -> bool {
        match self.expecting {
            Expecting::Opaque { remaining } | Expecting::Records { remaining } => remaining == 0,
            Expecting::SatelliteList { .. } => false,
        }
    }
}

impl<R: BufRead> Iterator for Decoder<R> {
    type Item = ObservationEpoch;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(epoch) = self.ready.pop_front() {
                return Some(epoch);
            }

            if self.done {
                return None;
            }

            if let Some(max_epochs) = self.options.max_epochs {
                if self.stats.epochs >= max_epochs {
                    debug!("epoch budget ({}) reached", max_epochs);
                    self.done = true;
                    continue;
                }
            }

            match self.next_line() {
                Ok(Some(line)) => self.consume(&line),
                Ok(None) => self.terminate(),
                Err(e) => {
                    error!("decoding interrupted: {}", e);
                    self.stats.interrupted = true;
                    self.terminate();
                },
            }
        }
    }
}
