use crate::{
    epoch::{calendar_epoch, resolve_year},
    errors::Error,
    header::{Coordinates, Header, TimeSystem, Version},
    prelude::{Constellation, Epoch, TimeScale},
    utils::{column, parse_column, read_line},
};

use scan_fmt::scan_fmt;

use std::{io::BufRead, str::FromStr};

/// Header labels start at this column
const LABEL_COLUMN: usize = 60;

fn parse_coordinates(content: &str) -> Option<Coordinates> {
    let fixed = (
        parse_column::<f64>(content, 0, 14),
        parse_column::<f64>(content, 14, 28),
        parse_column::<f64>(content, 28, 42),
    );

    if let (Some(x), Some(y), Some(z)) = fixed {
        return Some(Coordinates { x, y, z });
    }

    let mut items = content
        .split_ascii_whitespace()
        .map(|item| item.parse::<f64>().ok());

    let x = items.next()??;
    let y = items.next()??;
    let z = items.next()??;
    Some(Coordinates { x, y, z })
}

fn parse_interval(content: &str) -> Option<f64> {
    parse_column::<f64>(content, 0, 10).or_else(|| {
        content
            .split_ascii_whitespace()
            .next()
            .and_then(|item| item.parse::<f64>().ok())
    })
}

fn parse_time_of_first_obs(content: &str) -> (Option<Epoch>, TimeSystem) {
    let time_system = match column(content, 48, 51) {
        Some(label) => TimeSystem::from_str(label).unwrap_or_default(),
        None => TimeSystem::default(),
    };

    let ts = TimeScale::from(time_system.clone());

    let date = column(content, 0, 43).unwrap_or(content).trim();

    let fields = match scan_fmt!(date, "{} {} {} {} {} {}", i32, u8, u8, u8, u8, f64) {
        (Some(y), Some(m), Some(d), Some(hh), Some(mm), Some(ss)) => Some((y, m, d, hh, mm, ss)),
        _ => {
            let items = date.split_ascii_whitespace().collect::<Vec<_>>();
            if items.len() < 6 {
                None
            } else {
                match (
                    items[0].parse::<i32>(),
                    items[1].parse::<u8>(),
                    items[2].parse::<u8>(),
                    items[3].parse::<u8>(),
                    items[4].parse::<u8>(),
                    items[5].parse::<f64>(),
                ) {
                    (Ok(y), Ok(m), Ok(d), Ok(hh), Ok(mm), Ok(ss)) => Some((y, m, d, hh, mm, ss)),
                    _ => None,
                }
            }
        },
    };

    let epoch = fields.and_then(|(y, m, d, hh, mm, ss)| {
        calendar_epoch(resolve_year(y), m, d, hh, mm, ss, ts).ok()
    });

    (epoch, time_system)
}

fn observable_codes(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .split_ascii_whitespace()
        .map(|code| code.to_string())
}

/// Line by line [Header] builder, fed until `END OF HEADER`.
#[derive(Debug, Default)]
pub(crate) struct HeaderParser {
    header: Header,
    /// Constellation of the last `SYS / # / OBS TYPES` line,
    /// continuation lines leave the system letter blank.
    last_system: Option<Constellation>,
}

impl HeaderParser {
    /// Feeds one header line. Returns true once `END OF HEADER` is met.
    /// Unknown or malformed fields are ignored.
    pub fn feed(&mut self, line: &str) -> bool {
        let label = column(line, LABEL_COLUMN, line.len()).unwrap_or("").trim();
        let content = column(line, 0, LABEL_COLUMN).unwrap_or(line);

        if label.contains("COMMENT") {
            self.header.comments.push(content.trim_end().to_string());
        } else if label.contains("END OF HEADER") {
            return true;
        } else if label.contains("CRINEX VERS") {
            self.header.crinex = true;
        } else if label.contains("RINEX VERSION / TYPE") {
            if let Some(version) = column(content, 0, 9).and_then(|v| Version::from_str(v).ok()) {
                self.header.version = version;
            }
            self.header.constellation = column(content, 40, 41)
                .map(|letter| letter.trim())
                .filter(|letter| !letter.is_empty())
                .and_then(|letter| Constellation::from_str(letter).ok());
        } else if label.contains("MARKER NAME") {
            let marker = content.trim();
            if !marker.is_empty() {
                self.header.marker = Some(marker.to_string());
            }
        } else if label.contains("APPROX POSITION XYZ") {
            self.header.position = parse_coordinates(content);
        } else if label.contains("INTERVAL") {
            self.header.interval = parse_interval(content);
        } else if label.contains("TIME OF FIRST OBS") {
            let (epoch, time_system) = parse_time_of_first_obs(content);
            self.header.time_of_first_obs = epoch;
            self.header.time_system = time_system;
        } else if label.contains("# / TYPES OF OBSERV") {
            // RINEX2: count in 0..6, then up to 9 codes per line
            let codes = column(content, 6, LABEL_COLUMN).unwrap_or("");
            self.header
                .global_observables
                .extend(observable_codes(codes));
        } else if label.contains("SYS / # / OBS TYPES") {
            let letter = column(content, 0, 1).unwrap_or(" ");
            if letter.trim().is_empty() {
                // continuation line
            } else {
                self.last_system = Constellation::from_str(letter).ok();
            }
            if let Some(constellation) = self.last_system {
                let codes = column(content, 7, LABEL_COLUMN).unwrap_or("");
                self.header
                    .observables
                    .entry(constellation)
                    .or_insert_with(Vec::new)
                    .extend(observable_codes(codes));
            }
        }
        false
    }

    pub fn finish(self) -> Header {
        self.header
    }
}

impl Header {
    /// Parses a RINEX observation [Header] from any [BufRead]able input,
    /// consuming lines up to and including `END OF HEADER`.
    /// Missing fields are left to None: only I/O errors are reported.
    pub fn parse<R: BufRead>(reader: &mut R) -> Result<Self, Error> {
        let mut parser = HeaderParser::default();
        let mut buf = Vec::with_capacity(128);
        while let Some((line, _)) = read_line(reader, &mut buf)? {
            if parser.feed(&line) {
                break;
            }
        }
        Ok(parser.finish())
    }
}
