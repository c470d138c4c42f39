use crate::{
    epoch::{EpochFlag, EpochFormat},
    errors::ParsingError,
    prelude::{Constellation, Duration, Epoch, TimeScale, SV},
    utils::{column, parse_column},
};

use std::str::FromStr;

/// Satellites listed per RINEX2 epoch line
pub(crate) const RINEX2_SATS_PER_LINE: usize = 12;

/// First column of the RINEX2 satellite list
pub(crate) const RINEX2_SV_LIST_START: usize = 32;

/// End of the RINEX2 satellite list
pub(crate) const RINEX2_SV_LIST_END: usize = 68;

/// First column of the CRINEX3 satellite list
const CRINEX3_SV_LIST_START: usize = 41;

/// Decoded epoch header line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EpochHeader {
    pub epoch: Epoch,
    pub flag: EpochFlag,
    pub format: EpochFormat,
    /// Number of satellites, or number of special records
    pub declared: usize,
    /// Satellites listed on the header line itself
    pub satellites: Vec<SV>,
}

/// Resolves a 2 digit year: `yy < 80` belongs to the 21st century.
/// Years already expressed with 4 digits are returned as is.
pub fn resolve_year(year: i32) -> i32 {
    if year >= 100 {
        year
    } else if year < 80 {
        2000 + year
    } else {
        1900 + year
    }
}

/// Builds an [Epoch] from calendar fields with fractional seconds.
pub(crate) fn calendar_epoch(
    year: i32,
    month: u8,
    day: u8,
    hours: u8,
    minutes: u8,
    seconds: f64,
    ts: TimeScale,
) -> Result<Epoch, ParsingError> {
    if !(1..=12).contains(&month) {
        return Err(ParsingError::Month);
    }
    if !(1..=31).contains(&day) {
        return Err(ParsingError::Day);
    }
    if hours > 23 {
        return Err(ParsingError::Hours);
    }
    if minutes > 59 {
        return Err(ParsingError::Minutes);
    }
    if !seconds.is_finite() || !(0.0..61.0).contains(&seconds) {
        return Err(ParsingError::Seconds);
    }

    let epoch = Epoch::maybe_from_gregorian(year, month, day, hours, minutes, 0, 0, ts)
        .or(Err(ParsingError::CalendarDate))?;

    Ok(epoch + Duration::from_seconds(seconds))
}

/// Parses a satellite identifier. A blank system letter means GPS.
pub(crate) fn parse_sv(content: &str) -> Result<SV, ParsingError> {
    let content = content.trim_end();
    let err = || ParsingError::SatelliteId(content.to_string());

    let (letter, prn) = match content.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => (c, &content[1..]),
        Some(_) => ('G', content),
        None => return Err(err()),
    };

    let prn = prn.trim().parse::<u8>().or(Err(err()))?;
    let constellation = Constellation::from_str(&letter.to_string()).or(Err(err()))?;

    Ok(SV::new(constellation, prn))
}

/// Parses a packed list of 3 character satellite identifiers.
pub(crate) fn parse_sv_list(content: &str) -> Result<Vec<SV>, ParsingError> {
    let mut satellites = Vec::with_capacity(content.len() / 3);
    for chunk in content.as_bytes().chunks(3) {
        let item = std::str::from_utf8(chunk)
            .or(Err(ParsingError::SatelliteId(String::from_utf8_lossy(chunk).into_owned())))?;
        if item.trim().is_empty() {
            continue;
        }
        satellites.push(parse_sv(item)?);
    }
    Ok(satellites)
}

fn parse_count(content: Option<&str>) -> Result<usize, ParsingError> {
    content
        .ok_or(ParsingError::SatelliteCount)?
        .trim()
        .parse::<usize>()
        .or(Err(ParsingError::SatelliteCount))
}

/// Fixed columns layout, shared by RINEX2 and CRINEX `&` lines.
fn parse_fixed_columns(line: &str, ts: TimeScale) -> Result<(Epoch, EpochFlag, usize), ParsingError> {
    if line.len() < 29 {
        return Err(ParsingError::LineTooShort);
    }

    let year = parse_column::<i32>(line, 1, 3).ok_or(ParsingError::Year)?;
    let month = parse_column::<u8>(line, 3, 6).ok_or(ParsingError::Month)?;
    let day = parse_column::<u8>(line, 6, 9).ok_or(ParsingError::Day)?;
    let hours = parse_column::<u8>(line, 9, 12).ok_or(ParsingError::Hours)?;
    let minutes = parse_column::<u8>(line, 12, 15).ok_or(ParsingError::Minutes)?;
    let seconds = parse_column::<f64>(line, 15, 26).ok_or(ParsingError::Seconds)?;

    let flag = EpochFlag::from_str(column(line, 28, 29).unwrap_or(""))?;
    let declared = parse_count(column(line, 29, 32))?;

    let epoch = calendar_epoch(resolve_year(year), month, day, hours, minutes, seconds, ts)?;
    Ok((epoch, flag, declared))
}

/// Whitespace separated layout of `>` lines.
fn parse_tokens(line: &str, ts: TimeScale) -> Result<(Epoch, EpochFlag, usize), ParsingError> {
    let mut items = line.get(1..).unwrap_or("").split_ascii_whitespace();

    let year = items
        .next()
        .and_then(|s| s.parse::<i32>().ok())
        .ok_or(ParsingError::Year)?;
    let month = items
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or(ParsingError::Month)?;
    let day = items
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or(ParsingError::Day)?;
    let hours = items
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or(ParsingError::Hours)?;
    let minutes = items
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or(ParsingError::Minutes)?;
    let seconds = items
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or(ParsingError::Seconds)?;

    let flag = EpochFlag::from_str(items.next().ok_or(ParsingError::EpochFlag)?)?;
    let declared = parse_count(items.next())?;

    let epoch = calendar_epoch(resolve_year(year), month, day, hours, minutes, seconds, ts)?;
    Ok((epoch, flag, declared))
}

/// Parses an epoch header line of given [EpochFormat].
pub(crate) fn parse_epoch_header(
    line: &str,
    format: EpochFormat,
    ts: TimeScale,
) -> Result<EpochHeader, ParsingError> {
    let (epoch, flag, declared, satellites) = match format {
        EpochFormat::Rinex2 => {
            let (epoch, flag, declared) = parse_fixed_columns(line, ts)?;
            let satellites = if flag.announces_special_records() {
                Vec::new()
            } else {
                match column(line, RINEX2_SV_LIST_START, RINEX2_SV_LIST_END) {
                    Some(list) => parse_sv_list(list)?,
                    None => Vec::new(),
                }
            };
            (epoch, flag, declared, satellites)
        },
        EpochFormat::Rinex3 => {
            let (epoch, flag, declared) = parse_tokens(line, ts)?;
            (epoch, flag, declared, Vec::new())
        },
        EpochFormat::Crinex => {
            if line.starts_with('&') {
                let (epoch, flag, declared) = parse_fixed_columns(line, ts)?;
                let satellites = match column(line, RINEX2_SV_LIST_START, line.len()) {
                    Some(list) => parse_sv_list(list)?,
                    None => Vec::new(),
                };
                (epoch, flag, declared, satellites)
            } else {
                // the satellite list follows the count, after the clock field
                let head = column(line, 0, CRINEX3_SV_LIST_START).unwrap_or(line);
                let (epoch, flag, declared) = parse_tokens(head, ts)?;
                let satellites = match column(line, CRINEX3_SV_LIST_START, line.len()) {
                    Some(list) => parse_sv_list(list)?,
                    None => Vec::new(),
                };
                (epoch, flag, declared, satellites)
            }
        },
    };

    Ok(EpochHeader {
        epoch,
        flag,
        format,
        declared,
        satellites,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn gpst(y: i32, m: u8, d: u8, hh: u8, mm: u8, ss: u8) -> Epoch {
        Epoch::from_gregorian(y, m, d, hh, mm, ss, 0, TimeScale::GPST)
    }

    #[test]
    fn century_pivot() {
        assert_eq!(resolve_year(0), 2000);
        assert_eq!(resolve_year(22), 2022);
        assert_eq!(resolve_year(79), 2079);
        assert_eq!(resolve_year(80), 1980);
        assert_eq!(resolve_year(99), 1999);
        assert_eq!(resolve_year(2011), 2011);
    }

    #[test]
    fn sv_identifiers() {
        let g01 = SV::new(Constellation::GPS, 1);
        assert_eq!(parse_sv("G01").unwrap(), g01);
        assert_eq!(parse_sv("G 1").unwrap(), g01);
        assert_eq!(parse_sv(" 01").unwrap(), g01);
        assert_eq!(parse_sv("  1").unwrap(), g01);
        assert_eq!(
            parse_sv("E12").unwrap(),
            SV::new(Constellation::Galileo, 12)
        );
        assert_eq!(
            parse_sv("R24").unwrap(),
            SV::new(Constellation::Glonass, 24)
        );
        assert!(parse_sv("").is_err());
        assert!(parse_sv("Gxx").is_err());

        let list = parse_sv_list("G01G03R05E12   ").unwrap();
        assert_eq!(
            list,
            vec![
                g01,
                SV::new(Constellation::GPS, 3),
                SV::new(Constellation::Glonass, 5),
                SV::new(Constellation::Galileo, 12),
            ]
        );
        assert!(parse_sv_list("G01G0x").is_err());
    }

    #[test]
    fn rinex2_epoch_header() {
        let line = " 22  1  5  0  0 30.0000000  0  3G01G03G07";
        let header = parse_epoch_header(line, EpochFormat::Rinex2, TimeScale::GPST).unwrap();
        assert_eq!(header.epoch, gpst(2022, 1, 5, 0, 0, 30));
        assert_eq!(header.flag, EpochFlag::Ok);
        assert_eq!(header.declared, 3);
        assert_eq!(header.satellites.len(), 3);

        // previous century
        let line = " 98 12 31 23 59 59.0000000  1  1G11";
        let header = parse_epoch_header(line, EpochFormat::Rinex2, TimeScale::GPST).unwrap();
        assert_eq!(header.epoch, gpst(1998, 12, 31, 23, 59, 59));
        assert_eq!(header.flag, EpochFlag::PowerFailure);

        // special records: no satellite list
        let line = " 22  1  5  0  0 30.0000000  4  2";
        let header = parse_epoch_header(line, EpochFormat::Rinex2, TimeScale::GPST).unwrap();
        assert_eq!(header.flag, EpochFlag::HeaderInformationFollows);
        assert_eq!(header.declared, 2);
        assert!(header.satellites.is_empty());
    }

    #[test]
    fn rinex2_epoch_header_errors() {
        for (line, error) in [
            (" 22  1  5  0  0", ParsingError::LineTooShort),
            (" 22 13  5  0  0 30.0000000  0  3G01G03G07", ParsingError::Month),
            (" 22  2 30  0  0 30.0000000  0  3G01G03G07", ParsingError::CalendarDate),
            (" 22  1  5 24  0 30.0000000  0  3G01G03G07", ParsingError::Hours),
            (" 22  1  5  0 60 30.0000000  0  3G01G03G07", ParsingError::Minutes),
            (" 22  1  5  0  0 30.0000000  9  3G01G03G07", ParsingError::EpochFlag),
            (" 22  1  5  0  0 30.0000000  0  xG01G03G07", ParsingError::SatelliteCount),
            (" 22  1  5  0  0  x.0000000  0  3G01G03G07", ParsingError::Seconds),
        ] {
            assert_eq!(
                parse_epoch_header(line, EpochFormat::Rinex2, TimeScale::GPST),
                Err(error),
                "\"{}\"",
                line
            );
        }
    }

    #[test]
    fn rinex3_epoch_header() {
        let line = "> 2022 01 05 12 30  0.5000000  0 12";
        let header = parse_epoch_header(line, EpochFormat::Rinex3, TimeScale::GPST).unwrap();
        assert_eq!(
            header.epoch,
            gpst(2022, 1, 5, 12, 30, 0) + Duration::from_seconds(0.5)
        );
        assert_eq!(header.declared, 12);
        assert!(header.satellites.is_empty());

        // receiver clock offset is ignored
        let line = "> 2021 12 21 00 00 30.0000000  0  2       0.000000000000";
        let header = parse_epoch_header(line, EpochFormat::Rinex3, TimeScale::GST).unwrap();
        assert_eq!(
            header.epoch,
            Epoch::from_gregorian(2021, 12, 21, 0, 0, 30, 0, TimeScale::GST)
        );
        assert_eq!(header.declared, 2);

        assert_eq!(
            parse_epoch_header("> 2022 01 05", EpochFormat::Rinex3, TimeScale::GPST),
            Err(ParsingError::Hours)
        );
    }

    #[test]
    fn crinex_epoch_headers() {
        let line = "&22  1  5  0  0 30.0000000  0  4G01G03G07R04";
        let header = parse_epoch_header(line, EpochFormat::Crinex, TimeScale::GPST).unwrap();
        assert_eq!(header.epoch, gpst(2022, 1, 5, 0, 0, 30));
        assert_eq!(header.declared, 4);
        assert_eq!(header.satellites.len(), 4);

        let line = "> 2022 01 05 00 00 30.0000000  0  3      G01G03E11";
        assert_eq!(line.find("G01"), Some(41));
        let header = parse_epoch_header(line, EpochFormat::Crinex, TimeScale::GPST).unwrap();
        assert_eq!(header.epoch, gpst(2022, 1, 5, 0, 0, 30));
        assert_eq!(header.declared, 3);
        assert_eq!(
            header.satellites,
            vec![
                SV::new(Constellation::GPS, 1),
                SV::new(Constellation::GPS, 3),
                SV::new(Constellation::Galileo, 11),
            ]
        );
    }
}
