//! Fixed width and numeric helpers shared by the decoders and the detector.
use crate::prelude::{Constellation, Epoch, SV};
use std::io::BufRead;

/// Reads the next line, without its terminator (LF or CRLF).
/// Non UTF-8 content is decoded lossily.
/// Returns the line and the number of bytes consumed, None at end of input.
pub(crate) fn read_line<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<(String, usize)>> {
    buf.clear();
    let size = reader.read_until(b'\n', buf)?;
    if size == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }
    Ok(Some((String::from_utf8_lossy(buf).into_owned(), size)))
}

/// Returns the `[start, end)` column range of a RINEX line,
/// clamped to the line length. None when start lies beyond the line
/// or when the range does not fall on character boundaries.
pub(crate) fn column(line: &str, start: usize, end: usize) -> Option<&str> {
    let end = end.min(line.len());
    if start >= end {
        return None;
    }
    line.get(start..end)
}

/// Parses a trimmed fixed width column.
pub(crate) fn parse_column<T: std::str::FromStr>(line: &str, start: usize, end: usize) -> Option<T> {
    let content = column(line, start, end)?.trim();
    if content.is_empty() {
        None
    } else {
        content.parse::<T>().ok()
    }
}

/// Median of the finite values, None on empty input.
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect::<Vec<_>>();

    if sorted.is_empty() {
        return None;
    }

    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Population mean, None on empty input.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation (numpy default), None on empty input.
pub(crate) fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// First order differences.
pub(crate) fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// RINEX letter of this [Constellation].
pub(crate) fn constellation_letter(constellation: Constellation) -> char {
    match constellation {
        Constellation::GPS => 'G',
        Constellation::Glonass => 'R',
        Constellation::Galileo => 'E',
        Constellation::BeiDou => 'C',
        Constellation::QZSS => 'J',
        Constellation::IRNSS => 'I',
        Constellation::Mixed => 'M',
        // augmentation systems
        _ => 'S',
    }
}

/// RINEX satellite label, like `G01`.
pub(crate) fn sv_label(sv: SV) -> String {
    format!("{}{:02}", constellation_letter(sv.constellation), sv.prn)
}

/// Decomposes an [Epoch] into its calendar fields, expressed in its own
/// time scale: (year, month, day, hours, minutes, fractional seconds).
pub(crate) fn gregorian(epoch: Epoch) -> (i32, u8, u8, u8, u8, f64) {
    let (y, m, d, hh, mm, ss, nanos) = epoch.to_gregorian(epoch.time_scale);
    (y, m, d, hh, mm, ss as f64 + nanos as f64 * 1.0E-9)
}
