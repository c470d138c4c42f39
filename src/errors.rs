use std::io::Error as IoError;
use thiserror::Error;

/// Crate level errors. Only I/O failures escape the decoders:
/// malformed content is recovered locally and reported through statistics.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    IoError(#[from] IoError),
}

/// Line level parsing errors. These never abort a file:
/// the decoder logs them, skips the line and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParsingError {
    #[error("line too short")]
    LineTooShort,
    #[error("unrecognized epoch header")]
    UnknownEpochFormat,
    #[error("invalid year")]
    Year,
    #[error("invalid month")]
    Month,
    #[error("invalid day")]
    Day,
    #[error("invalid hours")]
    Hours,
    #[error("invalid minutes")]
    Minutes,
    #[error("invalid seconds")]
    Seconds,
    #[error("invalid epoch flag")]
    EpochFlag,
    #[error("invalid number of satellites")]
    SatelliteCount,
    #[error("invalid satellite identifier \"{0}\"")]
    SatelliteId(String),
    #[error("non existing calendar date")]
    CalendarDate,
    #[error("invalid version")]
    Version,
}

/// Errors while synthesizing RINEX content.
#[derive(Debug, Error)]
pub enum FormattingError {
    #[error("i/o error: {0}")]
    Stdio(#[from] IoError),
}
