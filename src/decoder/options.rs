#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cooperative bounds of a [super::Decoder], checked before each line.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecoderOptions {
    /// Stop once this many epochs were decoded
    pub max_epochs: Option<usize>,
    /// Stop once this many bytes were read (header included)
    pub max_bytes: Option<usize>,
}

impl DecoderOptions {
    /// Returns [DecoderOptions] with desired epoch budget.
    pub fn with_max_epochs(&self, max_epochs: usize) -> Self {
        let mut s = *self;
        s.max_epochs = Some(max_epochs);
        s
    }

    /// Returns [DecoderOptions] with desired byte budget.
    pub fn with_max_bytes(&self, max_bytes: usize) -> Self {
        let mut s = *self;
        s.max_bytes = Some(max_bytes);
        s
    }
}

/// Decoding statistics. Recovered failures end up here.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodingStats {
    /// Lines read, header included
    pub lines: usize,
    /// Bytes read, header included
    pub bytes: usize,
    /// Epochs emitted
    pub epochs: usize,
    /// Lines that could not be decoded and were skipped
    pub malformed_lines: usize,
    /// Satellite records with fewer fields than declared observables
    pub short_records: usize,
    /// Epochs closed before all declared records were read
    pub truncated_epochs: usize,
    /// Special record lines (events, header updates) consumed
    pub special_records: usize,
    /// True when an I/O error ended the decoding
    pub interrupted: bool,
}
