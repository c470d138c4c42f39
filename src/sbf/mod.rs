//! Septentrio Binary Format block scanner.
//!
//! The scanner walks a byte buffer looking for block sync markers,
//! decodes each block header and counts block types. It never fails:
//! truncated input simply terminates the scan and is reported.
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::Path;

mod block;
mod crc;

pub use block::{label, KnownBlock, SbfBlock, HEADER_LEN, SYNC1, SYNC2, UNKNOWN_LABEL};
pub use crc::crc16;

use crate::errors::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// [ScanOptions] used by the [Scanner].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanOptions {
    /// When set, the header length field is authoritative and the block
    /// checksum must match. A mismatching candidate is discarded and the
    /// scan resumes one byte further. When not set, the historical
    /// behavior applies: length deduced from the 3 upper ID bits,
    /// no checksum verification.
    pub crc_check: bool,
    /// Stop scanning once this many bytes past the start offset were visited.
    pub max_bytes: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            crc_check: true,
            max_bytes: None,
        }
    }
}

impl ScanOptions {
    /// Returns [ScanOptions] with checksum verification enabled or disabled.
    pub fn with_crc_check(&self, crc_check: bool) -> Self {
        let mut s = self.clone();
        s.crc_check = crc_check;
        s
    }

    /// Returns [ScanOptions] with a scanning budget, in bytes.
    pub fn with_max_bytes(&self, max_bytes: usize) -> Self {
        let mut s = self.clone();
        s.max_bytes = Some(max_bytes);
        s
    }
}

/// [ScanReport] summarizes one scan.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanReport {
    /// Offset reached. On truncation, this is the offset of the
    /// incomplete block, so scanning may resume there once more bytes are available.
    pub offset: usize,
    /// True when the scan ended on an incomplete block
    pub truncated: bool,
    /// Number of blocks per block ID
    pub counts: BTreeMap<u16, usize>,
    /// Sync candidates rejected by checksum or length verification
    pub rejected: usize,
}

impl ScanReport {
    /// Total number of blocks identified.
    pub fn total_blocks(&self) -> usize {
        self.counts.values().sum()
    }

    /// Block counts per label. Ids we cannot name are grouped under [UNKNOWN_LABEL].
    pub fn by_label(&self) -> BTreeMap<String, usize> {
        let mut labels = BTreeMap::new();
        for (id, count) in self.counts.iter() {
            *labels.entry(label(*id)).or_insert(0) += count;
        }
        labels
    }

    /// True if at least one position solution block was found.
    pub fn has_position_blocks(&self) -> bool {
        self.counts.keys().any(|id| {
            KnownBlock::from_id(*id)
                .map(|block| block.is_position())
                .unwrap_or(false)
        })
    }
}

/// [Scanner] iterates over the [SbfBlock]s of a buffer.
pub struct Scanner<'a> {
    buf: &'a [u8],
    cursor: usize,
    limit: usize,
    options: ScanOptions,
    truncated_at: Option<usize>,
    rejected: usize,
    done: bool,
}

impl<'a> Scanner<'a> {
    /// Builds a [Scanner] starting at `start` within `buf`.
    pub fn new(buf: &'a [u8], start: usize, options: ScanOptions) -> Self {
        let limit = match options.max_bytes {
            Some(max) => start.saturating_add(max),
            None => usize::MAX,
        };
        Self {
            buf,
            limit,
            options,
            cursor: start,
            rejected: 0,
            done: false,
            truncated_at: None,
        }
    }

    /// Current scanning offset.
    pub fn offset(&self) -> usize {
        self.truncated_at.unwrap_or(self.cursor)
    }

    /// True if the scan ended on an incomplete block.
    pub fn truncated(&self) -> bool {
        self.truncated_at.is_some()
    }

    fn is_sync(&self, offset: usize) -> bool {
        self.buf[offset] == SYNC1 && self.buf[offset + 1] == SYNC2
    }

    fn truncate(&mut self) {
        debug!("sbf: incomplete block @{}", self.cursor);
        self.truncated_at = Some(self.cursor);
        self.done = true;
    }

    /// Historical resolution: no checksum, length hint from the revision bits.
    fn next_unverified(&mut self) -> Option<SbfBlock> {
        let (mut block, hint, extended) =
            SbfBlock::decode_header(self.cursor, &self.buf[self.cursor..self.cursor + HEADER_LEN]);

        let length = if hint > 0 { hint } else { extended };

        if length == 0 {
            // unresolved: skip the header only
            self.cursor += HEADER_LEN;
            return Some(block);
        }

        if self.cursor.saturating_add(length) > self.buf.len() {
            self.truncate();
            return None;
        }

        block.length = length;
        self.cursor += length;
        Some(block)
    }

    /// Verified resolution: header length field + checksum.
    /// Returns None when the candidate was rejected (or input is truncated).
    fn next_verified(&mut self) -> Option<SbfBlock> {
        let (mut block, _, length) =
            SbfBlock::decode_header(self.cursor, &self.buf[self.cursor..self.cursor + HEADER_LEN]);

        if length < HEADER_LEN || length % 4 != 0 {
            self.rejected += 1;
            self.cursor += 1;
            return None;
        }

        if self.cursor.saturating_add(length) > self.buf.len() {
            // either a block cut short, or a false sync inside a payload
            // close to the end of the buffer: keep looking for real blocks.
            if self.truncated_at.is_none() {
                self.truncated_at = Some(self.cursor);
            }
            self.cursor += 1;
            return None;
        }

        let crc = crc16(&self.buf[self.cursor + 4..self.cursor + length]);
        if crc != block.crc {
            debug!(
                "sbf: checksum mismatch @{} (id={}) {:04x} != {:04x}",
                self.cursor, block.id, crc, block.crc
            );
            self.rejected += 1;
            self.cursor += 1;
            return None;
        }

        block.length = length;
        self.cursor += length;
        // a valid block past a suspected truncation proves it was a false sync
        self.truncated_at = None;
        Some(block)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = SbfBlock;
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.cursor >= self.limit || self.cursor.saturating_add(2) > self.buf.len() {
                if self.cursor >= self.limit && self.cursor < self.buf.len() {
                    debug!("sbf: scanning budget exhausted @{}", self.cursor);
                }
                self.done = true;
                return None;
            }

            if !self.is_sync(self.cursor) {
                self.cursor += 1;
                continue;
            }

            if self.cursor.saturating_add(HEADER_LEN) > self.buf.len() {
                if self.options.crc_check && self.truncated_at.is_some() {
                    // an earlier incomplete candidate already marks the resume point
                    self.done = true;
                } else {
                    self.truncate();
                }
                return None;
            }

            if self.options.crc_check {
                if let Some(block) = self.next_verified() {
                    return Some(block);
                }
            } else {
                return self.next_unverified();
            }
        }
    }
}

/// Scans `buf` from `start` and counts blocks per ID.
pub fn scan(buf: &[u8], start: usize, options: ScanOptions) -> ScanReport {
    let mut counts = BTreeMap::<u16, usize>::new();
    let mut scanner = Scanner::new(buf, start, options);

    for block in scanner.by_ref() {
        *counts.entry(block.id).or_insert(0) += 1;
    }

    let report = ScanReport {
        counts,
        offset: scanner.offset(),
        truncated: scanner.truncated(),
        rejected: scanner.rejected,
    };

    if report.total_blocks() > 0 && !report.has_position_blocks() {
        warn!("sbf: no position blocks (PVTGeodetic, PVTCartesian) found");
    }

    report
}

/// Reads and scans an entire SBF file.
pub fn scan_file<P: AsRef<Path>>(path: P, options: ScanOptions) -> Result<ScanReport, Error> {
    let bytes = std::fs::read(path)?;
    Ok(scan(&bytes, 0, options))
}
