use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// First sync byte ('$')
pub const SYNC1: u8 = 0x24;

/// Second sync byte ('@')
pub const SYNC2: u8 = 0x40;

/// Sync + CRC + ID + Length
pub const HEADER_LEN: usize = 8;

/// Label under which unnamed block ids are grouped.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Block types we know how to name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumIter)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KnownBlock {
    GenMeasEpoch = 4000,
    MeasEpoch = 4001,
    PVTCartesian = 4006,
    PVTGeodetic = 4007,
    PosCovGeodetic = 4013,
    BaseVectorGeod = 4027,
    PVTSatCartesian = 5891,
    EndOfPVT = 5905,
    PosCart = 5912,
    PosLocal = 5913,
    PosProjected = 5914,
}

impl KnownBlock {
    /// Identifies a block from its 13 bit ID.
    pub fn from_id(id: u16) -> Option<Self> {
        Self::iter().find(|block| *block as u16 == id)
    }

    /// True for blocks carrying a position solution.
    pub fn is_position(&self) -> bool {
        matches!(self, Self::PVTCartesian | Self::PVTGeodetic)
    }
}

/// Returns the display label of a block id.
pub fn label(id: u16) -> String {
    match KnownBlock::from_id(id) {
        Some(block) => block.to_string(),
        None => UNKNOWN_LABEL.to_string(),
    }
}

/// [SbfBlock] header, as identified by the scanner.
/// The payload is never retained.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SbfBlock {
    /// Offset of the sync marker within the scanned buffer
    pub offset: usize,
    /// Header checksum
    pub crc: u16,
    /// Block ID (13 bits)
    pub id: u16,
    /// Block revision (3 bits)
    pub revision: u8,
    /// Resolved block length, header included.
    /// Zero when it could not be resolved.
    pub length: usize,
}

impl SbfBlock {
    /// Decodes the fixed header starting at the sync marker.
    /// `header` must hold at least [HEADER_LEN] bytes.
    pub(crate) fn decode_header(offset: usize, header: &[u8]) -> (Self, usize, usize) {
        let crc = u16::from_le_bytes([header[2], header[3]]);
        let id_field = u16::from_le_bytes([header[4], header[5]]);
        let extended = u16::from_le_bytes([header[6], header[7]]) as usize;

        let revision = ((id_field >> 13) & 0x7) as u8;
        let length_hint = revision as usize * 4;

        let block = Self {
            offset,
            crc,
            id: id_field & 0x1FFF,
            revision,
            length: 0,
        };

        (block, length_hint, extended)
    }

    /// Returns this block's label.
    pub fn label(&self) -> String {
        label(self.id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_blocks() {
        assert_eq!(KnownBlock::from_id(4007), Some(KnownBlock::PVTGeodetic));
        assert_eq!(KnownBlock::from_id(5914), Some(KnownBlock::PosProjected));
        assert_eq!(KnownBlock::from_id(1), None);
        assert!(KnownBlock::PVTCartesian.is_position());
        assert!(!KnownBlock::MeasEpoch.is_position());
        assert_eq!(label(4001), "MeasEpoch");
        assert_eq!(label(0x1FFF), "Unknown");
    }

    #[test]
    fn header_decoding() {
        // id 4007 revision 2, length 96
        let id_field = 4007u16 | (2 << 13);
        let mut header = vec![SYNC1, SYNC2, 0xCD, 0xAB];
        header.extend_from_slice(&id_field.to_le_bytes());
        header.extend_from_slice(&96u16.to_le_bytes());

        let (block, hint, extended) = SbfBlock::decode_header(12, &header);
        assert_eq!(block.offset, 12);
        assert_eq!(block.crc, 0xABCD);
        assert_eq!(block.id, 4007);
        assert_eq!(block.revision, 2);
        assert_eq!(hint, 8);
        assert_eq!(extended, 96);
    }
}
