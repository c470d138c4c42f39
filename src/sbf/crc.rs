//! SBF block checksum: CRC-16/CCITT, polynomial 0x1021, zero init,
//! no reflection, computed over the block from the ID field onwards.

const POLYNOMIAL: u16 = 0x1021;

/// Computes the SBF checksum of given bytes.
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = 0u16;
    for byte in bytes {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
