//! CRC32 checksums for segment records
//!
//! A record checksum covers the length prefix and the body, never itself.

use crc32fast::Hasher;

/// Computes the CRC32 (IEEE) checksum of a record's length prefix and body.
pub fn record_checksum(length_prefix: [u8; 4], body: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&length_prefix);
    hasher.update(body);
    hasher.finalize()
}

/// Verifies a stored checksum against the framed bytes it covers.
///
/// `framed` is the record without its trailing checksum.
pub fn verify_record(framed: &[u8], expected: u32) -> bool {
    if framed.len() < 4 {
        return false;
    }
    let prefix = [framed[0], framed[1], framed[2], framed[3]];
    record_checksum(prefix, &framed[4..]) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_covers_length_prefix() {
        let body = b"series point";
        let a = record_checksum(10u32.to_le_bytes(), body);
        let b = record_checksum(11u32.to_le_bytes(), body);
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_record() {
        let body = b"payload";
        let prefix = 15u32.to_le_bytes();
        let crc = record_checksum(prefix, body);

        let mut framed = prefix.to_vec();
        framed.extend_from_slice(body);
        assert!(verify_record(&framed, crc));

        framed[5] ^= 0x01;
        assert!(!verify_record(&framed, crc));
    }

    #[test]
    fn test_verify_rejects_short_input() {
        assert!(!verify_record(&[0x01, 0x02], 0));
    }
}
