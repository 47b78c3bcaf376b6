//! Key layout of a legacy shard
//!
//! ```text
//! s \0 <db> \0 <series>                 -> ()            series index
//! f \0 <db> \0 <series> \0 <field>      -> u64 BE        field id
//! p <field id BE> <ts ^ 1<<63 BE> <seq BE> -> JSON value  point column
//! m \0 next_field_id                    -> u64 BE        id counter
//! ```
//!
//! Flipping the timestamp sign bit makes byte order match signed order,
//! so a reverse scan over one field id yields newest points first.

const SEP: u8 = 0;
const SIGN_BIT: u64 = 1 << 63;

/// Length of a point key
pub const POINT_KEY_LEN: usize = 1 + 8 + 8 + 8;

/// Key of the field id counter
pub const NEXT_FIELD_ID_KEY: &[u8] = b"m\0next_field_id";

fn tagged(tag: u8, parts: &[&str]) -> Vec<u8> {
    let mut key = vec![tag];
    for part in parts {
        key.push(SEP);
        key.extend_from_slice(part.as_bytes());
    }
    key
}

/// Index entry marking `series` as present in `database`
pub fn series_key(database: &str, series: &str) -> Vec<u8> {
    tagged(b's', &[database, series])
}

/// Prefix covering every series of `database`
pub fn series_prefix(database: &str) -> Vec<u8> {
    let mut key = tagged(b's', &[database]);
    key.push(SEP);
    key
}

/// Field definition key
pub fn field_key(database: &str, series: &str, field: &str) -> Vec<u8> {
    tagged(b'f', &[database, series, field])
}

/// Prefix covering every field of one series
pub fn field_prefix(database: &str, series: &str) -> Vec<u8> {
    let mut key = tagged(b'f', &[database, series]);
    key.push(SEP);
    key
}

/// Prefix covering every point of one field
pub fn point_prefix(field_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(b'p');
    key.extend_from_slice(&field_id.to_be_bytes());
    key
}

/// Point column key
pub fn point_key(field_id: u64, timestamp: i64, sequence_number: u64) -> Vec<u8> {
    let mut key = point_prefix(field_id);
    key.extend_from_slice(&((timestamp as u64) ^ SIGN_BIT).to_be_bytes());
    key.extend_from_slice(&sequence_number.to_be_bytes());
    key
}

/// Extracts `(timestamp, sequence_number)` from a point key.
pub fn decode_point_key(key: &[u8]) -> Option<(i64, u64)> {
    if key.len() != POINT_KEY_LEN || key[0] != b'p' {
        return None;
    }
    let ts = u64::from_be_bytes(key[9..17].try_into().ok()?);
    let seq = u64::from_be_bytes(key[17..25].try_into().ok()?);
    Some(((ts ^ SIGN_BIT) as i64, seq))
}

/// Returns the part of `key` after `prefix` as UTF-8.
pub fn suffix_str<'a>(key: &'a [u8], prefix: &[u8]) -> Option<&'a str> {
    key.strip_prefix(prefix)
        .and_then(|rest| std::str::from_utf8(rest).ok())
}

/// Encodes a field id or counter value.
pub fn encode_id(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

/// Decodes a field id or counter value.
pub fn decode_id(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_key_order_matches_time_order() {
        let early = point_key(3, -5, 0);
        let zero = point_key(3, 0, 0);
        let late = point_key(3, 1_700_000_000_000_000, 0);
        let late_seq = point_key(3, 1_700_000_000_000_000, 1);
        assert!(early < zero);
        assert!(zero < late);
        assert!(late < late_seq);
    }

    #[test]
    fn test_decode_point_key() {
        let key = point_key(9, -42, 7);
        assert_eq!(key.len(), POINT_KEY_LEN);
        assert!(key.starts_with(&point_prefix(9)));
        assert_eq!(decode_point_key(&key), Some((-42, 7)));
        assert_eq!(decode_point_key(b"p123"), None);
    }

    #[test]
    fn test_series_prefix_does_not_match_longer_database() {
        let key = series_key("db_ab", "cpu");
        assert!(!key.starts_with(&series_prefix("db_a")));
        assert_eq!(suffix_str(&series_key("db_a", "cpu"), &series_prefix("db_a")), Some("cpu"));
    }

    #[test]
    fn test_id_codec() {
        assert_eq!(decode_id(&encode_id(77)), Some(77));
        assert_eq!(decode_id(b"short"), None);
    }
}
