//! Composite key encoding for the shared ordered keyspace
//!
//! Every physical key starts with a one-byte database index and a one-byte
//! type tag. Member-bearing tables insert a `u16be` key-length prefix so
//! decoding is unambiguous, and a separator byte whose successor delimits
//! the end of a collection's range. These byte layouts are the on-disk
//! format; the tag values and separators are stable constants.

use crate::error::{Result, StoreError};

/// Stable one-byte table tags
pub mod tag {
    pub const KV: u8 = b'k';
    pub const HASH: u8 = b'h';
    pub const HASH_SIZE: u8 = b'H';
    pub const LIST: u8 = b'l';
    pub const LIST_META: u8 = b'L';
    pub const SET: u8 = b's';
    pub const SET_SIZE: u8 = b'S';
    pub const ZSET: u8 = b'z';
    pub const ZSET_SIZE: u8 = b'Z';
    pub const ZSET_SCORE: u8 = b'z' + 1;
    pub const BIT: u8 = b'b';
    pub const BIT_META: u8 = b'B';
    pub const EXP_META: u8 = b'm';
    pub const EXP_TIME: u8 = b't';
}

/// Start separator between the collection key and its member.
pub const START_SEP: u8 = b':';

/// Stop separator: `START_SEP + 1`, the exclusive end of a member range.
pub const STOP_SEP: u8 = START_SEP + 1;

const SIGN_MASK: u64 = 1 << 63;

/// Logical data type, as recorded in the expiration registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Kv,
    Hash,
    List,
    Set,
    ZSet,
    Bit,
}

impl DataType {
    pub fn tag(self) -> u8 {
        match self {
            DataType::Kv => tag::KV,
            DataType::Hash => tag::HASH,
            DataType::List => tag::LIST,
            DataType::Set => tag::SET,
            DataType::ZSet => tag::ZSET,
            DataType::Bit => tag::BIT,
        }
    }

    pub fn from_tag(t: u8) -> Option<Self> {
        match t {
            tag::KV => Some(DataType::Kv),
            tag::HASH => Some(DataType::Hash),
            tag::LIST => Some(DataType::List),
            tag::SET => Some(DataType::Set),
            tag::ZSET => Some(DataType::ZSet),
            tag::BIT => Some(DataType::Bit),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Kv => "kv",
            DataType::Hash => "hash",
            DataType::List => "list",
            DataType::Set => "set",
            DataType::ZSet => "zset",
            DataType::Bit => "bitmap",
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar values
// ---------------------------------------------------------------------------

/// Big-endian two's-complement i64, the value form of every stored scalar.
pub fn encode_i64(v: i64) -> [u8; 8] {
    v.to_be_bytes()
}

pub fn decode_i64(buf: &[u8]) -> Result<i64> {
    let arr: [u8; 8] = buf.try_into().map_err(|_| StoreError::InvalidEncoding)?;
    Ok(i64::from_be_bytes(arr))
}

/// i64 with the sign bit flipped, so raw byte order equals numeric order.
/// Used inside keys (scores, list indices, expire instants).
pub fn encode_ordered_i64(v: i64) -> [u8; 8] {
    ((v as u64) ^ SIGN_MASK).to_be_bytes()
}

pub fn decode_ordered_i64(buf: &[u8]) -> Result<i64> {
    let arr: [u8; 8] = buf.try_into().map_err(|_| StoreError::InvalidEncoding)?;
    Ok((u64::from_be_bytes(arr) ^ SIGN_MASK) as i64)
}

// ---------------------------------------------------------------------------
// KV
// ---------------------------------------------------------------------------

pub fn encode_kv_key(db: u8, key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + key.len());
    buf.push(db);
    buf.push(tag::KV);
    buf.extend_from_slice(key);
    buf
}

pub fn decode_kv_key(db: u8, ek: &[u8]) -> Result<Vec<u8>> {
    if ek.len() < 2 || ek[0] != db || ek[1] != tag::KV {
        return Err(StoreError::InvalidEncoding);
    }
    Ok(ek[2..].to_vec())
}

// ---------------------------------------------------------------------------
// Member-bearing tables (hash fields, set members, zset member index)
// ---------------------------------------------------------------------------

fn encode_member_key(db: u8, table: u8, key: &[u8], member: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(5 + key.len() + member.len());
    buf.push(db);
    buf.push(table);
    buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
    buf.extend_from_slice(key);
    buf.push(START_SEP);
    buf.extend_from_slice(member);
    buf
}

fn decode_member_key(db: u8, table: u8, ek: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    if ek.len() < 5 || ek[0] != db || ek[1] != table {
        return Err(StoreError::InvalidEncoding);
    }
    let key_len = u16::from_be_bytes([ek[2], ek[3]]) as usize;
    if 5 + key_len > ek.len() {
        return Err(StoreError::InvalidEncoding);
    }
    let key = ek[4..4 + key_len].to_vec();
    if ek[4 + key_len] != START_SEP {
        return Err(StoreError::InvalidEncoding);
    }
    let member = ek[5 + key_len..].to_vec();
    Ok((key, member))
}

fn member_start_key(db: u8, table: u8, key: &[u8]) -> Vec<u8> {
    encode_member_key(db, table, key, &[])
}

fn member_stop_key(db: u8, table: u8, key: &[u8]) -> Vec<u8> {
    let mut buf = encode_member_key(db, table, key, &[]);
    let last = buf.len() - 1;
    buf[last] = STOP_SEP;
    buf
}

fn encode_scalar_key(db: u8, table: u8, key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + key.len());
    buf.push(db);
    buf.push(table);
    buf.extend_from_slice(key);
    buf
}

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

pub fn encode_hash_key(db: u8, key: &[u8], field: &[u8]) -> Vec<u8> {
    encode_member_key(db, tag::HASH, key, field)
}

pub fn decode_hash_key(db: u8, ek: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    decode_member_key(db, tag::HASH, ek)
}

pub fn hash_start_key(db: u8, key: &[u8]) -> Vec<u8> {
    member_start_key(db, tag::HASH, key)
}

pub fn hash_stop_key(db: u8, key: &[u8]) -> Vec<u8> {
    member_stop_key(db, tag::HASH, key)
}

pub fn encode_hash_size_key(db: u8, key: &[u8]) -> Vec<u8> {
    encode_scalar_key(db, tag::HASH_SIZE, key)
}

// ---------------------------------------------------------------------------
// Set
// ---------------------------------------------------------------------------

pub fn encode_set_key(db: u8, key: &[u8], member: &[u8]) -> Vec<u8> {
    encode_member_key(db, tag::SET, key, member)
}

pub fn decode_set_key(db: u8, ek: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    decode_member_key(db, tag::SET, ek)
}

pub fn set_start_key(db: u8, key: &[u8]) -> Vec<u8> {
    member_start_key(db, tag::SET, key)
}

pub fn set_stop_key(db: u8, key: &[u8]) -> Vec<u8> {
    member_stop_key(db, tag::SET, key)
}

pub fn encode_set_size_key(db: u8, key: &[u8]) -> Vec<u8> {
    encode_scalar_key(db, tag::SET_SIZE, key)
}

// ---------------------------------------------------------------------------
// ZSet member index (member -> score) and score index (score, member -> ())
// ---------------------------------------------------------------------------

pub fn encode_zset_key(db: u8, key: &[u8], member: &[u8]) -> Vec<u8> {
    encode_member_key(db, tag::ZSET, key, member)
}

pub fn decode_zset_key(db: u8, ek: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    decode_member_key(db, tag::ZSET, ek)
}

pub fn zset_start_key(db: u8, key: &[u8]) -> Vec<u8> {
    member_start_key(db, tag::ZSET, key)
}

pub fn zset_stop_key(db: u8, key: &[u8]) -> Vec<u8> {
    member_stop_key(db, tag::ZSET, key)
}

pub fn encode_zset_size_key(db: u8, key: &[u8]) -> Vec<u8> {
    encode_scalar_key(db, tag::ZSET_SIZE, key)
}

pub fn encode_zscore_key(db: u8, key: &[u8], score: i64, member: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(13 + key.len() + member.len());
    buf.push(db);
    buf.push(tag::ZSET_SCORE);
    buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
    buf.extend_from_slice(key);
    buf.push(START_SEP);
    buf.extend_from_slice(&encode_ordered_i64(score));
    buf.extend_from_slice(member);
    buf
}

pub fn decode_zscore_key(db: u8, ek: &[u8]) -> Result<(Vec<u8>, i64, Vec<u8>)> {
    let (key, rest) = decode_member_key(db, tag::ZSET_SCORE, ek)?;
    if rest.len() < 8 {
        return Err(StoreError::InvalidEncoding);
    }
    let score = decode_ordered_i64(&rest[..8])?;
    Ok((key, score, rest[8..].to_vec()))
}

/// Start of the whole score index for a key.
pub fn zset_score_start(db: u8, key: &[u8]) -> Vec<u8> {
    member_start_key(db, tag::ZSET_SCORE, key)
}

/// Exclusive end of the whole score index for a key.
pub fn zset_score_stop(db: u8, key: &[u8]) -> Vec<u8> {
    member_stop_key(db, tag::ZSET_SCORE, key)
}

/// First possible score-index key for `score` (empty member sorts first).
pub fn zscore_start_key(db: u8, key: &[u8], score: i64) -> Vec<u8> {
    encode_zscore_key(db, key, score, &[])
}

/// Exclusive upper bound covering every member at scores `<= max_score`.
pub fn zscore_stop_key(db: u8, key: &[u8], max_score: i64) -> Vec<u8> {
    if max_score == i64::MAX {
        member_stop_key(db, tag::ZSET_SCORE, key)
    } else {
        encode_zscore_key(db, key, max_score + 1, &[])
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

pub fn encode_list_key(db: u8, key: &[u8], index: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(13 + key.len());
    buf.push(db);
    buf.push(tag::LIST);
    buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
    buf.extend_from_slice(key);
    buf.push(START_SEP);
    buf.extend_from_slice(&encode_ordered_i64(index));
    buf
}

pub fn decode_list_key(db: u8, ek: &[u8]) -> Result<(Vec<u8>, i64)> {
    let (key, rest) = decode_member_key(db, tag::LIST, ek)?;
    if rest.len() != 8 {
        return Err(StoreError::InvalidEncoding);
    }
    let index = decode_ordered_i64(&rest)?;
    Ok((key, index))
}

pub fn list_start_key(db: u8, key: &[u8]) -> Vec<u8> {
    member_start_key(db, tag::LIST, key)
}

pub fn list_stop_key(db: u8, key: &[u8]) -> Vec<u8> {
    member_stop_key(db, tag::LIST, key)
}

pub fn encode_list_meta_key(db: u8, key: &[u8]) -> Vec<u8> {
    encode_scalar_key(db, tag::LIST_META, key)
}

// ---------------------------------------------------------------------------
// Bitmap
// ---------------------------------------------------------------------------

pub fn encode_bit_key(db: u8, key: &[u8], chunk: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9 + key.len());
    buf.push(db);
    buf.push(tag::BIT);
    buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
    buf.extend_from_slice(key);
    buf.push(START_SEP);
    buf.extend_from_slice(&chunk.to_be_bytes());
    buf
}

pub fn decode_bit_key(db: u8, ek: &[u8]) -> Result<(Vec<u8>, u32)> {
    let (key, rest) = decode_member_key(db, tag::BIT, ek)?;
    let arr: [u8; 4] = rest
        .as_slice()
        .try_into()
        .map_err(|_| StoreError::InvalidEncoding)?;
    Ok((key, u32::from_be_bytes(arr)))
}

pub fn bit_start_key(db: u8, key: &[u8]) -> Vec<u8> {
    member_start_key(db, tag::BIT, key)
}

pub fn bit_stop_key(db: u8, key: &[u8]) -> Vec<u8> {
    member_stop_key(db, tag::BIT, key)
}

pub fn encode_bit_meta_key(db: u8, key: &[u8]) -> Vec<u8> {
    encode_scalar_key(db, tag::BIT_META, key)
}

// ---------------------------------------------------------------------------
// Expiration registry
// ---------------------------------------------------------------------------

/// Forward entry: `(type, key) -> when`.
pub fn encode_exp_meta_key(db: u8, dt: DataType, key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(3 + key.len());
    buf.push(db);
    buf.push(tag::EXP_META);
    buf.push(dt.tag());
    buf.extend_from_slice(key);
    buf
}

/// Inverse entry: `(when, type, key) -> ()`, scanned in time order.
pub fn encode_exp_time_key(db: u8, when: i64, dt: DataType, key: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(11 + key.len());
    buf.push(db);
    buf.push(tag::EXP_TIME);
    buf.extend_from_slice(&encode_ordered_i64(when));
    buf.push(dt.tag());
    buf.extend_from_slice(key);
    buf
}

pub fn decode_exp_time_key(db: u8, ek: &[u8]) -> Result<(i64, DataType, Vec<u8>)> {
    if ek.len() < 11 || ek[0] != db || ek[1] != tag::EXP_TIME {
        return Err(StoreError::InvalidEncoding);
    }
    let when = decode_ordered_i64(&ek[2..10])?;
    let dt = DataType::from_tag(ek[10]).ok_or(StoreError::InvalidEncoding)?;
    Ok((when, dt, ek[11..].to_vec()))
}

pub fn exp_time_start_key(db: u8) -> Vec<u8> {
    vec![db, tag::EXP_TIME]
}

/// Exclusive upper bound covering every inverse entry with `when <= now`.
pub fn exp_time_stop_key(db: u8, now: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    buf.push(db);
    buf.push(tag::EXP_TIME);
    buf.extend_from_slice(&encode_ordered_i64(now.saturating_add(1)));
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_i64_preserves_order() {
        let samples = [i64::MIN, i64::MIN + 1, -1, 0, 1, 42, i64::MAX - 1, i64::MAX];
        for w in samples.windows(2) {
            let a = encode_ordered_i64(w[0]);
            let b = encode_ordered_i64(w[1]);
            assert!(a < b, "{} should sort before {}", w[0], w[1]);
        }
        for v in samples {
            assert_eq!(decode_ordered_i64(&encode_ordered_i64(v)).unwrap(), v);
        }
    }

    #[test]
    fn member_key_roundtrip() {
        let ek = encode_set_key(3, b"mykey", b"member");
        let (key, member) = decode_set_key(3, &ek).unwrap();
        assert_eq!(key, b"mykey");
        assert_eq!(member, b"member");

        // wrong db or table tag fails to decode
        assert!(decode_set_key(4, &ek).is_err());
        assert!(decode_hash_key(3, &ek).is_err());
    }

    #[test]
    fn member_range_is_contiguous() {
        let start = set_start_key(0, b"s");
        let stop = set_stop_key(0, b"s");
        let inside = encode_set_key(0, b"s", b"m");
        let other_key = encode_set_key(0, b"t", b"m");
        let other_table = encode_hash_key(0, b"s", b"m");

        assert!(start <= inside && inside < stop);
        assert!(!(start <= other_key.clone() && other_key < stop));
        assert!(!(start <= other_table.clone() && other_table < stop));
    }

    #[test]
    fn ambiguous_key_lengths_stay_distinct() {
        // "ab" + "c" vs "a" + "bc": the u16 length prefix must separate them
        let a = encode_hash_key(0, b"ab", b"c");
        let b = encode_hash_key(0, b"a", b"bc");
        assert_ne!(a, b);
    }

    #[test]
    fn zscore_key_orders_by_score_then_member() {
        let low = encode_zscore_key(0, b"z", -5, b"b");
        let mid = encode_zscore_key(0, b"z", 1, b"a");
        let mid2 = encode_zscore_key(0, b"z", 1, b"b");
        let high = encode_zscore_key(0, b"z", 7, b"a");
        assert!(low < mid && mid < mid2 && mid2 < high);

        let (key, score, member) = decode_zscore_key(0, &mid2).unwrap();
        assert_eq!(key, b"z");
        assert_eq!(score, 1);
        assert_eq!(member, b"b");
    }

    #[test]
    fn zscore_stop_covers_inclusive_max() {
        let entry = encode_zscore_key(0, b"z", 10, b"mmm");
        let stop = zscore_stop_key(0, b"z", 10);
        assert!(entry < stop);
        let stop_max = zscore_stop_key(0, b"z", i64::MAX);
        let entry_max = encode_zscore_key(0, b"z", i64::MAX, b"m");
        assert!(entry_max < stop_max);
    }

    #[test]
    fn list_key_roundtrip_and_order() {
        let neg = encode_list_key(0, b"l", -3);
        let zero = encode_list_key(0, b"l", 0);
        let pos = encode_list_key(0, b"l", 9);
        assert!(neg < zero && zero < pos);

        let (key, idx) = decode_list_key(0, &neg).unwrap();
        assert_eq!(key, b"l");
        assert_eq!(idx, -3);
    }

    #[test]
    fn bit_key_roundtrip() {
        let ek = encode_bit_key(1, b"bm", 7);
        let (key, chunk) = decode_bit_key(1, &ek).unwrap();
        assert_eq!(key, b"bm");
        assert_eq!(chunk, 7);
    }

    #[test]
    fn exp_time_key_roundtrip_and_order() {
        let early = encode_exp_time_key(0, 100, DataType::Set, b"a");
        let late = encode_exp_time_key(0, 200, DataType::Kv, b"a");
        assert!(early < late);

        let (when, dt, key) = decode_exp_time_key(0, &early).unwrap();
        assert_eq!(when, 100);
        assert_eq!(dt, DataType::Set);
        assert_eq!(key, b"a");

        let stop = exp_time_stop_key(0, 150);
        assert!(early < stop && late >= stop);
    }

    #[test]
    fn kv_key_roundtrip() {
        let ek = encode_kv_key(2, b"hello");
        assert_eq!(decode_kv_key(2, &ek).unwrap(), b"hello");
        assert!(decode_kv_key(0, &ek).is_err());
    }
}
