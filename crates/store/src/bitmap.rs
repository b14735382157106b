//! Bitmap operator
//!
//! A sparse bitstring stored as fixed-width chunks plus a meta entry holding
//! the highest written bit offset (a high-water mark; clearing bits does not
//! shrink it). Bit 0 is the most significant bit of byte 0, as in Redis.

use crate::codec::{self, DataType};
use crate::db::{check_key_size, WriteTx};
use crate::error::{Result, StoreError};
use crate::ttl::now_secs;
use crate::{Db, BIT_CHUNK_BYTES};
use engine::BoundsKind;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

const CHUNK_BITS: i64 = (BIT_CHUNK_BYTES as i64) * 8;

/// Chunk-wise bit operation for `bopt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
    Xor,
    Not,
}

fn check_offset(offset: i64) -> Result<(u32, usize)> {
    if offset < 0 {
        return Err(StoreError::Value);
    }
    let chunk = offset / CHUNK_BITS;
    if chunk > u32::MAX as i64 {
        return Err(StoreError::Value);
    }
    Ok((chunk as u32, (offset % CHUNK_BITS) as usize))
}

impl Db {
    /// Set bit `offset` to `value` (0/1); returns the previous bit.
    pub fn bset_bit(&self, key: &[u8], offset: i64, value: u8) -> Result<i64> {
        check_key_size(key)?;
        if value > 1 {
            return Err(StoreError::Value);
        }
        let (chunk, bit_in_chunk) = check_offset(offset)?;
        let _guard = self.bit_lock.lock();

        let ck = codec::encode_bit_key(self.index(), key, chunk);
        let mut buf = self.engine().get(&ck)?.unwrap_or_default();
        let byte_idx = bit_in_chunk / 8;
        let mask = 0x80u8 >> (bit_in_chunk % 8);
        let old = buf
            .get(byte_idx)
            .map(|b| u8::from(b & mask != 0))
            .unwrap_or(0);
        if old == value {
            return Ok(old as i64);
        }

        let mut t = self.tx();
        if byte_idx >= buf.len() {
            buf.resize(byte_idx + 1, 0);
        }
        if value == 1 {
            buf[byte_idx] |= mask;
        } else {
            buf[byte_idx] &= !mask;
        }
        t.put(ck, buf);
        if value == 1 && offset > self.b_tail(key)?.unwrap_or(-1) {
            t.put(
                codec::encode_bit_meta_key(self.index(), key),
                codec::encode_i64(offset).to_vec(),
            );
        }
        t.commit()?;
        Ok(old as i64)
    }

    /// Apply several (offset, value) pairs in one commit; returns the number
    /// of bits written.
    pub fn bmset_bit(&self, key: &[u8], pairs: &[(i64, u8)]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.bit_lock.lock();

        let mut chunks: HashMap<u32, Vec<u8>> = HashMap::new();
        let mut tail = self.b_tail(key)?.unwrap_or(-1);
        let mut tail_dirty = false;
        for (offset, value) in pairs {
            if *value > 1 {
                return Err(StoreError::Value);
            }
            let (chunk, bit_in_chunk) = check_offset(*offset)?;
            let buf = match chunks.entry(chunk) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let ck = codec::encode_bit_key(self.index(), key, chunk);
                    e.insert(self.engine().get(&ck)?.unwrap_or_default())
                }
            };
            let byte_idx = bit_in_chunk / 8;
            if byte_idx >= buf.len() {
                buf.resize(byte_idx + 1, 0);
            }
            let mask = 0x80u8 >> (bit_in_chunk % 8);
            if *value == 1 {
                buf[byte_idx] |= mask;
                if *offset > tail {
                    tail = *offset;
                    tail_dirty = true;
                }
            } else {
                buf[byte_idx] &= !mask;
            }
        }

        let mut t = self.tx();
        for (chunk, buf) in chunks {
            t.put(codec::encode_bit_key(self.index(), key, chunk), buf);
        }
        if tail_dirty {
            t.put(
                codec::encode_bit_meta_key(self.index(), key),
                codec::encode_i64(tail).to_vec(),
            );
        }
        t.commit()?;
        Ok(pairs.len() as i64)
    }

    pub fn bget_bit(&self, key: &[u8], offset: i64) -> Result<i64> {
        check_key_size(key)?;
        let (chunk, bit_in_chunk) = check_offset(offset)?;
        let ck = codec::encode_bit_key(self.index(), key, chunk);
        let Some(buf) = self.engine().get(&ck)? else {
            return Ok(0);
        };
        let byte_idx = bit_in_chunk / 8;
        let mask = 0x80u8 >> (bit_in_chunk % 8);
        Ok(buf
            .get(byte_idx)
            .map(|b| i64::from(b & mask != 0))
            .unwrap_or(0))
    }

    /// The whole bitstring, zero-filling chunk gaps; `None` if absent.
    pub fn bget(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key_size(key)?;
        let Some(tail) = self.b_tail(key)? else {
            return Ok(None);
        };
        let len = (tail / 8 + 1) as usize;
        let mut out = vec![0u8; len];
        let mut it = self.range_iter(
            Some(codec::bit_start_key(self.index(), key)),
            Some(codec::bit_stop_key(self.index(), key)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        while it.valid() {
            let (_, chunk) = codec::decode_bit_key(self.index(), it.key())?;
            let base = chunk as usize * BIT_CHUNK_BYTES;
            for (i, b) in it.value().iter().enumerate() {
                if base + i < len {
                    out[base + i] = *b;
                }
            }
            it.next();
        }
        Ok(Some(out))
    }

    /// Popcount over the byte range `[start, end]`; negative indices count
    /// from the end of the materialized length, bounds default to the whole
    /// string.
    pub fn bcount(&self, key: &[u8], start: Option<i64>, end: Option<i64>) -> Result<i64> {
        check_key_size(key)?;
        let Some(tail) = self.b_tail(key)? else {
            return Ok(0);
        };
        let byte_len = tail / 8 + 1;
        let mut start = start.unwrap_or(0);
        let mut end = end.unwrap_or(-1);
        if start < 0 {
            start += byte_len;
        }
        if end < 0 {
            end += byte_len;
        }
        if start < 0 {
            start = 0;
        }
        if end >= byte_len {
            end = byte_len - 1;
        }
        if start > end {
            return Ok(0);
        }

        let first_chunk = (start / BIT_CHUNK_BYTES as i64) as u32;
        let last_chunk = (end / BIT_CHUNK_BYTES as i64) as u32;
        let mut total = 0i64;
        let mut it = self.range_iter(
            Some(codec::encode_bit_key(self.index(), key, first_chunk)),
            Some(codec::encode_bit_key(self.index(), key, last_chunk)),
            BoundsKind::ClosedClosed,
            0,
            -1,
        )?;
        while it.valid() {
            let (_, chunk) = codec::decode_bit_key(self.index(), it.key())?;
            let base = chunk as i64 * BIT_CHUNK_BYTES as i64;
            for (i, b) in it.value().iter().enumerate() {
                let pos = base + i as i64;
                if pos >= start && pos <= end {
                    total += b.count_ones() as i64;
                }
            }
            it.next();
        }
        Ok(total)
    }

    /// Chunk-wise AND/OR/XOR/NOT into `dst`; the longest source defines the
    /// output length (shorter sources read as zero-padded). Returns the
    /// destination byte length.
    pub fn bopt(&self, op: BitOp, dst: &[u8], srcs: &[&[u8]]) -> Result<i64> {
        check_key_size(dst)?;
        if srcs.is_empty() || (op == BitOp::Not && srcs.len() != 1) {
            return Err(StoreError::Value);
        }
        let _guard = self.bit_lock.lock();

        let mut bufs = Vec::with_capacity(srcs.len());
        for src in srcs {
            check_key_size(src)?;
            bufs.push(self.bget(src)?.unwrap_or_default());
        }
        let max_len = bufs.iter().map(|b| b.len()).max().unwrap_or(0);

        let out: Vec<u8> = match op {
            BitOp::Not => bufs[0].iter().map(|b| !b).collect(),
            BitOp::And => (0..max_len)
                .map(|i| {
                    bufs.iter()
                        .fold(0xff, |acc, b| acc & b.get(i).copied().unwrap_or(0))
                })
                .collect(),
            BitOp::Or => (0..max_len)
                .map(|i| {
                    bufs.iter()
                        .fold(0x00, |acc, b| acc | b.get(i).copied().unwrap_or(0))
                })
                .collect(),
            BitOp::Xor => (0..max_len)
                .map(|i| {
                    bufs.iter()
                        .fold(0x00, |acc, b| acc ^ b.get(i).copied().unwrap_or(0))
                })
                .collect(),
        };

        let mut t = self.tx();
        self.b_delete(&mut t, dst)?;
        if !out.is_empty() {
            for (i, chunk) in out.chunks(BIT_CHUNK_BYTES).enumerate() {
                t.put(
                    codec::encode_bit_key(self.index(), dst, i as u32),
                    chunk.to_vec(),
                );
            }
            let tail = out.len() as i64 * 8 - 1;
            t.put(
                codec::encode_bit_meta_key(self.index(), dst),
                codec::encode_i64(tail).to_vec(),
            );
        }
        t.commit()?;
        Ok(out.len() as i64)
    }

    /// Returns 1 if the bitmap existed; expiration entries are purged too.
    pub fn bdelete(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.bit_lock.lock();
        let mut t = self.tx();
        let n = self.b_delete(&mut t, key)?;
        self.rm_expire_tx(&mut t, DataType::Bit, key)?;
        t.commit()?;
        Ok(n)
    }

    pub fn bexpire(&self, key: &[u8], duration: i64) -> Result<i64> {
        if duration <= 0 {
            return Err(StoreError::ExpireValue);
        }
        self.b_expire_at(key, now_secs().saturating_add(duration))
    }

    pub fn bexpire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        if when <= now_secs() {
            return Err(StoreError::ExpireValue);
        }
        self.b_expire_at(key, when)
    }

    fn b_expire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.bit_lock.lock();
        if self.b_tail(key)?.is_none() {
            return Ok(0);
        }
        let mut t = self.tx();
        self.expire_at_tx(&mut t, DataType::Bit, key, when)?;
        t.commit()?;
        Ok(1)
    }

    pub fn bttl(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let exists = self.b_tail(key)?.is_some();
        self.collection_ttl(DataType::Bit, key, exists)
    }

    pub fn bpersist(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.bit_lock.lock();
        let mut t = self.tx();
        let n = self.rm_expire_tx(&mut t, DataType::Bit, key)?;
        t.commit()?;
        Ok(n)
    }

    fn b_tail(&self, key: &[u8]) -> Result<Option<i64>> {
        match self
            .engine()
            .get(&codec::encode_bit_meta_key(self.index(), key))?
        {
            Some(v) => Ok(Some(codec::decode_i64(&v)?)),
            None => Ok(None),
        }
    }

    /// Buffer deletion of every chunk plus the meta entry; returns 1 if the
    /// bitmap existed.
    pub(crate) fn b_delete(&self, t: &mut WriteTx<'_>, key: &[u8]) -> Result<i64> {
        let existed = self.b_tail(key)?.is_some();
        let mut it = self.range_iter(
            Some(codec::bit_start_key(self.index(), key)),
            Some(codec::bit_stop_key(self.index(), key)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        while it.valid() {
            t.delete(it.key().to_vec());
            it.next();
        }
        t.delete(codec::encode_bit_meta_key(self.index(), key));
        Ok(existed as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use engine::MemoryEngine;
    use std::sync::Arc;

    fn db() -> Arc<Db> {
        Store::open(Arc::new(MemoryEngine::new())).select(0).unwrap()
    }

    #[test]
    fn set_get_bit() {
        let db = db();
        assert_eq!(db.bset_bit(b"b", 7, 1).unwrap(), 0);
        assert_eq!(db.bget_bit(b"b", 7).unwrap(), 1);
        assert_eq!(db.bget_bit(b"b", 6).unwrap(), 0);
        assert_eq!(db.bset_bit(b"b", 7, 0).unwrap(), 1);
        assert_eq!(db.bget_bit(b"b", 7).unwrap(), 0);
        // bit 7 of byte 0 is the least significant bit in Redis order
        db.bset_bit(b"x", 0, 1).unwrap();
        assert_eq!(db.bget(b"x").unwrap(), Some(vec![0x80]));
    }

    #[test]
    fn bits_across_chunks() {
        let db = db();
        let far = CHUNK_BITS * 3 + 5;
        db.bset_bit(b"b", 1, 1).unwrap();
        db.bset_bit(b"b", far, 1).unwrap();
        assert_eq!(db.bget_bit(b"b", far).unwrap(), 1);
        assert_eq!(db.bcount(b"b", None, None).unwrap(), 2);

        let buf = db.bget(b"b").unwrap().unwrap();
        assert_eq!(buf.len() as i64, far / 8 + 1);
    }

    #[test]
    fn bmset_bit_batches() {
        let db = db();
        assert_eq!(
            db.bmset_bit(b"b", &[(0, 1), (9, 1), (CHUNK_BITS + 2, 1)]).unwrap(),
            3
        );
        assert_eq!(db.bcount(b"b", None, None).unwrap(), 3);
        assert_eq!(db.bget_bit(b"b", 9).unwrap(), 1);
    }

    #[test]
    fn bcount_byte_ranges() {
        let db = db();
        // one bit in each of bytes 0, 1, 2
        db.bmset_bit(b"b", &[(0, 1), (8, 1), (16, 1)]).unwrap();
        assert_eq!(db.bcount(b"b", Some(0), Some(0)).unwrap(), 1);
        assert_eq!(db.bcount(b"b", Some(1), Some(2)).unwrap(), 2);
        assert_eq!(db.bcount(b"b", Some(-1), None).unwrap(), 1);
        assert_eq!(db.bcount(b"b", Some(2), Some(1)).unwrap(), 0);
        assert_eq!(db.bcount(b"missing", None, None).unwrap(), 0);
    }

    #[test]
    fn bopt_variants() {
        let db = db();
        db.bmset_bit(b"a", &[(0, 1), (1, 1)]).unwrap(); // 0b1100_0000
        db.bmset_bit(b"b", &[(1, 1), (2, 1)]).unwrap(); // 0b0110_0000

        assert_eq!(db.bopt(BitOp::And, b"d", &[b"a", b"b"]).unwrap(), 1);
        assert_eq!(db.bget(b"d").unwrap(), Some(vec![0b0100_0000]));

        db.bopt(BitOp::Or, b"d", &[b"a", b"b"]).unwrap();
        assert_eq!(db.bget(b"d").unwrap(), Some(vec![0b1110_0000]));

        db.bopt(BitOp::Xor, b"d", &[b"a", b"b"]).unwrap();
        assert_eq!(db.bget(b"d").unwrap(), Some(vec![0b1010_0000]));

        db.bopt(BitOp::Not, b"d", &[b"a"]).unwrap();
        assert_eq!(db.bget(b"d").unwrap(), Some(vec![0b0011_1111]));

        // NOT over several sources is malformed
        assert!(db.bopt(BitOp::Not, b"d", &[b"a", b"b"]).is_err());
    }

    #[test]
    fn bopt_pads_shorter_sources() {
        let db = db();
        db.bset_bit(b"short", 0, 1).unwrap();
        db.bset_bit(b"long", 15, 1).unwrap();
        assert_eq!(db.bopt(BitOp::Or, b"d", &[b"short", b"long"]).unwrap(), 2);
        assert_eq!(db.bget(b"d").unwrap(), Some(vec![0x80, 0x01]));
        // AND with the shorter source zero-padded clears everything
        assert_eq!(db.bopt(BitOp::And, b"d", &[b"short", b"long"]).unwrap(), 2);
        assert_eq!(db.bcount(b"d", None, None).unwrap(), 0);
    }

    #[test]
    fn bdelete_and_expire() {
        let db = db();
        db.bset_bit(b"b", 100, 1).unwrap();
        db.bexpire(b"b", 100).unwrap();
        assert!(db.bttl(b"b").unwrap() > 0);
        assert_eq!(db.bdelete(b"b").unwrap(), 1);
        assert_eq!(db.bget(b"b").unwrap(), None);
        assert_eq!(db.bttl(b"b").unwrap(), -2);
        assert_eq!(db.bdelete(b"b").unwrap(), 0);
    }

    #[test]
    fn negative_offset_rejected() {
        let db = db();
        assert!(matches!(
            db.bset_bit(b"b", -1, 1),
            Err(StoreError::Value)
        ));
        assert!(matches!(db.bset_bit(b"b", 0, 2), Err(StoreError::Value)));
    }
}
