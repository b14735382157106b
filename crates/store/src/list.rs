//! List operator
//!
//! A list is a meta entry holding `{head, tail}` plus one element entry per
//! index; elements occupy `[head, tail)` and `len = tail - head`. Pushes move
//! an extremity outward, pops move it inward; indices may grow without bound
//! across mixed pushes and pops. The meta entry disappears with the last
//! element.

use crate::codec::{self, DataType};
use crate::db::{check_key_size, check_member_size, WriteTx};
use crate::error::{Result, StoreError};
use crate::ttl::now_secs;
use crate::Db;
use engine::BoundsKind;

#[derive(Debug, Clone, Copy)]
struct ListMeta {
    head: i64,
    tail: i64,
}

impl ListMeta {
    fn len(&self) -> i64 {
        self.tail - self.head
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        buf.extend_from_slice(&codec::encode_i64(self.head));
        buf.extend_from_slice(&codec::encode_i64(self.tail));
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != 16 {
            return Err(StoreError::InvalidEncoding);
        }
        Ok(Self {
            head: codec::decode_i64(&buf[..8])?,
            tail: codec::decode_i64(&buf[8..])?,
        })
    }
}

impl Db {
    pub fn lpush(&self, key: &[u8], values: &[&[u8]]) -> Result<i64> {
        self.l_push(key, values, true)
    }

    pub fn rpush(&self, key: &[u8], values: &[&[u8]]) -> Result<i64> {
        self.l_push(key, values, false)
    }

    fn l_push(&self, key: &[u8], values: &[&[u8]], left: bool) -> Result<i64> {
        check_key_size(key)?;
        for v in values {
            check_member_size(key, v)?;
        }
        let _guard = self.list_lock.lock();
        let mut meta = self.l_meta(key)?.unwrap_or(ListMeta { head: 0, tail: 0 });
        let mut t = self.tx();
        for v in values {
            if left {
                meta.head -= 1;
                t.put(
                    codec::encode_list_key(self.index(), key, meta.head),
                    v.to_vec(),
                );
            } else {
                t.put(
                    codec::encode_list_key(self.index(), key, meta.tail),
                    v.to_vec(),
                );
                meta.tail += 1;
            }
        }
        t.put(codec::encode_list_meta_key(self.index(), key), meta.encode());
        t.commit()?;
        Ok(meta.len())
    }

    pub fn lpop(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.l_pop(key, true)
    }

    pub fn rpop(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.l_pop(key, false)
    }

    fn l_pop(&self, key: &[u8], left: bool) -> Result<Option<Vec<u8>>> {
        check_key_size(key)?;
        let _guard = self.list_lock.lock();
        let Some(mut meta) = self.l_meta(key)? else {
            return Ok(None);
        };
        let index = if left { meta.head } else { meta.tail - 1 };
        let ek = codec::encode_list_key(self.index(), key, index);
        let value = self.engine().get(&ek)?;

        let mut t = self.tx();
        t.delete(ek);
        if left {
            meta.head += 1;
        } else {
            meta.tail -= 1;
        }
        if meta.len() == 0 {
            t.delete(codec::encode_list_meta_key(self.index(), key));
            self.rm_expire_tx(&mut t, DataType::List, key)?;
        } else {
            t.put(codec::encode_list_meta_key(self.index(), key), meta.encode());
        }
        t.commit()?;
        Ok(value)
    }

    pub fn llen(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        Ok(self.l_meta(key)?.map(|m| m.len()).unwrap_or(0))
    }

    pub fn lindex(&self, key: &[u8], index: i64) -> Result<Option<Vec<u8>>> {
        check_key_size(key)?;
        let Some(meta) = self.l_meta(key)? else {
            return Ok(None);
        };
        let len = meta.len();
        let i = if index < 0 { len + index } else { index };
        if i < 0 || i >= len {
            return Ok(None);
        }
        Ok(self
            .engine()
            .get(&codec::encode_list_key(self.index(), key, meta.head + i))?)
    }

    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        check_key_size(key)?;
        let Some(meta) = self.l_meta(key)? else {
            return Ok(Vec::new());
        };
        let len = meta.len();
        let mut start = if start < 0 { len + start } else { start };
        let mut stop = if stop < 0 { len + stop } else { stop };
        if start < 0 {
            start = 0;
        }
        if start > stop || start >= len {
            return Ok(Vec::new());
        }
        if stop >= len {
            stop = len - 1;
        }

        let mut out = Vec::with_capacity((stop - start + 1) as usize);
        let mut it = self.range_iter(
            Some(codec::encode_list_key(self.index(), key, meta.head + start)),
            Some(codec::encode_list_key(self.index(), key, meta.head + stop)),
            BoundsKind::ClosedClosed,
            0,
            -1,
        )?;
        while it.valid() {
            out.push(it.value().to_vec());
            it.next();
        }
        Ok(out)
    }

    pub fn lclear(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.list_lock.lock();
        let mut t = self.tx();
        let num = self.l_delete(&mut t, key)?;
        self.rm_expire_tx(&mut t, DataType::List, key)?;
        t.commit()?;
        Ok(num)
    }

    pub fn lmclear(&self, keys: &[&[u8]]) -> Result<i64> {
        let _guard = self.list_lock.lock();
        let mut t = self.tx();
        for key in keys {
            check_key_size(key)?;
            self.l_delete(&mut t, key)?;
            self.rm_expire_tx(&mut t, DataType::List, key)?;
        }
        t.commit()?;
        Ok(keys.len() as i64)
    }

    pub fn lexpire(&self, key: &[u8], duration: i64) -> Result<i64> {
        if duration <= 0 {
            return Err(StoreError::ExpireValue);
        }
        self.l_expire_at(key, now_secs().saturating_add(duration))
    }

    pub fn lexpire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        if when <= now_secs() {
            return Err(StoreError::ExpireValue);
        }
        self.l_expire_at(key, when)
    }

    fn l_expire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.list_lock.lock();
        if self.llen(key)? == 0 {
            return Ok(0);
        }
        let mut t = self.tx();
        self.expire_at_tx(&mut t, DataType::List, key, when)?;
        t.commit()?;
        Ok(1)
    }

    pub fn lttl(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let exists = self.llen(key)? > 0;
        self.collection_ttl(DataType::List, key, exists)
    }

    pub fn lpersist(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.list_lock.lock();
        let mut t = self.tx();
        let n = self.rm_expire_tx(&mut t, DataType::List, key)?;
        t.commit()?;
        Ok(n)
    }

    fn l_meta(&self, key: &[u8]) -> Result<Option<ListMeta>> {
        match self
            .engine()
            .get(&codec::encode_list_meta_key(self.index(), key))?
        {
            Some(v) => Ok(Some(ListMeta::decode(&v)?)),
            None => Ok(None),
        }
    }

    /// Buffer deletion of every element entry plus the meta entry.
    pub(crate) fn l_delete(&self, t: &mut WriteTx<'_>, key: &[u8]) -> Result<i64> {
        let mut num = 0;
        let mut it = self.range_iter(
            Some(codec::list_start_key(self.index(), key)),
            Some(codec::list_stop_key(self.index(), key)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        while it.valid() {
            t.delete(it.key().to_vec());
            num += 1;
            it.next();
        }
        t.delete(codec::encode_list_meta_key(self.index(), key));
        Ok(num)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Db, Store};
    use engine::MemoryEngine;
    use std::sync::Arc;

    fn db() -> Arc<Db> {
        Store::open(Arc::new(MemoryEngine::new())).select(0).unwrap()
    }

    #[test]
    fn push_pop_order() {
        let db = db();
        assert_eq!(db.lpush(b"l", &[b"1", b"2", b"3"]).unwrap(), 3);
        assert_eq!(db.rpush(b"l", &[b"4", b"5"]).unwrap(), 5);
        assert_eq!(
            db.lrange(b"l", 0, -1).unwrap(),
            vec![
                b"3".to_vec(),
                b"2".to_vec(),
                b"1".to_vec(),
                b"4".to_vec(),
                b"5".to_vec()
            ]
        );
        assert_eq!(db.lpop(b"l").unwrap(), Some(b"3".to_vec()));
        assert_eq!(db.rpop(b"l").unwrap(), Some(b"5".to_vec()));
        assert_eq!(db.llen(b"l").unwrap(), 3);
    }

    #[test]
    fn pop_to_empty_removes_meta() {
        let db = db();
        db.rpush(b"l", &[b"a"]).unwrap();
        db.lexpire(b"l", 100).unwrap();
        assert_eq!(db.lpop(b"l").unwrap(), Some(b"a".to_vec()));
        assert_eq!(db.llen(b"l").unwrap(), 0);
        assert_eq!(db.lpop(b"l").unwrap(), None);
        // expiration purged with the meta entry
        assert_eq!(db.lttl(b"l").unwrap(), -2);
    }

    #[test]
    fn lindex_positive_and_negative() {
        let db = db();
        db.rpush(b"l", &[b"a", b"b", b"c"]).unwrap();
        assert_eq!(db.lindex(b"l", 0).unwrap(), Some(b"a".to_vec()));
        assert_eq!(db.lindex(b"l", 2).unwrap(), Some(b"c".to_vec()));
        assert_eq!(db.lindex(b"l", -1).unwrap(), Some(b"c".to_vec()));
        assert_eq!(db.lindex(b"l", 3).unwrap(), None);
        assert_eq!(db.lindex(b"l", -4).unwrap(), None);
    }

    #[test]
    fn lrange_normalization() {
        let db = db();
        db.rpush(b"l", &[b"a", b"b", b"c", b"d"]).unwrap();
        assert_eq!(db.lrange(b"l", 1, 2).unwrap(), vec![b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(db.lrange(b"l", -2, -1).unwrap(), vec![b"c".to_vec(), b"d".to_vec()]);
        assert_eq!(db.lrange(b"l", 0, 100).unwrap().len(), 4);
        assert_eq!(db.lrange(b"l", 2, 1).unwrap().len(), 0);
        assert_eq!(db.lrange(b"l", 4, 5).unwrap().len(), 0);
        assert_eq!(db.lrange(b"l", -100, -5).unwrap().len(), 0);
    }

    #[test]
    fn indices_survive_mixed_push_pop() {
        let db = db();
        // drive head well below zero, then walk back
        db.lpush(b"l", &[b"a", b"b", b"c"]).unwrap();
        db.lpop(b"l").unwrap();
        db.lpush(b"l", &[b"d"]).unwrap();
        assert_eq!(
            db.lrange(b"l", 0, -1).unwrap(),
            vec![b"d".to_vec(), b"b".to_vec(), b"a".to_vec()]
        );
    }

    #[test]
    fn lclear_removes_elements() {
        let db = db();
        db.rpush(b"l", &[b"a", b"b"]).unwrap();
        assert_eq!(db.lclear(b"l").unwrap(), 2);
        assert_eq!(db.llen(b"l").unwrap(), 0);
        assert_eq!(db.lmclear(&[b"l", b"other"]).unwrap(), 2);
    }
}
