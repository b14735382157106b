//! Hash operator
//!
//! One entry per field under the hash's range plus a size entry kept in the
//! same commit as every membership change.

use crate::codec::{self, DataType};
use crate::db::{check_key_size, check_member_size, parse_int, WriteTx};
use crate::error::{Result, StoreError};
use crate::ttl::now_secs;
use crate::Db;
use engine::BoundsKind;

impl Db {
    pub fn hset(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<i64> {
        check_member_size(key, field)?;
        let ek = codec::encode_hash_key(self.index(), key, field);
        let _guard = self.hash_lock.lock();
        let is_new = self.engine().get(&ek)?.is_none();
        let mut t = self.tx();
        t.put(ek, value.to_vec());
        if is_new {
            self.h_incr_size(&mut t, key, 1)?;
        }
        t.commit()?;
        Ok(is_new as i64)
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Result<Option<Vec<u8>>> {
        check_member_size(key, field)?;
        Ok(self
            .engine()
            .get(&codec::encode_hash_key(self.index(), key, field))?)
    }

    pub fn hmset(&self, key: &[u8], fvs: &[(&[u8], &[u8])]) -> Result<()> {
        let _guard = self.hash_lock.lock();
        let mut t = self.tx();
        let mut num = 0;
        let mut seen: Vec<&[u8]> = Vec::with_capacity(fvs.len());
        for (field, value) in fvs {
            check_member_size(key, field)?;
            let ek = codec::encode_hash_key(self.index(), key, field);
            if !seen.contains(field) && self.engine().get(&ek)?.is_none() {
                num += 1;
                seen.push(field);
            }
            t.put(ek, value.to_vec());
        }
        if num > 0 {
            self.h_incr_size(&mut t, key, num)?;
        }
        t.commit()
    }

    pub fn hmget(&self, key: &[u8], fields: &[&[u8]]) -> Result<Vec<Option<Vec<u8>>>> {
        fields.iter().map(|f| self.hget(key, f)).collect()
    }

    pub fn hdel(&self, key: &[u8], fields: &[&[u8]]) -> Result<i64> {
        let _guard = self.hash_lock.lock();
        let mut t = self.tx();
        let mut num = 0;
        let mut seen: Vec<&[u8]> = Vec::with_capacity(fields.len());
        for field in fields {
            check_member_size(key, field)?;
            if seen.contains(field) {
                continue;
            }
            let ek = codec::encode_hash_key(self.index(), key, field);
            if self.engine().get(&ek)?.is_some() {
                num += 1;
                t.delete(ek);
                seen.push(field);
            }
        }
        if num > 0 {
            self.h_incr_size(&mut t, key, -num)?;
        }
        t.commit()?;
        Ok(num)
    }

    /// Field value must parse as decimal i64; overflow is a value error.
    pub fn hincr_by(&self, key: &[u8], field: &[u8], delta: i64) -> Result<i64> {
        check_member_size(key, field)?;
        let ek = codec::encode_hash_key(self.index(), key, field);
        let _guard = self.hash_lock.lock();
        let old = self.engine().get(&ek)?;
        let is_new = old.is_none();
        let n = parse_int(old)?;
        let n = n.checked_add(delta).ok_or(StoreError::Value)?;
        let mut t = self.tx();
        t.put(ek, n.to_string().into_bytes());
        if is_new {
            self.h_incr_size(&mut t, key, 1)?;
        }
        t.commit()?;
        Ok(n)
    }

    pub fn hexists(&self, key: &[u8], field: &[u8]) -> Result<i64> {
        Ok(if self.hget(key, field)?.is_some() { 1 } else { 0 })
    }

    pub fn hlen(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        self.read_i64(&codec::encode_hash_size_key(self.index(), key))
    }

    /// Field/value pairs in engine key order over the hash's range.
    pub fn hgetall(&self, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        check_key_size(key)?;
        let mut out = Vec::new();
        let mut it = self.range_iter(
            Some(codec::hash_start_key(self.index(), key)),
            Some(codec::hash_stop_key(self.index(), key)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        while it.valid() {
            let (_, field) = codec::decode_hash_key(self.index(), it.key())?;
            out.push((field, it.value().to_vec()));
            it.next();
        }
        Ok(out)
    }

    pub fn hkeys(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(self.hgetall(key)?.into_iter().map(|(f, _)| f).collect())
    }

    pub fn hvals(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(self.hgetall(key)?.into_iter().map(|(_, v)| v).collect())
    }

    pub fn hclear(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.hash_lock.lock();
        let mut t = self.tx();
        let num = self.h_delete(&mut t, key)?;
        self.rm_expire_tx(&mut t, DataType::Hash, key)?;
        t.commit()?;
        Ok(num)
    }

    pub fn hmclear(&self, keys: &[&[u8]]) -> Result<i64> {
        let _guard = self.hash_lock.lock();
        let mut t = self.tx();
        for key in keys {
            check_key_size(key)?;
            self.h_delete(&mut t, key)?;
            self.rm_expire_tx(&mut t, DataType::Hash, key)?;
        }
        t.commit()?;
        Ok(keys.len() as i64)
    }

    pub fn hexpire(&self, key: &[u8], duration: i64) -> Result<i64> {
        if duration <= 0 {
            return Err(StoreError::ExpireValue);
        }
        self.h_expire_at(key, now_secs().saturating_add(duration))
    }

    pub fn hexpire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        if when <= now_secs() {
            return Err(StoreError::ExpireValue);
        }
        self.h_expire_at(key, when)
    }

    fn h_expire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.hash_lock.lock();
        if self.hlen(key)? == 0 {
            return Ok(0);
        }
        let mut t = self.tx();
        self.expire_at_tx(&mut t, DataType::Hash, key, when)?;
        t.commit()?;
        Ok(1)
    }

    pub fn httl(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let exists = self.hlen(key)? > 0;
        self.collection_ttl(DataType::Hash, key, exists)
    }

    pub fn hpersist(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.hash_lock.lock();
        let mut t = self.tx();
        let n = self.rm_expire_tx(&mut t, DataType::Hash, key)?;
        t.commit()?;
        Ok(n)
    }

    /// Adjust the size entry by `delta`; at zero the entry is deleted and the
    /// hash's expiration is purged.
    fn h_incr_size(&self, t: &mut WriteTx<'_>, key: &[u8], delta: i64) -> Result<i64> {
        let sk = codec::encode_hash_size_key(self.index(), key);
        let mut size = self.read_i64(&sk)?;
        size += delta;
        if size <= 0 {
            size = 0;
            t.delete(sk);
            self.rm_expire_tx(t, DataType::Hash, key)?;
        } else {
            t.put(sk, codec::encode_i64(size).to_vec());
        }
        Ok(size)
    }

    /// Buffer deletion of every field entry plus the size entry.
    pub(crate) fn h_delete(&self, t: &mut WriteTx<'_>, key: &[u8]) -> Result<i64> {
        let mut num = 0;
        let mut it = self.range_iter(
            Some(codec::hash_start_key(self.index(), key)),
            Some(codec::hash_stop_key(self.index(), key)),
            BoundsKind::ClosedOpen,
            0,
            -1,
        )?;
        while it.valid() {
            t.delete(it.key().to_vec());
            num += 1;
            it.next();
        }
        t.delete(codec::encode_hash_size_key(self.index(), key));
        Ok(num)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Db, Store, StoreError};
    use engine::MemoryEngine;
    use std::sync::Arc;

    fn db() -> Arc<Db> {
        Store::open(Arc::new(MemoryEngine::new())).select(0).unwrap()
    }

    #[test]
    fn hset_hget_hdel() {
        let db = db();
        assert_eq!(db.hset(b"h", b"f1", b"v1").unwrap(), 1);
        assert_eq!(db.hset(b"h", b"f1", b"v2").unwrap(), 0);
        assert_eq!(db.hget(b"h", b"f1").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(db.hlen(b"h").unwrap(), 1);

        assert_eq!(db.hdel(b"h", &[b"f1", b"f1", b"nope"]).unwrap(), 1);
        assert_eq!(db.hlen(b"h").unwrap(), 0);
        // size entry removed with the last field
        assert_eq!(db.httl(b"h").unwrap(), -2);
    }

    #[test]
    fn hgetall_in_key_order() {
        let db = db();
        db.hmset(
            b"h",
            &[
                (b"b".as_ref(), b"2".as_ref()),
                (b"a".as_ref(), b"1".as_ref()),
                (b"c".as_ref(), b"3".as_ref()),
            ],
        )
        .unwrap();
        let all = db.hgetall(b"h").unwrap();
        assert_eq!(
            all,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec()),
                (b"c".to_vec(), b"3".to_vec()),
            ]
        );
        assert_eq!(db.hkeys(b"h").unwrap().len(), 3);
        assert_eq!(db.hvals(b"h").unwrap().len(), 3);
        assert_eq!(db.hlen(b"h").unwrap(), 3);
    }

    #[test]
    fn hincr_by_semantics() {
        let db = db();
        assert_eq!(db.hincr_by(b"h", b"n", 5).unwrap(), 5);
        assert_eq!(db.hincr_by(b"h", b"n", -2).unwrap(), 3);
        assert_eq!(db.hlen(b"h").unwrap(), 1);

        db.hset(b"h", b"s", b"xyz").unwrap();
        assert!(matches!(
            db.hincr_by(b"h", b"s", 1),
            Err(StoreError::Value)
        ));

        db.hset(b"h", b"m", i64::MAX.to_string().as_bytes()).unwrap();
        assert!(matches!(
            db.hincr_by(b"h", b"m", 1),
            Err(StoreError::Value)
        ));
    }

    #[test]
    fn hclear_removes_everything() {
        let db = db();
        db.hmset(b"h", &[(b"a".as_ref(), b"1".as_ref()), (b"b".as_ref(), b"2".as_ref())])
            .unwrap();
        db.hexpire(b"h", 100).unwrap();
        assert_eq!(db.hclear(b"h").unwrap(), 2);
        assert_eq!(db.hlen(b"h").unwrap(), 0);
        assert!(db.hgetall(b"h").unwrap().is_empty());
        assert_eq!(db.httl(b"h").unwrap(), -2);
    }

    #[test]
    fn hmclear_multiple() {
        let db = db();
        db.hset(b"h1", b"f", b"v").unwrap();
        db.hset(b"h2", b"f", b"v").unwrap();
        assert_eq!(db.hmclear(&[b"h1", b"h2", b"h3"]).unwrap(), 3);
        assert_eq!(db.hlen(b"h1").unwrap(), 0);
        assert_eq!(db.hlen(b"h2").unwrap(), 0);
    }

    #[test]
    fn size_matches_scan_count() {
        let db = db();
        for i in 0..10u8 {
            db.hset(b"h", &[b'f', b'0' + i], b"v").unwrap();
        }
        db.hdel(b"h", &[b"f0", b"f5"]).unwrap();
        assert_eq!(db.hlen(b"h").unwrap() as usize, db.hgetall(b"h").unwrap().len());
    }

    #[test]
    fn empty_field_rejected() {
        let db = db();
        assert!(matches!(
            db.hset(b"h", b"", b"v"),
            Err(StoreError::MemberSize)
        ));
    }
}
