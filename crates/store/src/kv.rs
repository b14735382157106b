//! KV operator
//!
//! Plain key/value cells. Integer commands parse the stored value as decimal
//! i64; a missing value counts as 0.

use crate::codec::{self, DataType};
use crate::db::{check_key_size, parse_int};
use crate::error::{Result, StoreError};
use crate::ttl::now_secs;
use crate::Db;

impl Db {
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key_size(key)?;
        Ok(self.engine().get(&codec::encode_kv_key(self.index(), key))?)
    }

    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        check_key_size(key)?;
        let _guard = self.kv_lock.lock();
        let mut t = self.tx();
        t.put(codec::encode_kv_key(self.index(), key), value.to_vec());
        t.commit()
    }

    /// Set only if absent; the existence check runs under the KV lock.
    pub fn setnx(&self, key: &[u8], value: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let ek = codec::encode_kv_key(self.index(), key);
        let _guard = self.kv_lock.lock();
        if self.engine().get(&ek)?.is_some() {
            return Ok(0);
        }
        let mut t = self.tx();
        t.put(ek, value.to_vec());
        t.commit()?;
        Ok(1)
    }

    pub fn getset(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key_size(key)?;
        let ek = codec::encode_kv_key(self.index(), key);
        let _guard = self.kv_lock.lock();
        let old = self.engine().get(&ek)?;
        let mut t = self.tx();
        t.put(ek, value.to_vec());
        t.commit()?;
        Ok(old)
    }

    pub fn mget(&self, keys: &[&[u8]]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    pub fn mset(&self, kvs: &[(&[u8], &[u8])]) -> Result<()> {
        for (key, _) in kvs {
            check_key_size(key)?;
        }
        let _guard = self.kv_lock.lock();
        let mut t = self.tx();
        for (key, value) in kvs {
            t.put(codec::encode_kv_key(self.index(), key), value.to_vec());
        }
        t.commit()
    }

    /// Returns the number of keys that existed; expiration entries of every
    /// deleted key are purged in the same commit.
    pub fn del(&self, keys: &[&[u8]]) -> Result<i64> {
        for key in keys {
            check_key_size(key)?;
        }
        let _guard = self.kv_lock.lock();
        let mut t = self.tx();
        let mut num = 0;
        for key in keys {
            let ek = codec::encode_kv_key(self.index(), key);
            if self.engine().get(&ek)?.is_some() {
                num += 1;
                t.delete(ek);
            }
            self.rm_expire_tx(&mut t, DataType::Kv, key)?;
        }
        t.commit()?;
        Ok(num)
    }

    pub fn incr(&self, key: &[u8]) -> Result<i64> {
        self.incr_by(key, 1)
    }

    pub fn incr_by(&self, key: &[u8], delta: i64) -> Result<i64> {
        check_key_size(key)?;
        let ek = codec::encode_kv_key(self.index(), key);
        let _guard = self.kv_lock.lock();
        let n = parse_int(self.engine().get(&ek)?)?;
        let n = n.checked_add(delta).ok_or(StoreError::Value)?;
        let mut t = self.tx();
        t.put(ek, n.to_string().into_bytes());
        t.commit()?;
        Ok(n)
    }

    pub fn decr(&self, key: &[u8]) -> Result<i64> {
        self.incr_by(key, -1)
    }

    pub fn decr_by(&self, key: &[u8], delta: i64) -> Result<i64> {
        self.incr_by(key, delta.checked_neg().ok_or(StoreError::Value)?)
    }

    pub fn exists(&self, key: &[u8]) -> Result<i64> {
        Ok(if self.get(key)?.is_some() { 1 } else { 0 })
    }

    pub fn expire(&self, key: &[u8], duration: i64) -> Result<i64> {
        if duration <= 0 {
            return Err(StoreError::ExpireValue);
        }
        self.kv_expire_at(key, now_secs().saturating_add(duration))
    }

    pub fn expire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        if when <= now_secs() {
            return Err(StoreError::ExpireValue);
        }
        self.kv_expire_at(key, when)
    }

    fn kv_expire_at(&self, key: &[u8], when: i64) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.kv_lock.lock();
        if self
            .engine()
            .get(&codec::encode_kv_key(self.index(), key))?
            .is_none()
        {
            return Ok(0);
        }
        let mut t = self.tx();
        self.expire_at_tx(&mut t, DataType::Kv, key, when)?;
        t.commit()?;
        Ok(1)
    }

    pub fn ttl(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let exists = self
            .engine()
            .get(&codec::encode_kv_key(self.index(), key))?
            .is_some();
        self.collection_ttl(DataType::Kv, key, exists)
    }

    pub fn persist(&self, key: &[u8]) -> Result<i64> {
        check_key_size(key)?;
        let _guard = self.kv_lock.lock();
        let mut t = self.tx();
        let n = self.rm_expire_tx(&mut t, DataType::Kv, key)?;
        t.commit()?;
        Ok(n)
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
    fn set_get_del() {
        let db = db();
        db.set(b"k", b"hello").unwrap();
        assert_eq!(db.get(b"k").unwrap(), Some(b"hello".to_vec()));
        assert_eq!(db.exists(b"k").unwrap(), 1);
        assert_eq!(db.del(&[b"k", b"missing"]).unwrap(), 1);
        assert_eq!(db.get(b"k").unwrap(), None);
        assert_eq!(db.exists(b"k").unwrap(), 0);
    }

    #[test]
    fn setnx_only_when_absent() {
        let db = db();
        assert_eq!(db.setnx(b"k", b"1").unwrap(), 1);
        assert_eq!(db.setnx(b"k", b"2").unwrap(), 0);
        assert_eq!(db.get(b"k").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn getset_returns_old() {
        let db = db();
        assert_eq!(db.getset(b"k", b"a").unwrap(), None);
        assert_eq!(db.getset(b"k", b"b").unwrap(), Some(b"a".to_vec()));
    }

    #[test]
    fn mset_mget() {
        let db = db();
        db.mset(&[(b"a".as_ref(), b"1".as_ref()), (b"b".as_ref(), b"2".as_ref())])
            .unwrap();
        assert_eq!(
            db.mget(&[b"a", b"x", b"b"]).unwrap(),
            vec![Some(b"1".to_vec()), None, Some(b"2".to_vec())]
        );
    }

    #[test]
    fn counter_arithmetic() {
        let db = db();
        assert_eq!(db.incr(b"n").unwrap(), 1);
        assert_eq!(db.incr_by(b"n", 9).unwrap(), 10);
        assert_eq!(db.decr(b"n").unwrap(), 9);
        assert_eq!(db.decr_by(b"n", 4).unwrap(), 5);
        assert_eq!(db.get(b"n").unwrap(), Some(b"5".to_vec()));
    }

    #[test]
    fn incr_rejects_garbage_and_overflow() {
        let db = db();
        db.set(b"s", b"notanumber").unwrap();
        assert!(matches!(db.incr(b"s"), Err(StoreError::Value)));

        db.set(b"m", i64::MAX.to_string().as_bytes()).unwrap();
        assert!(matches!(db.incr(b"m"), Err(StoreError::Value)));
        // value unchanged after the failed increment
        assert_eq!(
            db.get(b"m").unwrap(),
            Some(i64::MAX.to_string().into_bytes())
        );
    }

    #[test]
    fn expire_validation() {
        let db = db();
        db.set(b"k", b"v").unwrap();
        assert!(matches!(db.expire(b"k", 0), Err(StoreError::ExpireValue)));
        assert!(matches!(db.expire(b"k", -5), Err(StoreError::ExpireValue)));
        assert!(matches!(db.expire_at(b"k", 1), Err(StoreError::ExpireValue)));
        // expire on a missing key reports 0
        assert_eq!(db.expire(b"missing", 10).unwrap(), 0);
    }

    #[test]
    fn del_purges_expiration() {
        let db = db();
        db.set(b"k", b"v").unwrap();
        db.expire(b"k", 100).unwrap();
        db.del(&[b"k"]).unwrap();
        db.set(b"k", b"v2").unwrap();
        assert_eq!(db.ttl(b"k").unwrap(), -1);
    }

    #[test]
    fn empty_key_rejected() {
        let db = db();
        assert!(matches!(db.set(b"", b"v"), Err(StoreError::KeySize)));
        assert!(matches!(db.get(b""), Err(StoreError::KeySize)));
    }
}
