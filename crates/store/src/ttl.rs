//! Expiration registry and sweep
//!
//! Two entries per expiring collection, written in the same batch as the
//! primary mutation: a forward entry `(type, key) -> when` for TTL reads and
//! an inverse entry `(when, type, key)` so the sweep walks deadlines in time
//! order. Expiration is lazy: reads never consult the registry, only
//! `purge_expired` removes overdue collections.
//!
//! TTL convention: `-2` when the collection is absent, `-1` when it exists
//! without an expiration.

use crate::codec::{self, DataType};
use crate::db::WriteTx;
use crate::error::Result;
use crate::Db;
use engine::BoundsKind;
use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Wall clock in unix seconds.
pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl Db {
    /// Register `when` as the collection's deadline, replacing any previous
    /// one. Buffered into `t`; callers hold the type's lock.
    pub(crate) fn expire_at_tx(
        &self,
        t: &mut WriteTx<'_>,
        dt: DataType,
        key: &[u8],
        when: i64,
    ) -> Result<()> {
        if let Some(old) = self.expire_time(dt, key)? {
            t.delete(codec::encode_exp_time_key(self.index(), old, dt, key));
        }
        t.put(
            codec::encode_exp_meta_key(self.index(), dt, key),
            codec::encode_i64(when).to_vec(),
        );
        t.put(codec::encode_exp_time_key(self.index(), when, dt, key), Vec::new());
        Ok(())
    }

    /// Drop both registry entries; returns 1 if an expiration existed.
    pub(crate) fn rm_expire_tx(&self, t: &mut WriteTx<'_>, dt: DataType, key: &[u8]) -> Result<i64> {
        match self.expire_time(dt, key)? {
            Some(when) => {
                t.delete(codec::encode_exp_meta_key(self.index(), dt, key));
                t.delete(codec::encode_exp_time_key(self.index(), when, dt, key));
                Ok(1)
            }
            None => Ok(0),
        }
    }

    pub(crate) fn expire_time(&self, dt: DataType, key: &[u8]) -> Result<Option<i64>> {
        match self
            .engine()
            .get(&codec::encode_exp_meta_key(self.index(), dt, key))?
        {
            Some(v) => Ok(Some(codec::decode_i64(&v)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn collection_ttl(&self, dt: DataType, key: &[u8], exists: bool) -> Result<i64> {
        if !exists {
            return Ok(-2);
        }
        match self.expire_time(dt, key)? {
            Some(when) => Ok((when - now_secs()).max(0)),
            None => Ok(-1),
        }
    }

    /// Remove every collection whose deadline is `<= now`.
    ///
    /// One transaction per expired collection, under that type's lock, so the
    /// sweep interleaves with user operators without special casing.
    pub fn purge_expired(&self, now: i64) -> Result<u64> {
        let mut expired = Vec::new();
        {
            let mut it = self.range_iter(
                Some(codec::exp_time_start_key(self.index())),
                Some(codec::exp_time_stop_key(self.index(), now)),
                BoundsKind::ClosedOpen,
                0,
                -1,
            )?;
            while it.valid() {
                let (when, dt, key) = codec::decode_exp_time_key(self.index(), it.key())?;
                expired.push((when, dt, key));
                it.next();
            }
        }

        let mut purged = 0u64;
        for (_, dt, key) in expired {
            let lock: &Mutex<()> = match dt {
                DataType::Kv => &self.kv_lock,
                DataType::Hash => &self.hash_lock,
                DataType::List => &self.list_lock,
                DataType::Set => &self.set_lock,
                DataType::ZSet => &self.zset_lock,
                DataType::Bit => &self.bit_lock,
            };
            let _guard = lock.lock();
            match self.purge_one(dt, &key, now) {
                Ok(true) => purged += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("expire sweep failed for {} key: {}", dt.name(), e);
                    return Err(e);
                }
            }
        }
        if purged > 0 {
            debug!("expired {} collections in db {}", purged, self.index());
        }
        Ok(purged)
    }

    /// Caller holds the type lock. Re-reads the deadline so a concurrent
    /// re-expire to a future instant is respected.
    fn purge_one(&self, dt: DataType, key: &[u8], now: i64) -> Result<bool> {
        let Some(when) = self.expire_time(dt, key)? else {
            return Ok(false);
        };
        if when > now {
            return Ok(false);
        }

        let mut t = self.tx();
        match dt {
            DataType::Kv => t.delete(codec::encode_kv_key(self.index(), key)),
            DataType::Hash => {
                self.h_delete(&mut t, key)?;
            }
            DataType::List => {
                self.l_delete(&mut t, key)?;
            }
            DataType::Set => {
                self.s_delete(&mut t, key)?;
            }
            DataType::ZSet => {
                self.z_delete(&mut t, key)?;
            }
            DataType::Bit => {
                self.b_delete(&mut t, key)?;
            }
        }
        self.rm_expire_tx(&mut t, dt, key)?;
        t.commit()?;
        Ok(true)
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
    fn ttl_conventions() {
        let db = db();
        // absent key
        assert_eq!(db.ttl(b"nope").unwrap(), -2);
        // present, no expiration
        db.set(b"k", b"v").unwrap();
        assert_eq!(db.ttl(b"k").unwrap(), -1);
        // present with expiration
        db.expire(b"k", 100).unwrap();
        let ttl = db.ttl(b"k").unwrap();
        assert!(ttl > 0 && ttl <= 100);
    }

    #[test]
    fn sweep_removes_collection_and_registry() {
        let db = db();
        let when = now_secs() + 50;

        db.sadd(b"s", &[b"a", b"b"]).unwrap();
        assert_eq!(db.sexpire_at(b"s", when).unwrap(), 1);
        assert!(db.purge_expired(when - 1).unwrap() == 0);
        assert_eq!(db.scard(b"s").unwrap(), 2);

        assert_eq!(db.purge_expired(when).unwrap(), 1);
        assert_eq!(db.scard(b"s").unwrap(), 0);
        assert_eq!(db.smembers(b"s").unwrap().len(), 0);
        assert_eq!(db.sttl(b"s").unwrap(), -2);
        // inverse index drained
        assert_eq!(db.purge_expired(when + 100).unwrap(), 0);
    }

    #[test]
    fn re_expire_replaces_inverse_entry() {
        let db = db();
        let base = now_secs();
        db.set(b"k", b"v").unwrap();
        db.expire_at(b"k", base + 10).unwrap();
        db.expire_at(b"k", base + 1000).unwrap();

        // old deadline passes but the key keeps its later expiration
        assert_eq!(db.purge_expired(base + 10).unwrap(), 0);
        assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));

        assert_eq!(db.purge_expired(base + 1000).unwrap(), 1);
        assert_eq!(db.get(b"k").unwrap(), None);
    }

    #[test]
    fn persist_clears_expiration() {
        let db = db();
        db.set(b"k", b"v").unwrap();
        db.expire(b"k", 100).unwrap();
        assert_eq!(db.persist(b"k").unwrap(), 1);
        assert_eq!(db.ttl(b"k").unwrap(), -1);
        assert_eq!(db.persist(b"k").unwrap(), 0);
    }
}
