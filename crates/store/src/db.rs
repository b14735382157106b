//! Database handles and the write-batch transaction facade
//!
//! `Store` owns the engine and the sixteen `Db` handles. A `Db` carries its
//! one-byte index and one write lock per logical type; every mutating
//! operator holds its type's lock for the whole operation, buffers writes
//! into a `WriteTx`, and commits once. Readers take no lock and see the
//! engine's snapshot view.

use crate::codec;
use crate::error::{Result, StoreError};
use crate::{MAX_DB_INDEX, MAX_KEY_SIZE, MAX_MEMBER_SIZE};
use engine::{BoundsKind, Engine, RangeLimitIter, WriteBatch};
use parking_lot::Mutex;
use std::sync::Arc;

/// Top-level handle: the engine plus one `Db` per database index
pub struct Store {
    engine: Arc<dyn Engine>,
    dbs: Vec<Arc<Db>>,
}

impl Store {
    pub fn open(engine: Arc<dyn Engine>) -> Self {
        let dbs = (0..=MAX_DB_INDEX)
            .map(|index| Arc::new(Db::new(engine.clone(), index)))
            .collect();
        Self { engine, dbs }
    }

    /// Handle for database `index` (0..=15).
    pub fn select(&self, index: u8) -> Result<Arc<Db>> {
        self.dbs
            .get(index as usize)
            .cloned()
            .ok_or(StoreError::DbIndex(index))
    }

    pub fn databases(&self) -> &[Arc<Db>] {
        &self.dbs
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }
}

/// One logical database: type operators live in the per-type modules
pub struct Db {
    engine: Arc<dyn Engine>,
    index: u8,
    pub(crate) kv_lock: Mutex<()>,
    pub(crate) hash_lock: Mutex<()>,
    pub(crate) list_lock: Mutex<()>,
    pub(crate) set_lock: Mutex<()>,
    pub(crate) zset_lock: Mutex<()>,
    pub(crate) bit_lock: Mutex<()>,
}

impl Db {
    fn new(engine: Arc<dyn Engine>, index: u8) -> Self {
        Self {
            engine,
            index,
            kv_lock: Mutex::new(()),
            hash_lock: Mutex::new(()),
            list_lock: Mutex::new(()),
            set_lock: Mutex::new(()),
            zset_lock: Mutex::new(()),
            bit_lock: Mutex::new(()),
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub(crate) fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    /// Fresh write transaction; commit applies the batch atomically,
    /// dropping it discards every buffered write.
    pub(crate) fn tx(&self) -> WriteTx<'_> {
        WriteTx {
            engine: self.engine.as_ref(),
            batch: WriteBatch::new(),
        }
    }

    /// Decode a stored big-endian i64 scalar; absent means 0.
    pub(crate) fn read_i64(&self, key: &[u8]) -> Result<i64> {
        match self.engine().get(key)? {
            Some(v) => codec::decode_i64(&v),
            None => Ok(0),
        }
    }

    pub(crate) fn range_iter(
        &self,
        start: Option<Vec<u8>>,
        stop: Option<Vec<u8>>,
        kind: BoundsKind,
        offset: usize,
        limit: i64,
    ) -> Result<RangeLimitIter<'_>> {
        Ok(RangeLimitIter::new(
            self.engine.iterator()?,
            start,
            stop,
            kind,
            offset,
            limit,
        ))
    }

    pub(crate) fn rev_range_iter(
        &self,
        start: Option<Vec<u8>>,
        stop: Option<Vec<u8>>,
        kind: BoundsKind,
        offset: usize,
        limit: i64,
    ) -> Result<RangeLimitIter<'_>> {
        Ok(RangeLimitIter::new_rev(
            self.engine.iterator()?,
            start,
            stop,
            kind,
            offset,
            limit,
        ))
    }
}

/// Buffered writes committed in one engine batch
pub(crate) struct WriteTx<'a> {
    engine: &'a dyn Engine,
    batch: WriteBatch,
}

impl WriteTx<'_> {
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.batch.put(key, value);
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.batch.delete(key);
    }

    pub fn commit(self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.engine.write(self.batch)?;
        Ok(())
    }
}

pub(crate) fn check_key_size(key: &[u8]) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_SIZE {
        return Err(StoreError::KeySize);
    }
    Ok(())
}

pub(crate) fn check_member_size(key: &[u8], member: &[u8]) -> Result<()> {
    check_key_size(key)?;
    if member.is_empty() || member.len() > MAX_MEMBER_SIZE {
        return Err(StoreError::MemberSize);
    }
    Ok(())
}

/// Parse a stored decimal value as i64; absent means 0.
pub(crate) fn parse_int(value: Option<Vec<u8>>) -> Result<i64> {
    match value {
        None => Ok(0),
        Some(v) => std::str::from_utf8(&v)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(StoreError::Value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::MemoryEngine;

    fn memory_store() -> Store {
        Store::open(Arc::new(MemoryEngine::new()))
    }

    #[test]
    fn select_bounds() {
        let store = memory_store();
        assert!(store.select(0).is_ok());
        assert!(store.select(15).is_ok());
        assert!(matches!(store.select(16), Err(StoreError::DbIndex(16))));
    }

    #[test]
    fn dropped_tx_writes_nothing() {
        let store = memory_store();
        let db = store.select(0).unwrap();
        {
            let mut t = db.tx();
            t.put(b"k".to_vec(), b"v".to_vec());
            // dropped without commit
        }
        assert_eq!(db.engine().get(b"k").unwrap(), None);
    }

    #[test]
    fn key_size_limits() {
        assert!(check_key_size(b"").is_err());
        assert!(check_key_size(&vec![0u8; MAX_KEY_SIZE]).is_ok());
        assert!(check_key_size(&vec![0u8; MAX_KEY_SIZE + 1]).is_err());
        assert!(check_member_size(b"k", b"").is_err());
        assert!(check_member_size(b"k", &vec![0u8; MAX_MEMBER_SIZE + 1]).is_err());
    }

    #[test]
    fn parse_int_values() {
        assert_eq!(parse_int(None).unwrap(), 0);
        assert_eq!(parse_int(Some(b"-42".to_vec())).unwrap(), -42);
        assert!(parse_int(Some(b"abc".to_vec())).is_err());
        assert!(parse_int(Some(b"12.5".to_vec())).is_err());
    }
}
