//! In-memory engine backed by a BTreeMap
//!
//! Iterators materialize a snapshot of the map at creation, so readers
//! observe a stable view and never hold the lock across operator code.

use crate::{Engine, EngineIterator, Result, Write, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Ordered in-memory engine
#[derive(Default)]
pub struct MemoryEngine {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Engine for MemoryEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut map = self.map.write();
        for w in batch.into_writes() {
            match w {
                Write::Put { key, value } => {
                    map.insert(key, value);
                }
                Write::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn iterator(&self) -> Result<Box<dyn EngineIterator + '_>> {
        let entries: Vec<(Vec<u8>, Vec<u8>)> = self
            .map
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(MemoryIterator {
            entries,
            pos: 0,
            valid: false,
        }))
    }
}

/// Snapshot cursor over the memory engine
struct MemoryIterator {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pos: usize,
    valid: bool,
}

impl EngineIterator for MemoryIterator {
    fn first(&mut self) {
        self.pos = 0;
        self.valid = !self.entries.is_empty();
    }

    fn last(&mut self) {
        self.valid = !self.entries.is_empty();
        if self.valid {
            self.pos = self.entries.len() - 1;
        }
    }

    fn seek(&mut self, key: &[u8]) {
        let idx = self.entries.partition_point(|(k, _)| k.as_slice() < key);
        if idx < self.entries.len() {
            self.pos = idx;
            self.valid = true;
        } else {
            self.valid = false;
        }
    }

    fn seek_for_prev(&mut self, key: &[u8]) {
        let idx = self.entries.partition_point(|(k, _)| k.as_slice() <= key);
        if idx > 0 {
            self.pos = idx - 1;
            self.valid = true;
        } else {
            self.valid = false;
        }
    }

    fn next(&mut self) {
        if self.valid {
            self.pos += 1;
            self.valid = self.pos < self.entries.len();
        }
    }

    fn prev(&mut self) {
        if self.valid {
            if self.pos == 0 {
                self.valid = false;
            } else {
                self.pos -= 1;
            }
        }
    }

    fn valid(&self) -> bool {
        self.valid
    }

    fn key(&self) -> &[u8] {
        if self.valid {
            &self.entries[self.pos].0
        } else {
            &[]
        }
    }

    fn value(&self) -> &[u8] {
        if self.valid {
            &self.entries[self.pos].1
        } else {
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_put_delete() {
        let eng = MemoryEngine::new();
        assert_eq!(eng.get(b"k").unwrap(), None);
        eng.put(b"k", b"v").unwrap();
        assert_eq!(eng.get(b"k").unwrap(), Some(b"v".to_vec()));
        eng.delete(b"k").unwrap();
        assert_eq!(eng.get(b"k").unwrap(), None);
        // absent delete is a no-op
        eng.delete(b"k").unwrap();
    }

    #[test]
    fn batch_applies_in_order() {
        let eng = MemoryEngine::new();
        let mut batch = WriteBatch::new();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.put(b"a".to_vec(), b"2".to_vec());
        batch.delete(b"b".to_vec());
        eng.write(batch).unwrap();
        assert_eq!(eng.get(b"a").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn iterator_is_snapshot() {
        let eng = MemoryEngine::new();
        eng.put(b"a", b"1").unwrap();
        let mut it = eng.iterator().unwrap();
        eng.put(b"b", b"2").unwrap();
        it.first();
        assert!(it.valid());
        assert_eq!(it.key(), b"a");
        it.next();
        assert!(!it.valid());
    }

    #[test]
    fn seek_positions() {
        let eng = MemoryEngine::new();
        for k in [b"b", b"d", b"f"] {
            eng.put(k, b"").unwrap();
        }
        let mut it = eng.iterator().unwrap();

        it.seek(b"c");
        assert_eq!(it.key(), b"d");
        it.seek(b"d");
        assert_eq!(it.key(), b"d");
        it.seek(b"g");
        assert!(!it.valid());

        it.seek_for_prev(b"c");
        assert_eq!(it.key(), b"b");
        it.seek_for_prev(b"b");
        assert_eq!(it.key(), b"b");
        it.seek_for_prev(b"a");
        assert!(!it.valid());
    }
}
