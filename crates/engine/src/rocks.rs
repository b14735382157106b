//! RocksDB engine backend

use crate::{Engine, EngineIterator, Result, Write, WriteBatch};
use rocksdb::{DBRawIterator, Options, WriteOptions, DB};
use std::path::Path;
use tracing::info;

/// Persistent engine backed by RocksDB
///
/// RocksDB iterators pin an implicit snapshot at creation, which gives the
/// cursor contract its point-in-time view. `delete` of an absent key is
/// already a no-op in RocksDB.
pub struct RocksEngine {
    db: DB,
    write_opts: WriteOptions,
    path: String,
}

impl RocksEngine {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.set_max_write_buffer_number(4);
        opts.set_target_file_size_base(64 * 1024 * 1024);
        opts.set_level_zero_file_num_compaction_trigger(4);
        opts.set_max_background_jobs(4);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, &path_str)?;

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(false);

        info!("rocksdb opened at {}", path_str);

        Ok(Self {
            db,
            write_opts,
            path: path_str,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Flush memtables to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl Engine for RocksEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.put_opt(key, value, &self.write_opts)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db.delete_opt(key, &self.write_opts)?;
        Ok(())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut wb = rocksdb::WriteBatch::default();
        for w in batch.into_writes() {
            match w {
                Write::Put { key, value } => wb.put(&key, &value),
                Write::Delete { key } => wb.delete(&key),
            }
        }
        self.db.write_opt(wb, &self.write_opts)?;
        Ok(())
    }

    fn iterator(&self) -> Result<Box<dyn EngineIterator + '_>> {
        Ok(Box::new(RocksIterator {
            inner: self.db.raw_iterator(),
        }))
    }
}

struct RocksIterator<'a> {
    inner: DBRawIterator<'a>,
}

impl EngineIterator for RocksIterator<'_> {
    fn first(&mut self) {
        self.inner.seek_to_first();
    }

    fn last(&mut self) {
        self.inner.seek_to_last();
    }

    fn seek(&mut self, key: &[u8]) {
        self.inner.seek(key);
    }

    fn seek_for_prev(&mut self, key: &[u8]) {
        self.inner.seek_for_prev(key);
    }

    fn next(&mut self) {
        if self.inner.valid() {
            self.inner.next();
        }
    }

    fn prev(&mut self) {
        if self.inner.valid() {
            self.inner.prev();
        }
    }

    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn key(&self) -> &[u8] {
        self.inner.key().unwrap_or(&[])
    }

    fn value(&self) -> &[u8] {
        self.inner.value().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let eng = RocksEngine::open(dir.path()).unwrap();

        eng.put(b"a", b"1").unwrap();
        assert_eq!(eng.get(b"a").unwrap(), Some(b"1".to_vec()));

        let mut batch = WriteBatch::new();
        batch.put(b"b".to_vec(), b"2".to_vec());
        batch.delete(b"a".to_vec());
        eng.write(batch).unwrap();

        assert_eq!(eng.get(b"a").unwrap(), None);
        assert_eq!(eng.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn cursor_walks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let eng = RocksEngine::open(dir.path()).unwrap();
        for k in [b"c", b"a", b"b"] {
            eng.put(k, b"").unwrap();
        }

        let mut it = eng.iterator().unwrap();
        it.first();
        let mut keys = Vec::new();
        while it.valid() {
            keys.push(it.key().to_vec());
            it.next();
        }
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }
}
