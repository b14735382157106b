//! Ordered byte-keyed storage engine contract
//!
//! Everything above this crate speaks one flat, ordered keyspace:
//!
//! - `Engine`: point reads/writes, atomic batch commit, snapshot iterators
//! - `EngineIterator`: cursor positioning (first/last/seek/next/prev)
//! - `RangeLimitIter`: bounded range scan with offset/limit, both directions
//!
//! Backends implement `Engine`; the `memory` backend serves tests and
//! zero-setup deployments, the `rocks` backend persists via RocksDB.

pub mod memory;
pub mod range;
pub mod rocks;

pub use memory::MemoryEngine;
pub use range::{BoundsKind, RangeLimitIter};
pub use rocks::RocksEngine;

/// Engine-level error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rocksdb error: {0}")]
    Rocks(String),
}

impl From<rocksdb::Error> for EngineError {
    fn from(e: rocksdb::Error) -> Self {
        EngineError::Rocks(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// A single buffered mutation
#[derive(Debug, Clone)]
pub enum Write {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Ordered list of mutations applied atomically by `Engine::write`
#[derive(Debug, Default)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.push(Write::Put { key, value });
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.writes.push(Write::Delete { key });
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

/// Ordered byte-keyed store
///
/// Implementations must treat `delete` of an absent key as a no-op and must
/// apply a `WriteBatch` atomically: either every write in the batch becomes
/// visible or none does.
pub trait Engine: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Apply all writes in one atomic commit.
    fn write(&self, batch: WriteBatch) -> Result<()>;

    /// Cursor over a point-in-time snapshot of the keyspace.
    ///
    /// The snapshot is pinned at creation; writes committed afterwards are
    /// not observed. Dropping the cursor releases the snapshot.
    fn iterator(&self) -> Result<Box<dyn EngineIterator + '_>>;
}

/// Cursor over the ordered keyspace
///
/// `key`/`value` return empty slices while the cursor is not `valid`.
pub trait EngineIterator {
    /// Position at the smallest key.
    fn first(&mut self);

    /// Position at the largest key.
    fn last(&mut self);

    /// Position at the smallest key `>= key`.
    fn seek(&mut self, key: &[u8]);

    /// Position at the largest key `<= key`.
    fn seek_for_prev(&mut self, key: &[u8]);

    fn next(&mut self);

    fn prev(&mut self);

    fn valid(&self) -> bool;

    fn key(&self) -> &[u8];

    fn value(&self) -> &[u8];
}
