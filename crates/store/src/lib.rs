//! Redis-compatible typed storage over one ordered byte keyspace
//!
//! Six logical types (KV, Hash, List, Set, ZSet, Bitmap) share a single flat
//! keyspace provided by an `engine::Engine`. The codec module fixes the
//! composite key encodings, `db` provides the per-database handle with one
//! write lock per type and the batch transaction facade, and one module per
//! type implements its command surface. Expirations live in a unified
//! registry with a time-ordered inverse index swept by `Db::purge_expired`.

pub mod bitmap;
pub mod codec;
pub mod db;
pub mod error;
pub mod hash;
pub mod kv;
pub mod list;
pub mod set;
pub mod ttl;
pub mod zset;

pub use codec::DataType;
pub use db::{Db, Store};
pub use error::{Result, StoreError};
pub use zset::{Aggregate, ScorePair};
pub use bitmap::BitOp;

/// Maximum logical key length in bytes.
pub const MAX_KEY_SIZE: usize = 1024;

/// Maximum member/field/element length in bytes.
pub const MAX_MEMBER_SIZE: usize = 1024;

/// Reserved low sentinel; valid scores are strictly greater.
/// `i64::MIN` itself stands for `-inf` in range queries.
pub const MIN_SCORE: i64 = i64::MIN + 1;

/// Reserved high sentinel (`+inf` in range queries); valid scores are
/// strictly smaller.
pub const MAX_SCORE: i64 = i64::MAX;

/// Databases addressable through `SELECT`: 0..=15.
pub const MAX_DB_INDEX: u8 = 15;

/// Bitmap chunk width in bytes.
pub const BIT_CHUNK_BYTES: usize = 512;
