//! Document store interface and implementations.
//!
//! Records are stored as opaque byte values under string keys. Ordering
//! concerns (creation-time indexes, counters) are expressed through the key
//! space, so the trait exposes prefix scans, paged range scans with a
//! start-after bound, and an atomic increment-and-read counter primitive.
//!
//! Two implementations are provided: an in-memory store for tests and
//! single-process tools, and a redb-based store for persistence.

pub mod memory;
pub mod redb;

use std::fmt;
use thiserror::Error;

/// Errors that can occur in store operations.
#[derive(Error, Debug)]
pub enum KVError {
    #[error("kv: not found")]
    NotFound,

    #[error("kv: storage error: {0}")]
    Storage(String),

    #[error("kv: corrupt counter value for key {0}")]
    CorruptCounter(String),
}

/// Result type for store operations.
pub type KVResult<T> = Result<T, KVError>;

/// Document store trait.
///
/// Single-record writes are last-write-wins overwrites. Batch operations
/// and `increment` are atomic: concurrent callers never observe a partial
/// batch, and two concurrent `increment` calls on the same key never
/// return the same value.
pub trait KVStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>>;

    /// Set a key-value pair, overwriting any previous value.
    fn set(&self, key: &str, value: &[u8]) -> KVResult<()>;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> KVResult<()>;

    /// Return all entries whose key starts with `prefix`, in ascending
    /// key order.
    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>>;

    /// Return up to `limit` entries whose key starts with `prefix` and is
    /// strictly greater than `start_after` (when given), in ascending key
    /// order. The paged building block for cursor pagination.
    fn scan_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> KVResult<Vec<(String, Vec<u8>)>>;

    /// Set multiple key-value pairs in one atomic unit.
    fn batch_set(&self, entries: &[(&str, &[u8])]) -> KVResult<()>;

    /// Delete multiple keys in one atomic unit.
    fn batch_delete(&self, keys: &[&str]) -> KVResult<()>;

    /// Atomically add `delta` to the counter stored at `key` and return
    /// the new value. A missing counter starts at 0, so the first
    /// `increment(key, 1)` returns 1.
    fn increment(&self, key: &str, delta: i64) -> KVResult<i64>;
}

impl fmt::Debug for dyn KVStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KVStore {{ ... }}")
    }
}

// Re-export the implementations
pub use memory::MemoryStore;
pub use redb::RedbStore;
