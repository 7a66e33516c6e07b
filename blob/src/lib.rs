//! Binary object store interface and implementations.
//!
//! Photos are stored as opaque blobs under slash-separated paths
//! (e.g. `profiles/{id}/photos/{photo_id}.jpg`). The store also issues
//! time-limited retrieval references so callers never hand out raw paths.

pub mod fs;
pub mod memory;

use std::fmt;
use thiserror::Error;

/// Errors that can occur in blob store operations.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("blob: not found: {0}")]
    NotFound(String),

    #[error("blob: storage error: {0}")]
    Storage(String),
}

/// Result type for blob operations.
pub type BlobResult<T> = Result<T, BlobError>;

/// Binary object store trait.
pub trait BlobStore: Send + Sync {
    /// Store a blob at `path`, overwriting any previous content.
    fn put(&self, path: &str, data: &[u8]) -> BlobResult<()>;

    /// Fetch a blob. Returns `NotFound` if absent.
    fn get(&self, path: &str) -> BlobResult<Vec<u8>>;

    /// Delete a blob. Deleting an absent blob is not an error.
    fn delete(&self, path: &str) -> BlobResult<()>;

    /// Delete every blob whose path starts with `prefix`.
    fn delete_prefix(&self, prefix: &str) -> BlobResult<()>;

    /// List paths under `prefix`, in ascending order.
    fn list(&self, prefix: &str) -> BlobResult<Vec<String>>;

    /// Produce a time-limited retrieval reference for a stored blob.
    /// The reference format is backend-specific and opaque to callers.
    fn url(&self, path: &str, ttl_secs: u64) -> BlobResult<String>;
}

impl fmt::Debug for dyn BlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobStore {{ ... }}")
    }
}

// Re-export the implementations
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;
