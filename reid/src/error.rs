use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReidError {
    #[error("reid: not found: {0}")]
    NotFound(String),

    #[error("reid: validation: {0}")]
    Validation(String),

    #[error("reid: limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("reid: dependency unavailable: {0}")]
    Unavailable(String),

    /// Reserved for optimistic-concurrency checks; not currently produced.
    #[error("reid: conflict: {0}")]
    Conflict(String),

    #[error("reid: storage error: {0}")]
    Storage(String),

    #[error("reid: serialization error: {0}")]
    Serialization(String),
}

impl From<strayid_kv::KVError> for ReidError {
    fn from(e: strayid_kv::KVError) -> Self {
        ReidError::Storage(e.to_string())
    }
}

impl From<strayid_blob::BlobError> for ReidError {
    fn from(e: strayid_blob::BlobError) -> Self {
        match e {
            strayid_blob::BlobError::NotFound(path) => ReidError::NotFound(path),
            other => ReidError::Storage(other.to_string()),
        }
    }
}

impl From<strayid_embed::EmbedError> for ReidError {
    fn from(e: strayid_embed::EmbedError) -> Self {
        ReidError::Unavailable(e.to_string())
    }
}
