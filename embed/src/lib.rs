//! Biometric image embedding interface.
//!
//! An [`Embedder`] turns a photograph into a fixed-length feature vector
//! plus the version of the model that produced it. The vector is expected,
//! but not guaranteed, to be unit-norm; consumers re-normalize defensively.
//!
//! [`HttpEmbedder`] talks to the external ML service; the trait keeps the
//! model itself an opaque capability so tests can substitute their own.

mod config;
mod embed;
mod error;
mod http;

pub use config::EmbedConfig;
pub use embed::{Embedder, Embedding};
pub use error::EmbedError;
pub use http::HttpEmbedder;
