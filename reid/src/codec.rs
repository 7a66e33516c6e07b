//! Document encoding helpers (msgpack with named fields).

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ReidError;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ReidError> {
    rmp_serde::to_vec_named(value).map_err(|e| ReidError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, ReidError> {
    rmp_serde::from_slice(data).map_err(|e| ReidError::Serialization(e.to_string()))
}
