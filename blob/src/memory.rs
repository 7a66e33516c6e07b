//! In-memory blob store implementation for testing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::{BlobError, BlobResult, BlobStore};

/// An in-memory blob store backed by a BTreeMap.
#[derive(Clone)]
pub struct MemoryBlobStore {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    /// Create a new empty blob store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, path: &str, data: &[u8]) -> BlobResult<()> {
        let mut map = self
            .data
            .lock()
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        map.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, path: &str) -> BlobResult<Vec<u8>> {
        let map = self
            .data
            .lock()
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        map.get(path)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(path.to_string()))
    }

    fn delete(&self, path: &str) -> BlobResult<()> {
        let mut map = self
            .data
            .lock()
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        map.remove(path);
        Ok(())
    }

    fn delete_prefix(&self, prefix: &str) -> BlobResult<()> {
        let mut map = self
            .data
            .lock()
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        map.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    fn list(&self, prefix: &str) -> BlobResult<Vec<String>> {
        let map = self
            .data
            .lock()
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        Ok(map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn url(&self, path: &str, ttl_secs: u64) -> BlobResult<String> {
        let map = self
            .data
            .lock()
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        if !map.contains_key(path) {
            return Err(BlobError::NotFound(path.to_string()));
        }
        let exp = Utc::now().timestamp() + ttl_secs as i64;
        Ok(format!("mem://{path}?exp={exp}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let store = MemoryBlobStore::new();
        store.put("sightings/s1/photo_0.jpg", b"jpeg").unwrap();
        assert_eq!(store.get("sightings/s1/photo_0.jpg").unwrap(), b"jpeg");

        store.delete("sightings/s1/photo_0.jpg").unwrap();
        assert!(matches!(
            store.get("sightings/s1/photo_0.jpg"),
            Err(BlobError::NotFound(_))
        ));
    }

    #[test]
    fn delete_prefix_cascades() {
        let store = MemoryBlobStore::new();
        store.put("profiles/p1/photos/a.jpg", b"a").unwrap();
        store.put("profiles/p1/photos/b.jpg", b"b").unwrap();
        store.put("profiles/p2/photos/c.jpg", b"c").unwrap();

        store.delete_prefix("profiles/p1/").unwrap();
        assert!(store.list("profiles/p1/").unwrap().is_empty());
        assert_eq!(store.list("profiles/p2/").unwrap().len(), 1);
    }

    #[test]
    fn url_requires_existing_blob() {
        let store = MemoryBlobStore::new();
        assert!(store.url("missing.jpg", 60).is_err());

        store.put("a.jpg", b"x").unwrap();
        let url = store.url("a.jpg", 60).unwrap();
        assert!(url.starts_with("mem://a.jpg?exp="));
    }
}
