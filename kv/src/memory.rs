//! In-memory document store implementation.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex};

use crate::{KVError, KVResult, KVStore};

fn decode_counter(key: &str, raw: &[u8]) -> KVResult<i64> {
    let s = std::str::from_utf8(raw).map_err(|_| KVError::CorruptCounter(key.to_string()))?;
    s.parse()
        .map_err(|_| KVError::CorruptCounter(key.to_string()))
}

/// An in-memory document store backed by a BTreeMap.
///
/// The ordered map makes prefix and range scans direct key-range walks
/// instead of filter-and-sort passes. All operations hold a single mutex,
/// which also makes `increment` atomic across threads.
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KVStore for MemoryStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> KVResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> KVResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        data.remove(key);
        Ok(())
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        let data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn scan_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> KVResult<Vec<(String, Vec<u8>)>> {
        let data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        let lower = match start_after {
            Some(k) if k >= prefix => Bound::Excluded(k.to_string()),
            _ => Bound::Included(prefix.to_string()),
        };
        Ok(data
            .range((lower, Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn batch_set(&self, entries: &[(&str, &[u8])]) -> KVResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        for (key, value) in entries {
            data.insert(key.to_string(), value.to_vec());
        }
        Ok(())
    }

    fn batch_delete(&self, keys: &[&str]) -> KVResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }

    fn increment(&self, key: &str, delta: i64) -> KVResult<i64> {
        // Read-modify-write under the single store mutex.
        let mut data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        let current = match data.get(key) {
            Some(raw) => decode_counter(key, raw)?,
            None => 0,
        };
        let next = current + delta;
        data.insert(key.to_string(), next.to_string().into_bytes());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemoryStore::new();

        store.set("profile:a", b"doc").unwrap();
        assert_eq!(store.get("profile:a").unwrap(), Some(b"doc".to_vec()));

        assert_eq!(store.get("profile:missing").unwrap(), None);

        store.delete("profile:a").unwrap();
        assert_eq!(store.get("profile:a").unwrap(), None);

        // Deleting again is fine.
        store.delete("profile:a").unwrap();
    }

    #[test]
    fn test_scan_is_ordered() {
        let store = MemoryStore::new();
        store.set("sighting:b", b"2").unwrap();
        store.set("sighting:a", b"1").unwrap();
        store.set("profile:c", b"3").unwrap();

        let results = store.scan("sighting:").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "sighting:a");
        assert_eq!(results[1].0, "sighting:b");
    }

    #[test]
    fn test_scan_page_start_after() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c", "d"] {
            store.set(&format!("idx:{id}"), id.as_bytes()).unwrap();
        }

        let first = store.scan_page("idx:", None, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].0, "idx:a");
        assert_eq!(first[1].0, "idx:b");

        let rest = store.scan_page("idx:", Some("idx:b"), 10).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].0, "idx:c");
        assert_eq!(rest[1].0, "idx:d");
    }

    #[test]
    fn test_scan_page_ignores_foreign_prefix() {
        let store = MemoryStore::new();
        store.set("a:1", b"1").unwrap();
        store.set("b:1", b"2").unwrap();

        let page = store.scan_page("a:", None, 10).unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_batch_operations() {
        let store = MemoryStore::new();

        store
            .batch_set(&[("k1", b"v1"), ("k2", b"v2")])
            .unwrap();
        assert_eq!(store.get("k1").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(store.get("k2").unwrap(), Some(b"v2".to_vec()));

        store.batch_delete(&["k1", "k2"]).unwrap();
        assert_eq!(store.get("k1").unwrap(), None);
    }

    #[test]
    fn test_increment_from_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.increment("seq:profile", 1).unwrap(), 1);
        assert_eq!(store.increment("seq:profile", 1).unwrap(), 2);
        assert_eq!(store.increment("seq:profile", 5).unwrap(), 7);
    }

    #[test]
    fn test_increment_concurrent_values_distinct() {
        let store = MemoryStore::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let s = store.clone();
            handles.push(std::thread::spawn(move || {
                (0..100)
                    .map(|_| s.increment("seq", 1).unwrap())
                    .collect::<Vec<i64>>()
            }));
        }
        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        let expected: Vec<i64> = (1..=800).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_increment_corrupt_counter() {
        let store = MemoryStore::new();
        store.set("seq", b"\xff\xfe").unwrap();
        assert!(matches!(
            store.increment("seq", 1),
            Err(KVError::CorruptCounter(_))
        ));
    }
}
