//! Redb-based persistent document store implementation.

use std::ops::Bound;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use crate::{KVError, KVResult, KVStore};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("docs");

fn decode_counter(key: &str, raw: &[u8]) -> KVResult<i64> {
    let s = std::str::from_utf8(raw).map_err(|_| KVError::CorruptCounter(key.to_string()))?;
    s.parse()
        .map_err(|_| KVError::CorruptCounter(key.to_string()))
}

/// A persistent document store backed by redb.
///
/// Every write method runs inside a single redb write transaction, so
/// batch operations commit as one unit and `increment` is a serialized
/// read-modify-write even across processes sharing the database file.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a redb store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> KVResult<Self> {
        let db = Database::create(path).map_err(|e| KVError::Storage(e.to_string()))?;

        // Create the table if it doesn't exist
        let tx = db
            .begin_write()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        {
            let _ = tx
                .open_table(TABLE)
                .map_err(|e| KVError::Storage(e.to_string()))?;
        }
        tx.commit().map_err(|e| KVError::Storage(e.to_string()))?;

        Ok(Self { db })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let tx = self
            .db
            .begin_read()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        let table = tx
            .open_table(TABLE)
            .map_err(|e| KVError::Storage(e.to_string()))?;

        match table
            .get(key)
            .map_err(|e| KVError::Storage(e.to_string()))?
        {
            Some(value) => Ok(Some(value.value().to_vec())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> KVResult<()> {
        self.batch_set(&[(key, value)])
    }

    fn delete(&self, key: &str) -> KVResult<()> {
        self.batch_delete(&[key])
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        // redb iterates in key order, so a range walk from the prefix is
        // already sorted.
        self.range_scan(prefix, None, usize::MAX)
    }

    fn scan_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> KVResult<Vec<(String, Vec<u8>)>> {
        self.range_scan(prefix, start_after, limit)
    }

    fn batch_set(&self, entries: &[(&str, &[u8])]) -> KVResult<()> {
        let tx = self
            .db
            .begin_write()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        {
            let mut table = tx
                .open_table(TABLE)
                .map_err(|e| KVError::Storage(e.to_string()))?;
            for (key, value) in entries {
                table
                    .insert(*key, *value)
                    .map_err(|e| KVError::Storage(e.to_string()))?;
            }
        }
        tx.commit().map_err(|e| KVError::Storage(e.to_string()))?;
        Ok(())
    }

    fn batch_delete(&self, keys: &[&str]) -> KVResult<()> {
        let tx = self
            .db
            .begin_write()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        {
            let mut table = tx
                .open_table(TABLE)
                .map_err(|e| KVError::Storage(e.to_string()))?;
            for key in keys {
                table
                    .remove(*key)
                    .map_err(|e| KVError::Storage(e.to_string()))?;
            }
        }
        tx.commit().map_err(|e| KVError::Storage(e.to_string()))?;
        Ok(())
    }

    fn increment(&self, key: &str, delta: i64) -> KVResult<i64> {
        // Read and write inside one write transaction; redb serializes
        // writers, so concurrent increments cannot observe the same value.
        let tx = self
            .db
            .begin_write()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        let next;
        {
            let mut table = tx
                .open_table(TABLE)
                .map_err(|e| KVError::Storage(e.to_string()))?;
            let current = match table
                .get(key)
                .map_err(|e| KVError::Storage(e.to_string()))?
            {
                Some(value) => decode_counter(key, value.value())?,
                None => 0,
            };
            next = current + delta;
            table
                .insert(key, next.to_string().as_bytes())
                .map_err(|e| KVError::Storage(e.to_string()))?;
        }
        tx.commit().map_err(|e| KVError::Storage(e.to_string()))?;
        Ok(next)
    }
}

impl RedbStore {
    fn range_scan(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> KVResult<Vec<(String, Vec<u8>)>> {
        let tx = self
            .db
            .begin_read()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        let table = tx
            .open_table(TABLE)
            .map_err(|e| KVError::Storage(e.to_string()))?;

        let lower: Bound<&str> = match start_after {
            Some(k) if k >= prefix => Bound::Excluded(k),
            _ => Bound::Included(prefix),
        };

        let mut results = Vec::new();
        for item in table
            .range::<&str>((lower, Bound::Unbounded))
            .map_err(|e| KVError::Storage(e.to_string()))?
        {
            let (key, value) = item.map_err(|e| KVError::Storage(e.to_string()))?;
            let key_str = key.value();
            if !key_str.starts_with(prefix) {
                break;
            }
            results.push((key_str.to_string(), value.value().to_vec()));
            if results.len() >= limit {
                break;
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_redb_basic() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();

        store.set("profile:a", b"doc").unwrap();
        assert_eq!(store.get("profile:a").unwrap(), Some(b"doc".to_vec()));

        store.delete("profile:a").unwrap();
        assert_eq!(store.get("profile:a").unwrap(), None);
    }

    #[test]
    fn test_redb_scan_page() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();

        store.set("idx:a", b"1").unwrap();
        store.set("idx:b", b"2").unwrap();
        store.set("idx:c", b"3").unwrap();
        store.set("other:d", b"4").unwrap();

        let all = store.scan("idx:").unwrap();
        assert_eq!(all.len(), 3);

        let page = store.scan_page("idx:", Some("idx:a"), 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].0, "idx:b");
    }

    #[test]
    fn test_redb_increment() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();

        assert_eq!(store.increment("seq:profile", 1).unwrap(), 1);
        assert_eq!(store.increment("seq:profile", 1).unwrap(), 2);
    }

    #[test]
    fn test_redb_increment_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            assert_eq!(store.increment("seq", 1).unwrap(), 1);
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.increment("seq", 1).unwrap(), 2);
    }
}
