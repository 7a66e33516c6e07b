//! Filesystem-backed blob store implementation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::{BlobError, BlobResult, BlobStore};

/// A blob store rooted at a directory on the local filesystem.
///
/// Blob paths map directly to file paths under the root. Path segments are
/// checked against traversal (`..`) before touching the filesystem.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a blob store rooted at `root`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> BlobResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| BlobError::Storage(e.to_string()))?;
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> BlobResult<PathBuf> {
        if path.is_empty() || path.split('/').any(|seg| seg == "..") {
            return Err(BlobError::Storage(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(path))
    }

    fn collect_paths(&self, dir: &Path, base: &str, out: &mut Vec<String>) -> BlobResult<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(BlobError::Storage(e.to_string())),
        };
        for entry in entries {
            let entry = entry.map_err(|e| BlobError::Storage(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = if base.is_empty() {
                name
            } else {
                format!("{base}/{name}")
            };
            let ty = entry
                .file_type()
                .map_err(|e| BlobError::Storage(e.to_string()))?;
            if ty.is_dir() {
                self.collect_paths(&entry.path(), &rel, out)?;
            } else {
                out.push(rel);
            }
        }
        Ok(())
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, path: &str, data: &[u8]) -> BlobResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| BlobError::Storage(e.to_string()))?;
        }
        fs::write(&full, data).map_err(|e| BlobError::Storage(e.to_string()))
    }

    fn get(&self, path: &str) -> BlobResult<Vec<u8>> {
        let full = self.resolve(path)?;
        match fs::read(&full) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(path.to_string())),
            Err(e) => Err(BlobError::Storage(e.to_string())),
        }
    }

    fn delete(&self, path: &str) -> BlobResult<()> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::Storage(e.to_string())),
        }
    }

    fn delete_prefix(&self, prefix: &str) -> BlobResult<()> {
        for path in self.list(prefix)? {
            self.delete(&path)?;
        }
        Ok(())
    }

    fn list(&self, prefix: &str) -> BlobResult<Vec<String>> {
        let mut all = Vec::new();
        self.collect_paths(&self.root.clone(), "", &mut all)?;
        let mut matching: Vec<String> = all
            .into_iter()
            .filter(|p| p.starts_with(prefix))
            .collect();
        matching.sort();
        Ok(matching)
    }

    fn url(&self, path: &str, ttl_secs: u64) -> BlobResult<String> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(BlobError::NotFound(path.to_string()));
        }
        let exp = Utc::now().timestamp() + ttl_secs as i64;
        Ok(format!("file://{}?exp={exp}", full.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_get_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        store.put("profiles/p1/photos/a.jpg", b"jpeg").unwrap();
        assert_eq!(store.get("profiles/p1/photos/a.jpg").unwrap(), b"jpeg");
    }

    #[test]
    fn missing_blob_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.get("nope.jpg"),
            Err(BlobError::NotFound(_))
        ));
        // Deleting a missing blob is fine.
        store.delete("nope.jpg").unwrap();
    }

    #[test]
    fn list_and_delete_prefix() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        store.put("profiles/p1/photos/a.jpg", b"a").unwrap();
        store.put("profiles/p1/photos/b.jpg", b"b").unwrap();
        store.put("sightings/s1/photo_0.jpg", b"c").unwrap();

        let listed = store.list("profiles/p1/").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], "profiles/p1/photos/a.jpg");

        store.delete_prefix("profiles/p1/").unwrap();
        assert!(store.list("profiles/p1/").unwrap().is_empty());
        assert_eq!(store.list("sightings/").unwrap().len(), 1);
    }

    #[test]
    fn traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        assert!(store.put("../escape.jpg", b"x").is_err());
    }
}
