//! Object storage contract for uploaded files and trained model artifacts,
//! plus a filesystem-backed reference adapter.

use aegis_types::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Content-addressed object storage keyed by an opaque string path
/// (`uploads/YYYY/MM/DD/<id>`, `models/<modelId>/<version>/...`).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write `bytes` to `key`, creating any intermediate segments.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
    /// Read the bytes stored at `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    /// Remove the object at `key`, idempotently.
    async fn delete(&self, key: &str) -> Result<()>;
    /// List every key stored under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Filesystem-backed [`ObjectStorage`] rooted at a single directory.
pub struct FilesystemObjectStorage {
    root: PathBuf,
}

impl FilesystemObjectStorage {
    /// Construct a storage adapter rooted at `root`. The directory is
    /// created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStorage for FilesystemObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Transient(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::Transient(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key);
        tokio::fs::read(&path)
            .await
            .map_err(|_| Error::not_found("object", key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Transient(e.to_string())),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.resolve(prefix);
        let mut keys = Vec::new();
        collect_keys(&self.root, &dir, &mut keys).await?;
        Ok(keys)
    }
}

async fn collect_keys(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::Transient(e.to_string())),
    };
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::Transient(e.to_string()))?
    {
        let path = entry.path();
        if path.is_dir() {
            Box::pin(collect_keys(root, &path, out)).await?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn scratch_dir(label: &str) -> PathBuf {
        let n = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("aegis-object-storage-test-{label}-{}-{n}", std::process::id()))
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = scratch_dir("roundtrip");
        let storage = FilesystemObjectStorage::new(&dir);
        storage.put("uploads/2026/07/28/u1", b"hello".to_vec()).await.unwrap();
        let bytes = storage.get("uploads/2026/07/28/u1").await.unwrap();
        assert_eq!(bytes, b"hello");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let dir = scratch_dir("missing");
        let storage = FilesystemObjectStorage::new(&dir);
        let err = storage.get("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_returns_keys_under_prefix() {
        let dir = scratch_dir("list");
        let storage = FilesystemObjectStorage::new(&dir);
        storage.put("models/m1/v1/weights.bin", b"w".to_vec()).await.unwrap();
        storage.put("models/m1/v2/weights.bin", b"w2".to_vec()).await.unwrap();
        let mut keys = storage.list("models/m1").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["models/m1/v1/weights.bin", "models/m1/v2/weights.bin"]);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
