//! File-backed store: one file per key under a root directory.
//!
//! File names are the SHA-256 of the key so arbitrary keys never turn into
//! awkward paths. Values are written to a sibling temp file and renamed into
//! place, so a crash mid-write leaves the previous value intact.

use super::{KeyValueStore, KvError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.root.join(format!("{hash}.json"))
    }
}

fn io_error(key: &str, source: std::io::Error) -> KvError {
    KvError::Io {
        key: key.to_string(),
        source,
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(key, err)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| io_error(key, err))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value.as_bytes())
            .await
            .map_err(|err| io_error(key, err))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|err| io_error(key, err))?;
        debug!(key, path = %path.display(), "Persisted key");
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), KvError> {
        for key in keys {
            match tokio::fs::remove_file(self.path_for(key)).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(io_error(key, err)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_a_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("kv"));
        store.set("quran_settings", "{}".to_string()).await.unwrap();

        let reopened = FileStore::new(dir.path().join("kv"));
        assert_eq!(
            reopened.get("quran_settings").await.unwrap().as_deref(),
            Some("{}")
        );
    }

    #[tokio::test]
    async fn missing_keys_read_as_none_and_remove_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.get("nothing").await.unwrap(), None);
        store.remove(&["nothing", "else"]).await.unwrap();

        store.set("k", "v".to_string()).await.unwrap();
        store.remove(&["k"]).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[test]
    fn file_names_are_hashed() {
        let store = FileStore::new("/tmp/root");
        let path = store.path_for("../escape");
        assert_eq!(path.parent(), Some(Path::new("/tmp/root")));
        assert!(!path.to_string_lossy().contains(".."));
    }
}
