use super::{KeyValueStore, KvError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-local store. Reads and writes can be switched to fail, which is how
/// the storage layer's failure paths are exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Raw value for `key`, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().ok()?.get(key).cloned()
    }

    /// Write a raw value, bypassing failure injection.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, KvError> {
        self.entries
            .lock()
            .map_err(|_| KvError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        if self.fail_reads.load(Ordering::Acquire) {
            return Err(KvError::Unavailable(format!("read of {key} refused")));
        }
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(KvError::Unavailable(format!("write of {key} refused")));
        }
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), KvError> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(KvError::Unavailable("remove refused".to_string()));
        }
        let mut entries = self.lock()?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.set("a", "1".to_string()).await.unwrap();
        store.set("b", "2".to_string()).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        store.remove(&["a", "b", "missing"]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn injected_failures_only_affect_their_path() {
        let store = MemoryStore::new();
        store.insert_raw("k", "v");
        store.set_fail_writes(true);
        assert!(store.set("k", "w".to_string()).await.is_err());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.set_fail_reads(true);
        assert!(store.get("k").await.is_err());
        assert_eq!(store.raw("k").as_deref(), Some("v"));
    }
}
