//! Asynchronous string key-value capability used for all local persistence.
//!
//! Only [`crate::storage::QuranStorage`] talks to a store; nothing else in the
//! crate reads or writes keys directly.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error on key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` when the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    async fn set(&self, key: &str, value: String) -> Result<(), KvError>;

    /// Remove every key in one request. Absent keys are ignored.
    async fn remove(&self, keys: &[&str]) -> Result<(), KvError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), KvError> {
        (**self).remove(keys).await
    }
}
