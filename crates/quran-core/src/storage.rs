//! Bookmark, settings, and last-read persistence over a [`KeyValueStore`].
//!
//! Each record kind lives under one JSON-encoded key and is rewritten in full
//! on every mutation. Reads never fail: a missing key, an unavailable store,
//! or an undecodable blob all degrade to the empty/default value and are
//! logged. Writes return [`StorageError`] so callers can roll back or tell
//! the user.
//!
//! Mutations of the same key are serialized through a per-key async mutex,
//! so concurrent `add_bookmark` calls cannot lose each other's updates.

use crate::kv::{KeyValueStore, KvError};
use crate::models::{Bookmark, LastRead, NewBookmark, Settings, SettingsPatch};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const BOOKMARKS_KEY: &str = "quran_bookmarks";
pub const SETTINGS_KEY: &str = "quran_settings";
pub const LAST_READ_KEY: &str = "quran_last_read";

#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be read while preparing a mutation; nothing was written.
    #[error("failed to load {key} before updating it: {source}")]
    Read {
        key: &'static str,
        #[source]
        source: KvError,
    },
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {key}: {source}")]
    Write {
        key: &'static str,
        #[source]
        source: KvError,
    },
    #[error("failed to clear stored data: {source}")]
    Clear {
        #[source]
        source: KvError,
    },
}

/// Outcome of loading one key.
enum Loaded<T> {
    Value(T),
    Absent,
    /// Present but not decodable; treated as no data.
    Corrupt,
}

pub struct QuranStorage<S> {
    store: S,
    bookmarks_lock: Mutex<()>,
    settings_lock: Mutex<()>,
    last_read_lock: Mutex<()>,
    last_stamp: AtomicI64,
}

impl<S: KeyValueStore> QuranStorage<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            bookmarks_lock: Mutex::new(()),
            settings_lock: Mutex::new(()),
            last_read_lock: Mutex::new(()),
            last_stamp: AtomicI64::new(0),
        }
    }

    /// Bookmarks, newest first. Empty when nothing readable is stored.
    pub async fn list_bookmarks(&self) -> Vec<Bookmark> {
        self.read_or_default(BOOKMARKS_KEY).await.unwrap_or_default()
    }

    /// Store a bookmark unless one already exists for the same chapter and
    /// verse, in which case the existing record is returned untouched.
    pub async fn add_bookmark(&self, candidate: NewBookmark) -> Result<Bookmark, StorageError> {
        let _guard = self.bookmarks_lock.lock().await;
        let mut bookmarks: Vec<Bookmark> = self.load_for_update(BOOKMARKS_KEY).await?;

        if let Some(existing) = bookmarks
            .iter()
            .find(|b| b.matches(&candidate.surah_index, candidate.ayah_number))
        {
            debug!(
                id = %existing.id,
                surah = %candidate.surah_index,
                ayah = candidate.ayah_number,
                "Bookmark already exists"
            );
            return Ok(existing.clone());
        }

        let created_at = self.next_stamp();
        let bookmark = Bookmark {
            id: format!(
                "{}_{}_{}",
                candidate.surah_index, candidate.ayah_number, created_at
            ),
            surah_index: candidate.surah_index,
            surah_title: candidate.surah_title,
            surah_title_ar: candidate.surah_title_ar,
            ayah_number: candidate.ayah_number,
            ayah_text: candidate.ayah_text,
            created_at,
        };
        bookmarks.insert(0, bookmark.clone());
        self.write(BOOKMARKS_KEY, &bookmarks).await?;
        info!(
            id = %bookmark.id,
            total = bookmarks.len(),
            "Added bookmark"
        );
        Ok(bookmark)
    }

    /// Remove the bookmark with `id`. Unknown ids are a no-op.
    pub async fn remove_bookmark(&self, id: &str) -> Result<(), StorageError> {
        let _guard = self.bookmarks_lock.lock().await;
        let mut bookmarks: Vec<Bookmark> = self.load_for_update(BOOKMARKS_KEY).await?;
        let before = bookmarks.len();
        bookmarks.retain(|b| b.id != id);
        if bookmarks.len() == before {
            debug!(id, "Bookmark to remove was not stored");
        }
        self.write(BOOKMARKS_KEY, &bookmarks).await
    }

    pub async fn is_bookmarked(&self, surah_index: &str, ayah_number: u32) -> bool {
        self.list_bookmarks()
            .await
            .iter()
            .any(|b| b.matches(surah_index, ayah_number))
    }

    /// Stored settings merged over defaults.
    pub async fn get_settings(&self) -> Settings {
        let patch: Option<SettingsPatch> = self.read_or_default(SETTINGS_KEY).await;
        match patch {
            Some(patch) => Settings::default().merged(&patch),
            None => Settings::default(),
        }
    }

    /// Merge `patch` over the current settings, persist, and return the result.
    /// Font sizes come back normalized to the slider range (see [`Settings::merged`]).
    pub async fn save_settings(&self, patch: SettingsPatch) -> Result<Settings, StorageError> {
        let _guard = self.settings_lock.lock().await;
        let current: Option<SettingsPatch> = self.load_for_update(SETTINGS_KEY).await?;
        let current = match current {
            Some(stored) => Settings::default().merged(&stored),
            None => Settings::default(),
        };
        let updated = current.merged(&patch);
        self.write(SETTINGS_KEY, &updated).await?;
        debug!(?updated, "Saved settings");
        Ok(updated)
    }

    pub async fn get_last_read(&self) -> Option<LastRead> {
        self.read_or_default(LAST_READ_KEY).await
    }

    /// Overwrite the last-read position with a freshly stamped record.
    pub async fn save_last_read(
        &self,
        surah_index: &str,
        ayah_number: u32,
    ) -> Result<LastRead, StorageError> {
        let _guard = self.last_read_lock.lock().await;
        let last_read = LastRead {
            surah_index: surah_index.to_string(),
            ayah_number,
            timestamp: Utc::now().timestamp_millis(),
        };
        self.write(LAST_READ_KEY, &last_read).await?;
        debug!(surah = surah_index, ayah = ayah_number, "Saved last read");
        Ok(last_read)
    }

    /// Drop bookmarks, settings, and last-read in one batch.
    pub async fn clear_all_data(&self) -> Result<(), StorageError> {
        let _bookmarks = self.bookmarks_lock.lock().await;
        let _settings = self.settings_lock.lock().await;
        let _last_read = self.last_read_lock.lock().await;
        self.store
            .remove(&[BOOKMARKS_KEY, SETTINGS_KEY, LAST_READ_KEY])
            .await
            .map_err(|source| StorageError::Clear { source })?;
        info!("Cleared all stored reading data");
        Ok(())
    }

    async fn load<T: DeserializeOwned>(&self, key: &'static str) -> Result<Loaded<T>, KvError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Loaded::Absent);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Loaded::Value(value)),
            Err(err) => {
                warn!(key, "Discarding undecodable stored value: {err}");
                Ok(Loaded::Corrupt)
            }
        }
    }

    /// Read path: every failure collapses to `None`.
    async fn read_or_default<T: DeserializeOwned>(&self, key: &'static str) -> Option<T> {
        match self.load(key).await {
            Ok(Loaded::Value(value)) => Some(value),
            Ok(Loaded::Absent | Loaded::Corrupt) => None,
            Err(err) => {
                warn!(key, "Reading stored value failed; using default: {err}");
                None
            }
        }
    }

    /// Mutation path: undecodable data is replaced, but an unreadable store
    /// aborts so existing data is never overwritten blind.
    async fn load_for_update<T: DeserializeOwned + Default>(
        &self,
        key: &'static str,
    ) -> Result<T, StorageError> {
        match self.load(key).await {
            Ok(Loaded::Value(value)) => Ok(value),
            Ok(Loaded::Absent | Loaded::Corrupt) => Ok(T::default()),
            Err(source) => Err(StorageError::Read { key, source }),
        }
    }

    async fn write<T: serde::Serialize>(
        &self,
        key: &'static str,
        value: &T,
    ) -> Result<(), StorageError> {
        let encoded =
            serde_json::to_string(value).map_err(|source| StorageError::Encode { key, source })?;
        self.store
            .set(key, encoded)
            .await
            .map_err(|source| StorageError::Write { key, source })
    }

    /// Wall-clock millis, forced strictly increasing for this instance.
    fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last_stamp.load(Ordering::Acquire);
        loop {
            let next = now.max(prev + 1);
            match self.last_stamp.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}
