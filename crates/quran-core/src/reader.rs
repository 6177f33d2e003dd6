//! Presentation-independent controllers for the reading screens.
//!
//! Each controller keeps the value a view renders and talks to
//! [`QuranStorage`] for persistence. When a toggle, removal or settings
//! write fails the error is returned and the bookmark state on screen stays
//! as it was.

use crate::catalog::{Catalog, Chapter, audio_url};
use crate::kv::KeyValueStore;
use crate::models::{Bookmark, LastRead, NewBookmark, Settings, SettingsPatch};
use crate::storage::{QuranStorage, StorageError};
use crate::text_utils::preview;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("unknown chapter {0}")]
    UnknownChapter(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerseView {
    pub number: u32,
    pub text: String,
    /// Present only when translations are enabled and one is available.
    pub translation: Option<String>,
}

/// Everything the chapter screen needs after opening a chapter.
#[derive(Debug, Clone)]
pub struct ChapterView {
    pub chapter: Chapter,
    pub verses: Vec<VerseView>,
    pub shows_bismillah: bool,
    pub audio_url: String,
    pub settings: Settings,
    pub last_read: Option<LastRead>,
}

/// Look up `index`, record it as the last-read position at verse 1, and
/// build the view. A failed last-read write is logged and otherwise ignored.
pub async fn open_chapter<S: KeyValueStore>(
    catalog: &Catalog,
    storage: &QuranStorage<S>,
    index: &str,
    audio_base_url: &str,
) -> Result<ChapterView, ReaderError> {
    let chapter = catalog
        .lookup(index)
        .cloned()
        .ok_or_else(|| ReaderError::UnknownChapter(index.to_string()))?;

    let last_read = match storage.save_last_read(&chapter.index, 1).await {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(chapter = %chapter.index, "Failed to record last read: {err}");
            None
        }
    };
    let settings = storage.get_settings().await;

    let verses = chapter
        .verses()
        .into_iter()
        .map(|verse| VerseView {
            translation: settings
                .show_translation
                .then(|| chapter.translation(verse.number).map(str::to_string))
                .flatten(),
            number: verse.number,
            text: verse.text,
        })
        .collect();

    info!(
        chapter = %chapter.index,
        title = %chapter.title,
        verses = chapter.verse_count,
        "Opened chapter"
    );
    Ok(ChapterView {
        shows_bismillah: chapter.shows_bismillah(),
        audio_url: audio_url(audio_base_url, chapter.number()),
        verses,
        settings,
        last_read,
        chapter,
    })
}

/// Bookmark toggle for a single verse card.
pub struct VerseBookmark<'a, S> {
    storage: &'a QuranStorage<S>,
    candidate: NewBookmark,
    /// Id of the stored bookmark while the verse is bookmarked.
    bookmark_id: Option<String>,
}

impl<'a, S: KeyValueStore> VerseBookmark<'a, S> {
    /// The stored preview of `text` is cut to `preview_chars` characters.
    pub fn new(
        storage: &'a QuranStorage<S>,
        chapter: &Chapter,
        verse_number: u32,
        text: &str,
        preview_chars: usize,
    ) -> Self {
        Self {
            storage,
            candidate: NewBookmark {
                surah_index: chapter.index.clone(),
                surah_title: chapter.title.clone(),
                surah_title_ar: chapter.title_ar.clone(),
                ayah_number: verse_number,
                ayah_text: preview(text, preview_chars),
            },
            bookmark_id: None,
        }
    }

    pub fn is_bookmarked(&self) -> bool {
        self.bookmark_id.is_some()
    }

    pub async fn refresh(&mut self) -> bool {
        self.bookmark_id = self
            .storage
            .list_bookmarks()
            .await
            .into_iter()
            .find(|b| b.matches(&self.candidate.surah_index, self.candidate.ayah_number))
            .map(|b| b.id);
        self.is_bookmarked()
    }

    /// Flip the bookmark. Returns the new state, or the storage error with
    /// the previous state left in place.
    pub async fn toggle(&mut self) -> Result<bool, StorageError> {
        let result = match self.bookmark_id.clone() {
            Some(id) => self.storage.remove_bookmark(&id).await.map(|()| None),
            None => self
                .storage
                .add_bookmark(self.candidate.clone())
                .await
                .map(|bookmark| Some(bookmark.id)),
        };
        match result {
            Ok(bookmark_id) => {
                self.bookmark_id = bookmark_id;
                debug!(
                    surah = %self.candidate.surah_index,
                    ayah = self.candidate.ayah_number,
                    bookmarked = self.is_bookmarked(),
                    "Toggled bookmark"
                );
                Ok(self.is_bookmarked())
            }
            Err(err) => {
                warn!(
                    surah = %self.candidate.surah_index,
                    ayah = self.candidate.ayah_number,
                    "Bookmark toggle failed: {err}"
                );
                Err(err)
            }
        }
    }
}

/// In-memory settings backing the settings screen.
pub struct SettingsPanel<'a, S> {
    storage: &'a QuranStorage<S>,
    settings: Settings,
}

impl<'a, S: KeyValueStore> SettingsPanel<'a, S> {
    pub async fn load(storage: &'a QuranStorage<S>) -> Self {
        let settings = storage.get_settings().await;
        Self { storage, settings }
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Apply `patch` locally, then persist. The local value stays applied
    /// even when persisting fails.
    pub async fn change(&mut self, patch: SettingsPatch) -> Result<Settings, StorageError> {
        self.settings = self.settings.merged(&patch);
        match self.storage.save_settings(patch).await {
            Ok(saved) => {
                self.settings = saved;
                Ok(saved)
            }
            Err(err) => {
                warn!("Settings change kept in memory only: {err}");
                Err(err)
            }
        }
    }

    /// Wipe all stored data and reload settings, which are then the defaults.
    pub async fn clear_all(&mut self) -> Result<(), StorageError> {
        self.storage.clear_all_data().await?;
        self.settings = self.storage.get_settings().await;
        Ok(())
    }
}

/// Bookmarks screen.
pub struct BookmarkList<'a, S> {
    storage: &'a QuranStorage<S>,
    bookmarks: Vec<Bookmark>,
}

impl<'a, S: KeyValueStore> BookmarkList<'a, S> {
    pub fn new(storage: &'a QuranStorage<S>) -> Self {
        Self {
            storage,
            bookmarks: Vec::new(),
        }
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub async fn refresh(&mut self) -> &[Bookmark] {
        self.bookmarks = self.storage.list_bookmarks().await;
        &self.bookmarks
    }

    /// Drop `id` from the list immediately; put it back if the store refuses.
    pub async fn remove(&mut self, id: &str) -> Result<(), StorageError> {
        let removed = self
            .bookmarks
            .iter()
            .position(|b| b.id == id)
            .map(|pos| (pos, self.bookmarks.remove(pos)));
        if let Err(err) = self.storage.remove_bookmark(id).await {
            if let Some((pos, bookmark)) = removed {
                self.bookmarks.insert(pos, bookmark);
            }
            warn!(id, "Bookmark removal failed: {err}");
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TEST_CATALOG;
    use crate::kv::MemoryStore;
    use std::sync::Arc;

    const BASE: &str = "https://cdn.example/audio";

    fn setup() -> (Catalog, Arc<MemoryStore>, QuranStorage<Arc<MemoryStore>>) {
        let catalog = Catalog::from_json(TEST_CATALOG).unwrap();
        let store = Arc::new(MemoryStore::new());
        let storage = QuranStorage::new(Arc::clone(&store));
        (catalog, store, storage)
    }

    #[tokio::test]
    async fn opening_a_chapter_records_last_read() {
        let (catalog, _store, storage) = setup();
        let view = open_chapter(&catalog, &storage, "112", BASE).await.unwrap();
        assert!(view.shows_bismillah);
        assert_eq!(view.audio_url, "https://cdn.example/audio/112.mp3");
        assert_eq!(view.verses.len(), 2);

        let last = storage.get_last_read().await.unwrap();
        assert_eq!(last.surah_index, "112");
        assert_eq!(last.ayah_number, 1);
        assert_eq!(view.last_read, Some(last));
    }

    #[tokio::test]
    async fn opening_a_chapter_survives_write_failure() {
        let (catalog, store, storage) = setup();
        store.set_fail_writes(true);
        let view = open_chapter(&catalog, &storage, "001", BASE).await.unwrap();
        assert!(view.last_read.is_none());
        assert!(!view.shows_bismillah);
        assert!(matches!(
            open_chapter(&catalog, &storage, "404", BASE).await,
            Err(ReaderError::UnknownChapter(_))
        ));
    }

    #[tokio::test]
    async fn translations_follow_settings() {
        let (catalog, _store, storage) = setup();
        let view = open_chapter(&catalog, &storage, "001", BASE).await.unwrap();
        assert!(view.verses[0].translation.is_some());

        storage
            .save_settings(SettingsPatch::show_translation(false))
            .await
            .unwrap();
        let view = open_chapter(&catalog, &storage, "001", BASE).await.unwrap();
        assert!(view.verses.iter().all(|v| v.translation.is_none()));
    }

    #[tokio::test]
    async fn toggle_adds_then_removes() {
        let (catalog, _store, storage) = setup();
        let chapter = catalog.lookup("112").unwrap();
        let mut card = VerseBookmark::new(&storage, chapter, 1, "قُلْ هُوَ اللَّهُ أَحَدٌ", 5);
        assert!(!card.refresh().await);

        assert!(card.toggle().await.unwrap());
        let stored = storage.list_bookmarks().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].ayah_text.chars().count(), 5);
        assert_eq!(stored[0].surah_title, "Al-Ikhlas");

        assert!(!card.toggle().await.unwrap());
        assert!(storage.list_bookmarks().await.is_empty());
    }

    #[tokio::test]
    async fn failed_toggle_rolls_back() {
        let (catalog, store, storage) = setup();
        let chapter = catalog.lookup("112").unwrap();
        let mut card = VerseBookmark::new(&storage, chapter, 2, "اللَّهُ الصَّمَدُ", 100);
        store.set_fail_writes(true);
        assert!(card.toggle().await.is_err());
        assert!(!card.is_bookmarked());
        assert!(storage.list_bookmarks().await.is_empty());
    }

    #[tokio::test]
    async fn unreadable_store_keeps_bookmark_on_toggle() {
        let (catalog, store, storage) = setup();
        let chapter = catalog.lookup("112").unwrap();
        let mut card = VerseBookmark::new(&storage, chapter, 1, "قُلْ هُوَ اللَّهُ أَحَدٌ", 100);
        assert!(card.toggle().await.unwrap());

        store.set_fail_reads(true);
        assert!(matches!(card.toggle().await, Err(StorageError::Read { .. })));
        assert!(card.is_bookmarked());

        store.set_fail_reads(false);
        assert_eq!(storage.list_bookmarks().await.len(), 1);
        assert!(!card.toggle().await.unwrap());
        assert!(storage.list_bookmarks().await.is_empty());
    }

    #[tokio::test]
    async fn refreshed_card_removes_existing_bookmark() {
        let (catalog, _store, storage) = setup();
        let chapter = catalog.lookup("001").unwrap();
        VerseBookmark::new(&storage, chapter, 2, "text", 100)
            .toggle()
            .await
            .unwrap();

        let mut card = VerseBookmark::new(&storage, chapter, 2, "text", 100);
        assert!(!card.is_bookmarked());
        assert!(card.refresh().await);
        assert!(!card.toggle().await.unwrap());
        assert!(storage.list_bookmarks().await.is_empty());
    }

    #[tokio::test]
    async fn settings_change_stays_local_when_write_fails() {
        let (_catalog, store, storage) = setup();
        let mut panel = SettingsPanel::load(&storage).await;
        assert_eq!(panel.settings(), Settings::default());

        store.set_fail_writes(true);
        let patch = SettingsPatch {
            arabic_font_size: Some(30),
            ..SettingsPatch::default()
        };
        assert!(panel.change(patch).await.is_err());
        assert_eq!(panel.settings().arabic_font_size, 30);
        assert_eq!(storage.get_settings().await.arabic_font_size, 24);

        store.set_fail_writes(false);
        panel.change(patch).await.unwrap();
        panel.clear_all().await.unwrap();
        assert_eq!(panel.settings(), Settings::default());
    }

    #[tokio::test]
    async fn bookmark_removal_rolls_back_on_failure() {
        let (catalog, store, storage) = setup();
        let chapter = catalog.lookup("001").unwrap();
        for verse in [1, 2] {
            VerseBookmark::new(&storage, chapter, verse, "text", 100)
                .toggle()
                .await
                .unwrap();
        }
        let mut list = BookmarkList::new(&storage);
        let ids: Vec<String> = list.refresh().await.iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids.len(), 2);

        store.set_fail_writes(true);
        assert!(list.remove(&ids[1]).await.is_err());
        assert_eq!(list.bookmarks().len(), 2);
        assert_eq!(list.bookmarks()[1].id, ids[1]);

        store.set_fail_writes(false);
        list.remove(&ids[1]).await.unwrap();
        assert_eq!(list.bookmarks().len(), 1);
        assert_eq!(storage.list_bookmarks().await.len(), 1);
    }
}
