//! Core of the Quran reader: persisted bookmarks, settings and last-read
//! position, the chapter catalog, and recitation playback.

pub mod bindings;
pub mod catalog;
pub mod config;
pub mod kv;
pub mod models;
pub mod playback;
pub mod reader;
pub mod storage;
pub mod text_utils;

pub use bindings::export_ts_bindings;
pub use catalog::{Catalog, CatalogError, Chapter, Place, Verse, audio_url};
pub use kv::{FileStore, KeyValueStore, KvError, MemoryStore};
pub use models::{Bookmark, LastRead, NewBookmark, PlaybackSpeed, Settings, SettingsPatch};
pub use reader::{
    BookmarkList, ChapterView, ReaderError, SettingsPanel, VerseBookmark, VerseView, open_chapter,
};
pub use storage::{QuranStorage, StorageError};
