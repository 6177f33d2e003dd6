//! Command-line host for the Quran reader core.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Wire the core to a file-backed store, the chapter catalog, and the
//!   `rodio` audio engine, then run the requested command.

mod player;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use quran_core::config::{AppConfig, load_config};
use quran_core::{
    BookmarkList, Catalog, FileStore, PlaybackSpeed, QuranStorage, SettingsPanel, SettingsPatch,
    VerseBookmark, open_chapter,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;
type Storage = QuranStorage<FileStore>;

#[derive(Parser)]
#[command(name = "quran-reader")]
#[command(about = "Read, bookmark, and listen to Quran chapters")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "conf/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List chapters, optionally filtered by title or number
    Chapters { query: Option<String> },
    /// Print a chapter and remember it as the last read
    Read { chapter: String },
    /// Toggle the bookmark on one verse
    Bookmark { chapter: String, verse: u32 },
    /// List bookmarks, newest first
    Bookmarks {
        #[arg(long)]
        json: bool,
    },
    /// Remove a bookmark by id
    Unbookmark { id: String },
    /// Show settings, or change them with the flags below
    Settings {
        #[arg(long)]
        arabic_font_size: Option<u32>,
        #[arg(long)]
        translation_font_size: Option<u32>,
        #[arg(long)]
        show_translation: Option<bool>,
        /// One of 0.75, 1, 1.25, 1.5
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Show where reading last stopped
    LastRead,
    /// Delete bookmarks, settings, and last read
    Clear,
    /// Play a chapter's recitation with interactive transport keys
    Play { chapter: String },
}

fn main() {
    let reload_handle = init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli, &reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, reload_handle: &ReloadHandle) -> Result<()> {
    let config = load_config(&cli.config).sanitized();
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        data_dir = %config.data_dir,
        catalog = %config.catalog_path,
        level = %config.log_level,
        "Starting Quran reader"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let storage = QuranStorage::new(FileStore::new(&config.data_dir));
    let result = runtime.block_on(dispatch(cli.command, &config, &storage));
    // Stdin reads may still be parked on a blocking thread.
    runtime.shutdown_background();
    result
}

async fn dispatch(command: Command, config: &AppConfig, storage: &Storage) -> Result<()> {
    match command {
        Command::Chapters { query } => {
            let catalog = load_catalog(config)?;
            let query = query.unwrap_or_default();
            for chapter in catalog.search(&query) {
                println!(
                    "{}  {:<18} {:>12}  {} verses, {}",
                    chapter.index, chapter.title, chapter.title_ar, chapter.verse_count, chapter.place
                );
            }
        }
        Command::Read { chapter } => {
            let catalog = load_catalog(config)?;
            let view = open_chapter(
                &catalog,
                storage,
                &normalize_index(&chapter),
                &config.audio_base_url,
            )
            .await?;
            let marked = storage.list_bookmarks().await;
            println!("{} ({})  {}", view.chapter.title, view.chapter.place, view.chapter.title_ar);
            if view.shows_bismillah {
                println!("بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ");
            }
            for verse in &view.verses {
                let flag = if marked.iter().any(|b| b.matches(&view.chapter.index, verse.number)) {
                    "*"
                } else {
                    " "
                };
                println!("{flag}{:>3}. {}", verse.number, verse.text);
                if let Some(translation) = &verse.translation {
                    println!("      {translation}");
                }
            }
        }
        Command::Bookmark { chapter, verse } => {
            let catalog = load_catalog(config)?;
            let index = normalize_index(&chapter);
            let chapter = catalog
                .lookup(&index)
                .ok_or_else(|| anyhow!("Unknown chapter {index}"))?;
            let text = chapter
                .verse_text(verse)
                .ok_or_else(|| anyhow!("Chapter {index} has no verse {verse}"))?;
            let mut card =
                VerseBookmark::new(storage, chapter, verse, text, config.bookmark_preview_chars);
            card.refresh().await;
            let bookmarked = card
                .toggle()
                .await
                .context("Could not update bookmark")?;
            println!(
                "{} {}:{}",
                if bookmarked { "Bookmarked" } else { "Removed bookmark" },
                index,
                verse
            );
        }
        Command::Bookmarks { json } => {
            let mut list = BookmarkList::new(storage);
            let bookmarks = list.refresh().await;
            if json {
                println!("{}", serde_json::to_string_pretty(bookmarks)?);
            } else if bookmarks.is_empty() {
                println!("No bookmarks yet");
            } else {
                for bookmark in bookmarks {
                    println!(
                        "{}  {} {}:{}  {}",
                        bookmark.id,
                        bookmark.surah_title,
                        bookmark.surah_index,
                        bookmark.ayah_number,
                        bookmark.ayah_text
                    );
                }
            }
        }
        Command::Unbookmark { id } => {
            let mut list = BookmarkList::new(storage);
            list.refresh().await;
            list.remove(&id).await.context("Could not remove bookmark")?;
            println!("Removed {id}");
        }
        Command::Settings {
            arabic_font_size,
            translation_font_size,
            show_translation,
            speed,
        } => {
            let playback_speed = match speed {
                Some(value) => Some(
                    PlaybackSpeed::from_multiplier(value)
                        .ok_or_else(|| anyhow!("Unsupported speed {value}"))?,
                ),
                None => None,
            };
            let patch = SettingsPatch {
                arabic_font_size,
                translation_font_size,
                show_translation,
                playback_speed,
            };
            let mut panel = SettingsPanel::load(storage).await;
            if patch != SettingsPatch::default() {
                panel.change(patch).await.context("Could not save settings")?;
            }
            println!("{}", serde_json::to_string_pretty(&panel.settings())?);
        }
        Command::LastRead => match storage.get_last_read().await {
            Some(last) => println!("{}", serde_json::to_string_pretty(&last)?),
            None => println!("Nothing read yet"),
        },
        Command::Clear => {
            let mut panel = SettingsPanel::load(storage).await;
            panel.clear_all().await.context("Could not clear data")?;
            println!("Cleared bookmarks, settings, and last read");
        }
        Command::Play { chapter } => {
            let catalog = load_catalog(config)?;
            player::run(&catalog, storage, config, &normalize_index(&chapter)).await?;
        }
    }
    Ok(())
}

fn load_catalog(config: &AppConfig) -> Result<Catalog> {
    Catalog::load(Path::new(&config.catalog_path))
        .with_context(|| format!("Failed to load catalog {}", config.catalog_path))
}

/// Accept `2` as well as `002`.
fn normalize_index(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<u32>() {
        Ok(number) => format!("{number:03}"),
        Err(_) => trimmed.to_string(),
    }
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_numbers_are_zero_padded() {
        assert_eq!(normalize_index("2"), "002");
        assert_eq!(normalize_index(" 112 "), "112");
        assert_eq!(normalize_index("fatiha"), "fatiha");
    }

    #[test]
    fn cli_parses_settings_flags() {
        let cli = Cli::try_parse_from([
            "quran-reader",
            "settings",
            "--arabic-font-size",
            "30",
            "--speed",
            "1.25",
        ])
        .unwrap();
        match cli.command {
            Command::Settings {
                arabic_font_size,
                speed,
                ..
            } => {
                assert_eq!(arabic_font_size, Some(30));
                assert_eq!(speed, Some(1.25));
            }
            _ => panic!("expected settings command"),
        }
        assert_eq!(cli.config, PathBuf::from("conf/config.toml"));
    }
}
