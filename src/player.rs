//! Interactive recitation player on the terminal.
//!
//! Keys (one per line): `p` play/pause, `f`/`b` skip forward/back, `r` cycle
//! rate, `s <seconds>` scrub to a position, `q` quit. Ctrl-C tears the
//! session down as well.

use anyhow::{Context, Result, anyhow};
use quran_core::config::AppConfig;
use quran_core::playback::{
    PlaybackIntent, PlaybackNotice, PlaybackSession, PlaybackState, PlayerRegistry, RodioEngine,
};
use quran_core::text_utils::format_time;
use quran_core::{Catalog, FileStore, QuranStorage, SettingsPatch, audio_url};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn run(
    catalog: &Catalog,
    storage: &QuranStorage<FileStore>,
    config: &AppConfig,
    index: &str,
) -> Result<()> {
    let chapter = catalog
        .lookup(index)
        .ok_or_else(|| anyhow!("Unknown chapter {index}"))?;
    let url = audio_url(&config.audio_base_url, chapter.number());
    let settings = storage.get_settings().await;

    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let engine = RodioEngine::spawn(
        PathBuf::from(&config.audio_cache_dir),
        Duration::from_millis(config.status_tick_ms),
        status_tx,
    )
    .context("Failed to start audio engine")?;
    let (session, handle, mut notices) =
        PlaybackSession::new(Box::new(engine), status_rx, settings.playback_speed);
    let mut registry = PlayerRegistry::new();
    registry.register(&chapter.index, &handle);
    let task = tokio::spawn(session.run(url));

    let interrupt = handle.clone();
    if let Err(err) = ctrlc::set_handler(move || interrupt.send(PlaybackIntent::Teardown)) {
        warn!("Failed to install Ctrl-C handler: {err}");
    }

    println!(
        "{} ({})  [p] play/pause  [f/b] ±{}s  [r] rate  [s N] seek  [q] quit",
        chapter.title, chapter.title_ar, config.skip_seconds
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut state_rx = handle.subscribe();
    let mut last_rate = settings.playback_speed;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match parse_key(&line, config.skip_seconds) {
                    Some(Keys::Quit) => break,
                    Some(Keys::Intents(intents)) => {
                        for intent in intents {
                            handle.send(intent);
                        }
                    }
                    None => println!("Unknown key {:?}", line.trim()),
                }
            }
            notice = notices.recv() => match notice {
                Some(PlaybackNotice::PlayingChanged(playing)) => {
                    registry.on_playing_changed(&chapter.index, playing);
                    println!("{}", if playing { "Playing" } else { "Paused" });
                }
                Some(PlaybackNotice::Haptic) => {}
                Some(PlaybackNotice::CommandFailed(reason)) => println!("Player error: {reason}"),
                None => break,
            },
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow_and_update();
                if state.rate != last_rate {
                    last_rate = state.rate;
                    println!("Rate {}", state.rate);
                    if let Err(err) = storage.save_settings(SettingsPatch::playback_speed(state.rate)).await {
                        warn!("Failed to remember playback rate: {err}");
                    }
                }
                debug!(position = %status_line(&state), "Playback state");
            }
        }
    }

    handle.send(PlaybackIntent::Teardown);
    task.await.context("Playback task panicked")?;
    registry.unregister(&chapter.index);
    info!(chapter = %chapter.index, "Player closed");
    Ok(())
}

enum Keys {
    Intents(Vec<PlaybackIntent>),
    Quit,
}

fn parse_key(line: &str, skip_seconds: f64) -> Option<Keys> {
    let mut parts = line.split_whitespace();
    let key = parts.next().unwrap_or("p");
    let intents = match key {
        "p" => vec![PlaybackIntent::TogglePlayPause],
        "f" => vec![PlaybackIntent::Skip(skip_seconds)],
        "b" => vec![PlaybackIntent::Skip(-skip_seconds)],
        "r" => vec![PlaybackIntent::CycleRate],
        "s" => {
            let target: f64 = parts.next()?.parse().ok()?;
            vec![
                PlaybackIntent::BeginScrub,
                PlaybackIntent::UpdateScrub(target),
                PlaybackIntent::CommitScrub(target),
            ]
        }
        "q" => return Some(Keys::Quit),
        _ => return None,
    };
    Some(Keys::Intents(intents))
}

fn status_line(state: &PlaybackState) -> String {
    format!(
        "{} / {}",
        format_time(state.position_seconds),
        format_time(state.duration_seconds)
    )
}
