use super::session::PlaybackHandle;
use super::transitions::PlaybackIntent;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// Keeps at most one chapter's player audible: when one session starts
/// playing, every other registered session is asked to pause.
///
/// Only weak senders are held, so registering a session does not keep it
/// alive once the host drops its handles.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<String, mpsc::WeakUnboundedSender<PlaybackIntent>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, chapter_index: &str, handle: &PlaybackHandle) {
        self.players
            .insert(chapter_index.to_string(), handle.intent_sender().downgrade());
    }

    pub fn unregister(&mut self, chapter_index: &str) {
        self.players.remove(chapter_index);
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Feed a session's play-state notice. Returns how many other players
    /// were asked to pause. Sessions that already ended are forgotten.
    pub fn on_playing_changed(&mut self, chapter_index: &str, playing: bool) -> usize {
        self.players
            .retain(|_, sender| sender.upgrade().is_some_and(|live| !live.is_closed()));
        if !playing {
            return 0;
        }
        let mut paused = 0;
        for (index, sender) in &self.players {
            if index == chapter_index {
                continue;
            }
            let Some(sender) = sender.upgrade() else {
                continue;
            };
            if sender.send(PlaybackIntent::Pause).is_ok() {
                debug!(active = chapter_index, paused = %index, "Pausing other player");
                paused += 1;
            }
        }
        paused
    }
}
