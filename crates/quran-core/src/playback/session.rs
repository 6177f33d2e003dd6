//! Single-task loop that owns one chapter's audio engine.
//!
//! Engine status ticks and user intents arrive on two channels and are
//! drained by one task, so the transport model is never mutated concurrently.
//! Presentation reads [`PlaybackState`] from a watch channel and listens for
//! [`PlaybackNotice`]s.

use super::engine::{AudioEngine, EngineStatus};
use super::state::{PlaybackModel, PlaybackState};
use super::transitions::{PlaybackEvent, PlaybackIntent, TransportAction, transition};
use crate::models::PlaybackSpeed;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Notifications for the host view.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackNotice {
    PlayingChanged(bool),
    Haptic,
    CommandFailed(String),
}

/// Cloneable handle the presentation layer uses to drive a session.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    intents: mpsc::UnboundedSender<PlaybackIntent>,
    state: watch::Receiver<PlaybackState>,
}

impl PlaybackHandle {
    /// Queue an intent. Once the session has ended this is a no-op.
    pub fn send(&self, intent: PlaybackIntent) {
        if self.intents.send(intent).is_err() {
            debug!(?intent, "Playback session already ended; dropping intent");
        }
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.intents.is_closed()
    }

    pub(super) fn intent_sender(&self) -> mpsc::UnboundedSender<PlaybackIntent> {
        self.intents.clone()
    }
}

pub struct PlaybackSession {
    engine: Option<Box<dyn AudioEngine>>,
    model: PlaybackModel,
    status_rx: mpsc::UnboundedReceiver<EngineStatus>,
    intent_rx: mpsc::UnboundedReceiver<PlaybackIntent>,
    state_tx: watch::Sender<PlaybackState>,
    notice_tx: mpsc::UnboundedSender<PlaybackNotice>,
}

impl PlaybackSession {
    /// `status_rx` must be the receiving end of the feed `engine` publishes to.
    pub fn new(
        engine: Box<dyn AudioEngine>,
        status_rx: mpsc::UnboundedReceiver<EngineStatus>,
        rate: PlaybackSpeed,
    ) -> (
        Self,
        PlaybackHandle,
        mpsc::UnboundedReceiver<PlaybackNotice>,
    ) {
        let model = PlaybackModel::new(rate);
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(model.snapshot());
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let session = Self {
            engine: Some(engine),
            model,
            status_rx,
            intent_rx,
            state_tx,
            notice_tx,
        };
        let handle = PlaybackHandle {
            intents: intent_tx,
            state: state_rx,
        };
        (session, handle, notice_rx)
    }

    /// Load `url`, then process events until teardown or until every
    /// handle has been dropped. The engine is released on return.
    pub async fn run(mut self, url: String) {
        info!(url = %url, rate = %self.model.rate(), "Starting playback session");
        if let Some(engine) = self.engine.as_mut() {
            if let Err(err) = engine.load(&url).await {
                warn!(url = %url, "Failed to load recitation: {err}");
                self.notify(PlaybackNotice::CommandFailed(err.to_string()));
            } else if self.model.rate() != PlaybackSpeed::Normal {
                let rate = self.model.rate().multiplier();
                if let Err(err) = engine.set_rate(rate).await {
                    warn!(rate, "Failed to apply initial playback rate: {err}");
                }
            }
        }

        loop {
            let event = tokio::select! {
                Some(status) = self.status_rx.recv() => PlaybackEvent::Status(status),
                intent = self.intent_rx.recv() => {
                    PlaybackEvent::Intent(intent.unwrap_or(PlaybackIntent::Teardown))
                }
            };
            let actions = transition(&mut self.model, event);
            self.apply(actions).await;
            self.state_tx.send_replace(self.model.snapshot());

            if self.model.is_torn_down() {
                break;
            }
        }

        self.engine = None;
        info!("Playback session ended");
    }

    async fn apply(&mut self, actions: Vec<TransportAction>) {
        for action in actions {
            match action {
                TransportAction::PlayingChanged(playing) => {
                    self.notify(PlaybackNotice::PlayingChanged(playing));
                    continue;
                }
                TransportAction::Haptic => {
                    self.notify(PlaybackNotice::Haptic);
                    continue;
                }
                _ => {}
            }

            let Some(engine) = self.engine.as_mut() else {
                debug!(?action, "No engine attached; skipping command");
                continue;
            };
            let result = match action {
                TransportAction::Play => engine.play().await,
                TransportAction::Pause => engine.pause().await,
                TransportAction::SeekTo(seconds) => engine.seek_to(seconds).await,
                TransportAction::SetRate(rate) => engine.set_rate(rate).await,
                TransportAction::PlayingChanged(_) | TransportAction::Haptic => Ok(()),
            };
            if let Err(err) = result {
                warn!(?action, "Audio engine command failed: {err}");
                self.notify(PlaybackNotice::CommandFailed(err.to_string()));
            }
        }
    }

    fn notify(&self, notice: PlaybackNotice) {
        // The host may not be listening; notices are advisory.
        let _ = self.notice_tx.send(notice);
    }
}
