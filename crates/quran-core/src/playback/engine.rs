use async_trait::async_trait;
use thiserror::Error;

/// One push from the engine's status feed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineStatus {
    pub playing: bool,
    pub loading: bool,
    pub current_time: f64,
    /// Zero until the engine knows the length of the stream.
    pub duration: f64,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("audio device unavailable: {0}")]
    Device(String),
    #[error("failed to load {url}: {reason}")]
    Load { url: String, reason: String },
    #[error("nothing loaded")]
    NotLoaded,
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("audio engine stopped")]
    Closed,
}

/// Commands understood by an audio engine. Status flows back separately over
/// the channel the engine was created with.
#[async_trait]
pub trait AudioEngine: Send {
    async fn load(&mut self, url: &str) -> Result<(), EngineError>;
    async fn play(&mut self) -> Result<(), EngineError>;
    async fn pause(&mut self) -> Result<(), EngineError>;
    async fn seek_to(&mut self, seconds: f64) -> Result<(), EngineError>;
    async fn set_rate(&mut self, rate: f32) -> Result<(), EngineError>;
}
