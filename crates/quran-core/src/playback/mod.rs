//! Recitation playback: engine seam, scrub-aware transport model, and the
//! session loop that connects them.

mod engine;
mod registry;
mod rodio_engine;
mod session;
mod state;
mod transitions;

pub use engine::{AudioEngine, EngineError, EngineStatus};
pub use registry::PlayerRegistry;
pub use rodio_engine::RodioEngine;
pub use session::{PlaybackHandle, PlaybackNotice, PlaybackSession};
pub use state::{PlaybackModel, PlaybackState};
pub use transitions::{PlaybackEvent, PlaybackIntent, TransportAction, transition};
