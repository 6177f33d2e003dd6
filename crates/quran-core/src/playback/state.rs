use super::engine::EngineStatus;
use crate::models::PlaybackSpeed;
use serde::Serialize;
use ts_rs::TS;

/// What the transport controls render. Rebuilt after every event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_loading: bool,
    pub duration_seconds: f64,
    pub position_seconds: f64,
    #[ts(type = "number")]
    pub rate: PlaybackSpeed,
    pub is_scrubbing: bool,
}

/// Transport model for one chapter's player.
#[derive(Debug, Clone)]
pub struct PlaybackModel {
    pub(super) status: EngineStatus,
    /// Locally held position while the user drags the slider.
    pub(super) scrub: Option<f64>,
    pub(super) rate: PlaybackSpeed,
    pub(super) reported_playing: bool,
    pub(super) torn_down: bool,
}

impl PlaybackModel {
    pub fn new(rate: PlaybackSpeed) -> Self {
        Self {
            status: EngineStatus {
                loading: true,
                ..EngineStatus::default()
            },
            scrub: None,
            rate,
            reported_playing: false,
            torn_down: false,
        }
    }

    pub fn rate(&self) -> PlaybackSpeed {
        self.rate
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Known duration, or zero when the engine has not reported a usable one.
    pub fn duration(&self) -> f64 {
        let duration = self.status.duration;
        if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        }
    }

    /// Clamp any requested position into `[0, duration]`.
    pub fn clamp_position(&self, seconds: f64) -> f64 {
        if !seconds.is_finite() {
            return 0.0;
        }
        seconds.clamp(0.0, self.duration())
    }

    pub fn display_position(&self) -> f64 {
        match self.scrub {
            Some(value) => value,
            None => self.clamp_position(self.status.current_time),
        }
    }

    pub fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            is_playing: self.status.playing && !self.torn_down,
            is_loading: self.status.loading,
            duration_seconds: self.duration(),
            position_seconds: self.display_position(),
            rate: self.rate,
            is_scrubbing: self.is_scrubbing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_pins_position_to_zero() {
        let mut model = PlaybackModel::new(PlaybackSpeed::Normal);
        model.status.current_time = 12.0;
        assert_eq!(model.display_position(), 0.0);
        assert_eq!(model.clamp_position(40.0), 0.0);
        assert_eq!(model.clamp_position(f64::NAN), 0.0);
    }

    #[test]
    fn snapshot_reflects_status() {
        let mut model = PlaybackModel::new(PlaybackSpeed::Fast);
        assert!(model.snapshot().is_loading);
        model.status = EngineStatus {
            playing: true,
            loading: false,
            current_time: 30.0,
            duration: 120.0,
        };
        let snapshot = model.snapshot();
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.position_seconds, 30.0);
        assert_eq!(snapshot.duration_seconds, 120.0);
        assert_eq!(snapshot.rate, PlaybackSpeed::Fast);
        assert!(!snapshot.is_scrubbing);
    }
}
