use super::engine::EngineStatus;
use super::state::PlaybackModel;
use crate::models::PlaybackSpeed;
use tracing::{debug, info};

/// User intents coming from the transport controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackIntent {
    Play,
    Pause,
    TogglePlayPause,
    BeginScrub,
    UpdateScrub(f64),
    CommitScrub(f64),
    CycleRate,
    SetRate(PlaybackSpeed),
    /// Relative jump, e.g. ±10 seconds.
    Skip(f64),
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Status(EngineStatus),
    Intent(PlaybackIntent),
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportAction {
    Play,
    Pause,
    SeekTo(f64),
    SetRate(f32),
    /// Tactile acknowledgement of a control press.
    Haptic,
    PlayingChanged(bool),
}

pub fn transition(model: &mut PlaybackModel, event: PlaybackEvent) -> Vec<TransportAction> {
    if model.torn_down {
        debug!(?event, "Ignoring playback event after teardown");
        return Vec::new();
    }
    match event {
        PlaybackEvent::Status(status) => on_status(model, status),
        PlaybackEvent::Intent(intent) => on_intent(model, intent),
    }
}

fn on_status(model: &mut PlaybackModel, status: EngineStatus) -> Vec<TransportAction> {
    model.status = status;
    if status.playing == model.reported_playing {
        return Vec::new();
    }
    model.reported_playing = status.playing;
    debug!(playing = status.playing, "Engine play state changed");
    vec![TransportAction::PlayingChanged(status.playing)]
}

fn on_intent(model: &mut PlaybackModel, intent: PlaybackIntent) -> Vec<TransportAction> {
    match intent {
        PlaybackIntent::Play => {
            if model.status.loading || model.status.playing {
                return Vec::new();
            }
            vec![TransportAction::Haptic, TransportAction::Play]
        }
        PlaybackIntent::Pause => {
            if model.status.loading || !model.status.playing {
                return Vec::new();
            }
            vec![TransportAction::Haptic, TransportAction::Pause]
        }
        PlaybackIntent::TogglePlayPause => {
            if model.status.loading {
                return Vec::new();
            }
            let command = if model.status.playing {
                TransportAction::Pause
            } else {
                TransportAction::Play
            };
            vec![TransportAction::Haptic, command]
        }
        PlaybackIntent::BeginScrub => {
            model.scrub = Some(model.display_position());
            Vec::new()
        }
        PlaybackIntent::UpdateScrub(value) => {
            if model.scrub.is_some() {
                model.scrub = Some(model.clamp_position(value));
            }
            Vec::new()
        }
        PlaybackIntent::CommitScrub(value) => {
            let target = model.clamp_position(value);
            model.scrub = None;
            vec![TransportAction::SeekTo(target)]
        }
        PlaybackIntent::CycleRate => {
            model.rate = model.rate.next();
            info!(rate = %model.rate, "Cycled playback rate");
            vec![
                TransportAction::Haptic,
                TransportAction::SetRate(model.rate.multiplier()),
            ]
        }
        PlaybackIntent::SetRate(rate) => {
            if rate == model.rate {
                return Vec::new();
            }
            model.rate = rate;
            vec![TransportAction::SetRate(rate.multiplier())]
        }
        PlaybackIntent::Skip(delta) => {
            let delta = if delta.is_finite() { delta } else { 0.0 };
            let target = model.clamp_position(model.display_position() + delta);
            vec![TransportAction::Haptic, TransportAction::SeekTo(target)]
        }
        PlaybackIntent::Teardown => {
            model.torn_down = true;
            model.scrub = None;
            if model.reported_playing {
                model.reported_playing = false;
                return vec![TransportAction::PlayingChanged(false)];
            }
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(playing: bool, current_time: f64, duration: f64) -> PlaybackModel {
        let mut model = PlaybackModel::new(PlaybackSpeed::Normal);
        transition(
            &mut model,
            PlaybackEvent::Status(EngineStatus {
                playing,
                loading: false,
                current_time,
                duration,
            }),
        );
        model
    }

    fn intent(model: &mut PlaybackModel, intent: PlaybackIntent) -> Vec<TransportAction> {
        transition(model, PlaybackEvent::Intent(intent))
    }

    fn seeks(actions: &[TransportAction]) -> Vec<f64> {
        actions
            .iter()
            .filter_map(|action| match action {
                TransportAction::SeekTo(target) => Some(*target),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn play_and_pause_follow_engine_state() {
        let mut model = ready(false, 0.0, 60.0);
        assert_eq!(
            intent(&mut model, PlaybackIntent::Play),
            vec![TransportAction::Haptic, TransportAction::Play]
        );
        assert!(intent(&mut model, PlaybackIntent::Pause).is_empty());

        let mut playing = ready(true, 5.0, 60.0);
        assert!(intent(&mut playing, PlaybackIntent::Play).is_empty());
        assert_eq!(
            intent(&mut playing, PlaybackIntent::TogglePlayPause),
            vec![TransportAction::Haptic, TransportAction::Pause]
        );
    }

    #[test]
    fn loading_suppresses_play_pause_but_not_scrub_display() {
        let mut model = PlaybackModel::new(PlaybackSpeed::Normal);
        transition(
            &mut model,
            PlaybackEvent::Status(EngineStatus {
                playing: false,
                loading: true,
                current_time: 10.0,
                duration: 100.0,
            }),
        );
        assert!(intent(&mut model, PlaybackIntent::Play).is_empty());
        assert!(intent(&mut model, PlaybackIntent::TogglePlayPause).is_empty());

        intent(&mut model, PlaybackIntent::BeginScrub);
        intent(&mut model, PlaybackIntent::UpdateScrub(42.0));
        assert_eq!(model.display_position(), 42.0);
    }

    #[test]
    fn scrub_only_seeks_on_commit() {
        let mut model = ready(true, 20.0, 200.0);
        let mut actions = intent(&mut model, PlaybackIntent::BeginScrub);
        assert_eq!(model.display_position(), 20.0);

        actions.extend(intent(&mut model, PlaybackIntent::UpdateScrub(50.0)));
        assert_eq!(model.display_position(), 50.0);

        // Engine ticks during the drag do not move the displayed position.
        actions.extend(transition(
            &mut model,
            PlaybackEvent::Status(EngineStatus {
                playing: true,
                loading: false,
                current_time: 21.0,
                duration: 200.0,
            }),
        ));
        assert_eq!(model.display_position(), 50.0);

        actions.extend(intent(&mut model, PlaybackIntent::UpdateScrub(75.0)));
        assert_eq!(model.display_position(), 75.0);

        actions.extend(intent(&mut model, PlaybackIntent::CommitScrub(90.0)));
        assert_eq!(seeks(&actions), vec![90.0]);
        assert!(!model.is_scrubbing());

        transition(
            &mut model,
            PlaybackEvent::Status(EngineStatus {
                playing: true,
                loading: false,
                current_time: 90.0,
                duration: 200.0,
            }),
        );
        assert_eq!(model.display_position(), 90.0);
    }

    #[test]
    fn scrub_values_are_clamped() {
        let mut model = ready(false, 0.0, 30.0);
        intent(&mut model, PlaybackIntent::BeginScrub);
        intent(&mut model, PlaybackIntent::UpdateScrub(99.0));
        assert_eq!(model.display_position(), 30.0);
        let actions = intent(&mut model, PlaybackIntent::CommitScrub(-4.0));
        assert_eq!(seeks(&actions), vec![0.0]);
    }

    #[test]
    fn update_without_begin_is_ignored() {
        let mut model = ready(false, 12.0, 30.0);
        intent(&mut model, PlaybackIntent::UpdateScrub(25.0));
        assert_eq!(model.display_position(), 12.0);
        assert!(!model.is_scrubbing());
    }

    #[test]
    fn skip_is_clamped_into_duration() {
        for (position, duration, delta) in [
            (5.0, 60.0, -10.0),
            (55.0, 60.0, 10.0),
            (30.0, 60.0, 10.0),
            (0.0, 0.0, 10.0),
            (0.0, 0.0, -10.0),
            (12.0, 60.0, f64::INFINITY),
        ] {
            let mut model = ready(true, position, duration);
            let targets = seeks(&intent(&mut model, PlaybackIntent::Skip(delta)));
            assert_eq!(targets.len(), 1);
            assert!(
                (0.0..=duration).contains(&targets[0]),
                "target {} outside [0, {duration}]",
                targets[0]
            );
        }

        let mut model = ready(true, 30.0, 60.0);
        assert_eq!(seeks(&intent(&mut model, PlaybackIntent::Skip(10.0))), vec![40.0]);
        assert_eq!(seeks(&intent(&mut model, PlaybackIntent::Skip(-10.0))), vec![20.0]);
    }

    #[test]
    fn rate_cycle_wraps_and_commands_engine() {
        let mut model = ready(true, 0.0, 60.0);
        let mut rates = Vec::new();
        for _ in 0..4 {
            for action in intent(&mut model, PlaybackIntent::CycleRate) {
                if let TransportAction::SetRate(rate) = action {
                    rates.push(rate);
                }
            }
        }
        assert_eq!(rates, vec![1.25, 1.5, 0.75, 1.0]);
        assert_eq!(model.rate(), PlaybackSpeed::Normal);
    }

    #[test]
    fn play_state_changes_are_reported_once() {
        let mut model = ready(false, 0.0, 60.0);
        let status = EngineStatus {
            playing: true,
            loading: false,
            current_time: 1.0,
            duration: 60.0,
        };
        assert_eq!(
            transition(&mut model, PlaybackEvent::Status(status)),
            vec![TransportAction::PlayingChanged(true)]
        );
        assert!(transition(&mut model, PlaybackEvent::Status(status)).is_empty());
    }

    #[test]
    fn teardown_silences_everything_after() {
        let mut model = ready(true, 3.0, 60.0);
        assert_eq!(
            intent(&mut model, PlaybackIntent::Teardown),
            vec![TransportAction::PlayingChanged(false)]
        );
        assert!(intent(&mut model, PlaybackIntent::CommitScrub(10.0)).is_empty());
        assert!(intent(&mut model, PlaybackIntent::TogglePlayPause).is_empty());
        assert!(!model.snapshot().is_playing);
    }
}
