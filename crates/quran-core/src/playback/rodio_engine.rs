//! [`AudioEngine`] backed by `rodio`.
//!
//! The output stream is not `Send`, so it lives on a dedicated device thread
//! that owns the sink. Commands travel over a channel with a oneshot reply;
//! the thread publishes an [`EngineStatus`] after every command and on each
//! tick. Remote recitations are downloaded once into the audio cache.

use super::engine::{AudioEngine, EngineError, EngineStatus};
use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc as async_mpsc, oneshot};
use tracing::{debug, info, warn};

enum DeviceCommand {
    Load(String),
    Play,
    Pause,
    Seek(f64),
    SetRate(f32),
}

struct DeviceRequest {
    command: DeviceCommand,
    reply: oneshot::Sender<Result<(), EngineError>>,
}

pub struct RodioEngine {
    requests: mpsc::Sender<DeviceRequest>,
}

impl RodioEngine {
    /// Start the device thread. Status ticks are sent to `status_tx` every `tick`.
    pub fn spawn(
        cache_dir: PathBuf,
        tick: Duration,
        status_tx: async_mpsc::UnboundedSender<EngineStatus>,
    ) -> Result<Self, EngineError> {
        let (requests, rx) = mpsc::channel::<DeviceRequest>();
        thread::Builder::new()
            .name("quran-audio".to_string())
            .spawn(move || run_device(rx, status_tx, cache_dir, tick))
            .map_err(|err| EngineError::Device(err.to_string()))?;
        Ok(Self { requests })
    }

    async fn request(&self, command: DeviceCommand) -> Result<(), EngineError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(DeviceRequest { command, reply })
            .map_err(|_| EngineError::Closed)?;
        response.await.map_err(|_| EngineError::Closed)?
    }
}

#[async_trait]
impl AudioEngine for RodioEngine {
    async fn load(&mut self, url: &str) -> Result<(), EngineError> {
        self.request(DeviceCommand::Load(url.to_string())).await
    }

    async fn play(&mut self) -> Result<(), EngineError> {
        self.request(DeviceCommand::Play).await
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        self.request(DeviceCommand::Pause).await
    }

    async fn seek_to(&mut self, seconds: f64) -> Result<(), EngineError> {
        self.request(DeviceCommand::Seek(seconds)).await
    }

    async fn set_rate(&mut self, rate: f32) -> Result<(), EngineError> {
        self.request(DeviceCommand::SetRate(rate)).await
    }
}

/// Media-time clock: rodio does not report position, so it is derived from
/// wall time scaled by the playback rate.
#[derive(Debug, Clone)]
struct PlaybackClock {
    base: f64,
    started_at: Option<Instant>,
    rate: f32,
}

impl PlaybackClock {
    fn new() -> Self {
        Self {
            base: 0.0,
            started_at: None,
            rate: 1.0,
        }
    }

    fn position(&self) -> f64 {
        let running = self
            .started_at
            .map(|at| at.elapsed().as_secs_f64() * f64::from(self.rate))
            .unwrap_or(0.0);
        self.base + running
    }

    fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        self.base = self.position();
        self.started_at = None;
    }

    fn seek(&mut self, seconds: f64) {
        let running = self.started_at.is_some();
        self.base = seconds;
        self.started_at = running.then(Instant::now);
    }

    fn set_rate(&mut self, rate: f32) {
        let running = self.started_at.is_some();
        self.stop();
        self.rate = rate;
        if running {
            self.start();
        }
    }
}

struct Device {
    handle: OutputStreamHandle,
    cache_dir: PathBuf,
    sink: Option<Sink>,
    duration: f64,
    clock: PlaybackClock,
    loading: bool,
}

impl Device {
    fn apply(&mut self, command: DeviceCommand) -> Result<(), EngineError> {
        match command {
            DeviceCommand::Load(url) => self.load(&url),
            DeviceCommand::Play => {
                let sink = self.sink.as_ref().ok_or(EngineError::NotLoaded)?;
                sink.play();
                self.clock.start();
                debug!("Resuming playback");
                Ok(())
            }
            DeviceCommand::Pause => {
                let sink = self.sink.as_ref().ok_or(EngineError::NotLoaded)?;
                sink.pause();
                self.clock.stop();
                debug!("Pausing playback");
                Ok(())
            }
            DeviceCommand::Seek(seconds) => {
                let sink = self.sink.as_ref().ok_or(EngineError::NotLoaded)?;
                let target = seconds.max(0.0);
                sink.try_seek(Duration::from_secs_f64(target))
                    .map_err(|err| EngineError::Seek(err.to_string()))?;
                self.clock.seek(target);
                debug!(position = target, "Seeked");
                Ok(())
            }
            DeviceCommand::SetRate(rate) => {
                if let Some(sink) = self.sink.as_ref() {
                    sink.set_speed(rate);
                }
                self.clock.set_rate(rate);
                debug!(rate, "Applied playback rate");
                Ok(())
            }
        }
    }

    fn load(&mut self, url: &str) -> Result<(), EngineError> {
        self.loading = true;
        self.sink = None;
        self.duration = 0.0;
        self.clock = PlaybackClock {
            rate: self.clock.rate,
            ..PlaybackClock::new()
        };

        let result = self.open(url);
        self.loading = false;
        let (sink, duration) = result?;
        self.sink = Some(sink);
        self.duration = duration;
        info!(url, duration, "Loaded recitation");
        Ok(())
    }

    fn open(&self, url: &str) -> Result<(Sink, f64), EngineError> {
        let load_error = |reason: String| EngineError::Load {
            url: url.to_string(),
            reason,
        };
        let path = resolve_source(&self.cache_dir, url).map_err(load_error)?;
        let file = File::open(&path).map_err(|err| load_error(err.to_string()))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|err| load_error(err.to_string()))?;
        let duration = source
            .total_duration()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let sink = Sink::try_new(&self.handle).map_err(|err| EngineError::Device(err.to_string()))?;
        sink.pause();
        sink.set_speed(self.clock.rate);
        sink.append(source);
        Ok((sink, duration))
    }

    fn status(&mut self) -> EngineStatus {
        let finished = self.sink.as_ref().map(Sink::empty).unwrap_or(false);
        if finished && self.clock.started_at.is_some() {
            self.clock.stop();
            if self.duration > 0.0 {
                self.clock.base = self.duration;
            }
        }
        let playing = self
            .sink
            .as_ref()
            .map(|sink| !sink.is_paused() && !sink.empty())
            .unwrap_or(false);
        let mut current_time = self.clock.position();
        if self.duration > 0.0 {
            current_time = current_time.min(self.duration);
        }
        EngineStatus {
            playing,
            loading: self.loading,
            current_time,
            duration: self.duration,
        }
    }
}

fn run_device(
    rx: mpsc::Receiver<DeviceRequest>,
    status_tx: async_mpsc::UnboundedSender<EngineStatus>,
    cache_dir: PathBuf,
    tick: Duration,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(err) => {
            warn!("Opening audio output failed: {err}");
            for request in rx {
                let _ = request.reply.send(Err(EngineError::Device(err.to_string())));
            }
            return;
        }
    };
    let mut device = Device {
        handle,
        cache_dir,
        sink: None,
        duration: 0.0,
        clock: PlaybackClock::new(),
        loading: false,
    };

    loop {
        match rx.recv_timeout(tick) {
            Ok(request) => {
                if matches!(request.command, DeviceCommand::Load(_)) {
                    let _ = status_tx.send(EngineStatus {
                        loading: true,
                        ..EngineStatus::default()
                    });
                }
                let result = device.apply(request.command);
                let _ = request.reply.send(result);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if status_tx.send(device.status()).is_err() {
            break;
        }
    }
    debug!("Audio device thread exiting");
}

/// Local paths are used as-is; http(s) URLs are fetched into `cache_dir`.
fn resolve_source(cache_dir: &Path, url: &str) -> Result<PathBuf, String> {
    let lowered = url.to_ascii_lowercase();
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if !(lowered.starts_with("http://") || lowered.starts_with("https://")) {
        return Ok(PathBuf::from(url));
    }

    let path = cache_path(cache_dir, url);
    if path.exists() {
        debug!(path = %path.display(), "Using cached recitation");
        return Ok(path);
    }
    fs::create_dir_all(cache_dir).map_err(|err| format!("creating audio cache: {err}"))?;
    info!(url, "Downloading recitation");
    let bytes = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.bytes())
        .map_err(|err| err.to_string())?;
    let tmp = path.with_extension("part");
    fs::write(&tmp, &bytes).map_err(|err| format!("writing audio cache: {err}"))?;
    fs::rename(&tmp, &path).map_err(|err| format!("finalizing audio cache: {err}"))?;
    Ok(path)
}

fn cache_path(cache_dir: &Path, url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    let ext = Path::new(url)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 4)
        .unwrap_or("mp3");
    cache_dir.join(format!("recitation-{hash}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_tracks_seek_and_pause() {
        let mut clock = PlaybackClock::new();
        clock.seek(42.0);
        assert_eq!(clock.position(), 42.0);
        clock.start();
        clock.stop();
        assert!(clock.position() >= 42.0);
        clock.seek(5.0);
        assert_eq!(clock.position(), 5.0);
        assert!(clock.started_at.is_none());
    }

    #[test]
    fn rate_change_keeps_position() {
        let mut clock = PlaybackClock::new();
        clock.seek(10.0);
        clock.set_rate(1.5);
        assert_eq!(clock.position(), 10.0);
        assert_eq!(clock.rate, 1.5);
    }

    #[test]
    fn cache_paths_are_stable_and_hashed() {
        let dir = Path::new("/tmp/audio");
        let a = cache_path(dir, "https://cdn.example/audio/2.mp3");
        let b = cache_path(dir, "https://cdn.example/audio/2.mp3");
        let c = cache_path(dir, "https://cdn.example/audio/3.mp3");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("mp3"));
    }

    #[test]
    fn local_sources_are_not_downloaded() {
        let dir = Path::new("/tmp/audio");
        assert_eq!(
            resolve_source(dir, "file:///data/001.mp3").unwrap(),
            PathBuf::from("/data/001.mp3")
        );
        assert_eq!(
            resolve_source(dir, "recitations/001.ogg").unwrap(),
            PathBuf::from("recitations/001.ogg")
        );
    }
}
