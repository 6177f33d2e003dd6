use serde::Deserialize;

pub const MIN_STATUS_TICK_MS: u64 = 50;
pub const MAX_STATUS_TICK_MS: u64 = 2_000;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_data_dir")]
    pub data_dir: String,
    #[serde(default = "crate::config::defaults::default_catalog_path")]
    pub catalog_path: String,
    #[serde(default = "crate::config::defaults::default_audio_base_url")]
    pub audio_base_url: String,
    #[serde(default = "crate::config::defaults::default_audio_cache_dir")]
    pub audio_cache_dir: String,
    #[serde(default = "crate::config::defaults::default_skip_seconds")]
    pub skip_seconds: f64,
    #[serde(default = "crate::config::defaults::default_status_tick_ms")]
    pub status_tick_ms: u64,
    #[serde(default = "crate::config::defaults::default_bookmark_preview_chars")]
    pub bookmark_preview_chars: usize,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        use crate::config::defaults::*;
        AppConfig {
            data_dir: default_data_dir(),
            catalog_path: default_catalog_path(),
            audio_base_url: default_audio_base_url(),
            audio_cache_dir: default_audio_cache_dir(),
            skip_seconds: default_skip_seconds(),
            status_tick_ms: default_status_tick_ms(),
            bookmark_preview_chars: default_bookmark_preview_chars(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Keep runtime values in bounds regardless of where they came from.
    pub fn sanitized(mut self) -> Self {
        self.status_tick_ms = self
            .status_tick_ms
            .clamp(MIN_STATUS_TICK_MS, MAX_STATUS_TICK_MS);
        if !self.skip_seconds.is_finite() || self.skip_seconds <= 0.0 {
            self.skip_seconds = crate::config::defaults::default_skip_seconds();
        }
        if self.bookmark_preview_chars == 0 {
            self.bookmark_preview_chars = crate::config::defaults::default_bookmark_preview_chars();
        }
        self
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
