use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

/// Names of the tables in the grouped on-disk layout.
pub(super) const TABLE_NAMES: [&str; 5] = ["storage", "catalog", "audio", "reading", "logging"];

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    catalog: CatalogConfig,
    #[serde(default)]
    audio: AudioConfig,
    #[serde(default)]
    reading: ReadingConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            data_dir: tables.storage.data_dir,
            catalog_path: tables.catalog.catalog_path,
            audio_base_url: tables.audio.audio_base_url,
            audio_cache_dir: tables.audio.audio_cache_dir,
            skip_seconds: tables.audio.skip_seconds,
            status_tick_ms: tables.audio.status_tick_ms,
            bookmark_preview_chars: tables.reading.bookmark_preview_chars,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            storage: StorageConfig {
                data_dir: config.data_dir.clone(),
            },
            catalog: CatalogConfig {
                catalog_path: config.catalog_path.clone(),
            },
            audio: AudioConfig {
                audio_base_url: config.audio_base_url.clone(),
                audio_cache_dir: config.audio_cache_dir.clone(),
                skip_seconds: config.skip_seconds,
                status_tick_ms: config.status_tick_ms,
            },
            reading: ReadingConfig {
                bookmark_preview_chars: config.bookmark_preview_chars,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_data_dir")]
    data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: defaults::default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct CatalogConfig {
    #[serde(default = "defaults::default_catalog_path")]
    catalog_path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            catalog_path: defaults::default_catalog_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct AudioConfig {
    #[serde(default = "defaults::default_audio_base_url")]
    audio_base_url: String,
    #[serde(default = "defaults::default_audio_cache_dir")]
    audio_cache_dir: String,
    #[serde(default = "defaults::default_skip_seconds")]
    skip_seconds: f64,
    #[serde(default = "defaults::default_status_tick_ms")]
    status_tick_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            audio_base_url: defaults::default_audio_base_url(),
            audio_cache_dir: defaults::default_audio_cache_dir(),
            skip_seconds: defaults::default_skip_seconds(),
            status_tick_ms: defaults::default_status_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReadingConfig {
    #[serde(default = "defaults::default_bookmark_preview_chars")]
    bookmark_preview_chars: usize,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        ReadingConfig {
            bookmark_preview_chars: defaults::default_bookmark_preview_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
