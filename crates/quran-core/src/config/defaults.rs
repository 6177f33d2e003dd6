pub(crate) fn default_data_dir() -> String {
    ".cache/quran".to_string()
}

pub(crate) fn default_catalog_path() -> String {
    "data/catalog.json".to_string()
}

pub(crate) fn default_audio_base_url() -> String {
    "https://cdn.islamic.network/quran/audio-surah/128/ar.alafasy".to_string()
}

pub(crate) fn default_audio_cache_dir() -> String {
    ".cache/quran/audio".to_string()
}

pub(crate) fn default_skip_seconds() -> f64 {
    10.0
}

pub(crate) fn default_status_tick_ms() -> u64 {
    250
}

pub(crate) fn default_bookmark_preview_chars() -> usize {
    100
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}
