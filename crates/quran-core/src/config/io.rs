use super::models::AppConfig;
use super::tables::{ConfigTables, TABLE_NAMES};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

/// Parse either the grouped (`[audio]`, `[storage]`, ...) or the flat layout.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let table: toml::Table = toml::from_str(contents).context("Parsing config TOML")?;
    let grouped = TABLE_NAMES.iter().any(|name| table.contains_key(*name));
    let config = if grouped {
        let tables: ConfigTables = toml::from_str(contents).context("Decoding config tables")?;
        AppConfig::from(tables)
    } else {
        toml::from_str::<AppConfig>(contents).context("Decoding flat config")?
    };
    Ok(config.sanitized())
}

/// Serialize using the grouped layout.
pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string(&ConfigTables::from(config)).context("Serializing config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn invalid_toml_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "skip_seconds = [").unwrap();
        assert_eq!(load_config(&path), AppConfig::default());
    }

    #[test]
    fn grouped_layout_round_trips() {
        let mut config = AppConfig::default();
        config.skip_seconds = 15.0;
        config.log_level = LogLevel::Warn;
        config.data_dir = "/var/lib/quran".to_string();

        let serialized = serialize_config(&config).unwrap();
        assert!(serialized.contains("[audio]"));
        let parsed = parse_config(&serialized).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn flat_layout_is_accepted_with_defaults() {
        let parsed = parse_config("log_level = \"info\"\nstatus_tick_ms = 1\n").unwrap();
        assert_eq!(parsed.log_level, LogLevel::Info);
        assert_eq!(parsed.status_tick_ms, 50);
        assert_eq!(parsed.catalog_path, "data/catalog.json");
    }

    #[test]
    fn partial_tables_fill_in_defaults() {
        let parsed = parse_config("[audio]\nskip_seconds = 5.0\n").unwrap();
        assert_eq!(parsed.skip_seconds, 5.0);
        assert_eq!(parsed.status_tick_ms, 250);
        assert_eq!(parsed.log_level, LogLevel::Debug);
    }
}
