//! Process configuration resolved once at start-up.
//!
//! User-editable settings live in the database (see `services::settings`);
//! this covers only where the data lives and a few timing knobs.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub const DATA_DIR_ENV: &str = "SNIPKEY_DATA_DIR";
pub const POLL_MS_ENV: &str = "SNIPKEY_POLL_MS";
pub const SETTLE_MS_ENV: &str = "SNIPKEY_SETTLE_MS";

const APP_DIR_NAME: &str = "snipkey";
const DB_FILE_NAME: &str = "snipkey.sqlite3";

const DEFAULT_POLL_MS: u64 = 250;
const MIN_POLL_MS: u64 = 50;
const MAX_POLL_MS: u64 = 5_000;

const DEFAULT_SETTLE_MS: u64 = 100;
const MAX_SETTLE_MS: u64 = 2_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a data directory")]
    NoDataDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match lookup(DATA_DIR_ENV).filter(|dir| !dir.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };

        let poll_ms = parse_millis(POLL_MS_ENV, lookup(POLL_MS_ENV), DEFAULT_POLL_MS)
            .clamp(MIN_POLL_MS, MAX_POLL_MS);
        let settle_ms =
            parse_millis(SETTLE_MS_ENV, lookup(SETTLE_MS_ENV), DEFAULT_SETTLE_MS).min(MAX_SETTLE_MS);

        Ok(Self {
            data_dir,
            poll_interval: Duration::from_millis(poll_ms),
            settle_delay: Duration::from_millis(settle_ms),
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn ensure_data_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .or_else(|| dirs::home_dir().map(|home| home.join(format!(".{APP_DIR_NAME}"))))
}

fn parse_millis(name: &str, raw: Option<String>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(value) => value,
        Err(_) => {
            warn!("ignoring invalid {name}={raw:?}, using {default}ms");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[(DATA_DIR_ENV, "/tmp/snipkey-test")]))
            .expect("config");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/snipkey-test"));
        assert_eq!(config.db_path(), PathBuf::from("/tmp/snipkey-test/snipkey.sqlite3"));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.settle_delay, Duration::from_millis(100));
    }

    #[test]
    fn timing_overrides_are_clamped() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (DATA_DIR_ENV, "/tmp/x"),
            (POLL_MS_ENV, "1"),
            (SETTLE_MS_ENV, "99999"),
        ]))
        .expect("config");
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.settle_delay, Duration::from_millis(2_000));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (DATA_DIR_ENV, "/tmp/x"),
            (POLL_MS_ENV, "fast"),
            (SETTLE_MS_ENV, "-5"),
        ]))
        .expect("config");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.settle_delay, Duration::from_millis(100));
    }
}
