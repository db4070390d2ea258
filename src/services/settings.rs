use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::hotkey::Combo;
use crate::services::prune::{resolve_history_limit, DEFAULT_HISTORY_LIMIT};

pub const MAIN_HOTKEY: &str = "main_hotkey";
pub const HISTORY_LIMIT: &str = "history_limit";

pub const DEFAULT_MAIN_HOTKEY: &str = "ctrl+shift+`";

fn default_for(key: &str) -> Option<String> {
    match key {
        MAIN_HOTKEY => Some(DEFAULT_MAIN_HOTKEY.to_string()),
        HISTORY_LIMIT => Some(DEFAULT_HISTORY_LIMIT.to_string()),
        _ => None,
    }
}

/// Key/value settings with declared defaults and a write-through cache.
///
/// Reading a key that has a default but no stored value writes the default
/// back, so later reads see the same value straight from storage.
pub struct SettingsProvider {
    db: Arc<Database>,
    cache: HashMap<String, String>,
}

impl SettingsProvider {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            cache: HashMap::new(),
        }
    }

    /// Never fails: storage errors fall back to the default (or `""`).
    pub fn get(&mut self, key: &str) -> String {
        if let Some(value) = self.cache.get(key) {
            return value.clone();
        }

        match self.db.get_setting(key) {
            Ok(Some(value)) => {
                self.cache.insert(key.to_string(), value.clone());
                value
            }
            Ok(None) => match default_for(key) {
                Some(default) => {
                    if let Err(err) = self.write(key, &default) {
                        error!("failed to persist default for setting '{key}': {err}");
                    }
                    default
                }
                None => String::new(),
            },
            Err(err) => {
                error!("error reading setting '{key}': {err}");
                default_for(key).unwrap_or_default()
            }
        }
    }

    /// Validates known keys before persisting.
    pub fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        let value = normalize_value(key, value)?;
        self.write(key, &value)?;
        info!("setting {key} = {value}");
        Ok(())
    }

    fn write(&mut self, key: &str, value: &str) -> AppResult<()> {
        self.db.set_setting(key, value)?;
        self.cache.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn main_hotkey(&mut self) -> String {
        self.get(MAIN_HOTKEY)
    }

    /// Falls back to the default when the stored value is not a number.
    pub fn history_limit(&mut self) -> i64 {
        resolve_history_limit(&self.get(HISTORY_LIMIT))
    }
}

fn normalize_value(key: &str, value: &str) -> AppResult<String> {
    match key {
        HISTORY_LIMIT => match value.trim().parse::<i64>() {
            Ok(limit) if limit > 0 => Ok(limit.to_string()),
            _ => Err(AppError::Validation(format!(
                "history limit must be a positive integer, got '{value}'"
            ))),
        },
        MAIN_HOTKEY => match Combo::normalize(value) {
            Ok(Some(combo)) => Ok(combo.to_string()),
            Ok(None) => Err(AppError::Validation("main hotkey cannot be empty".to_string())),
            Err(err) => Err(AppError::Validation(err.to_string())),
        },
        _ => Ok(value.to_string()),
    }
}
