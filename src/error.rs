use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] crate::db::DbError),
    #[error("clipboard error: {0}")]
    Clipboard(#[from] crate::clipboard::ClipboardError),
    #[error("hotkey error: {0}")]
    Hotkey(#[from] crate::hotkey::HotkeyError),
    #[error("paste error: {0}")]
    Paste(#[from] crate::paste::PasteError),
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("hotkey '{0}' is already bound to another snippet")]
    DuplicateHotkey(String),
    #[error("snippet {0} not found")]
    NotFound(i64),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors the user can fix by changing their input, as opposed to
    /// storage or OS failures that are only logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::DuplicateHotkey(_) | AppError::NotFound(_)
        )
    }
}

/// Storage conflicts surface as their own variant so callers can match on them.
pub(crate) fn from_db(err: crate::db::DbError) -> AppError {
    match err {
        crate::db::DbError::DuplicateHotkey(hotkey) => AppError::DuplicateHotkey(hotkey),
        other => AppError::Db(other),
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;

    #[test]
    fn duplicate_hotkey_is_lifted_out_of_db_error() {
        let err = from_db(DbError::DuplicateHotkey("ctrl+1".to_string()));
        assert!(matches!(err, AppError::DuplicateHotkey(ref key) if key == "ctrl+1"));
        assert!(err.is_user_facing());
    }

    #[test]
    fn storage_errors_are_not_user_facing() {
        let err = from_db(DbError::LockPoisoned);
        assert!(matches!(err, AppError::Db(_)));
        assert!(!err.is_user_facing());
    }
}
