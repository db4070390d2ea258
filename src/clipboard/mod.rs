use std::sync::Arc;

use thiserror::Error;

pub mod system;
pub mod watcher;

pub use watcher::{watch_changes, Changes, ClipboardWatcher};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard does not hold text")]
    NotText,
    #[error("clipboard backend failed: {0}")]
    Backend(String),
    #[error("clipboard is already being observed")]
    AlreadyObserving,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClipCallback = Arc<dyn Fn(String) + Send + Sync + 'static>;

/// Plain-text access to the OS clipboard.
pub trait ClipboardService: Send + Sync {
    fn read_text(&self) -> Result<String, ClipboardError>;
    fn set_text(&self, content: &str) -> Result<(), ClipboardError>;
}

pub fn default_service() -> Result<Arc<dyn ClipboardService>, ClipboardError> {
    Ok(Arc::new(system::SystemClipboard::new()?))
}
