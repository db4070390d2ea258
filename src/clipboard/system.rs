use std::sync::{Mutex, MutexGuard};

use super::{ClipboardError, ClipboardService};

/// OS clipboard through arboard. One handle is kept for the process lifetime
/// so text we set stays owned on X11.
pub struct SystemClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let clipboard = arboard::Clipboard::new().map_err(backend)?;
        Ok(Self {
            inner: Mutex::new(clipboard),
        })
    }

    fn clipboard(&self) -> Result<MutexGuard<'_, arboard::Clipboard>, ClipboardError> {
        self.inner
            .lock()
            .map_err(|_| ClipboardError::Backend("clipboard lock poisoned".to_string()))
    }
}

impl ClipboardService for SystemClipboard {
    fn read_text(&self) -> Result<String, ClipboardError> {
        match self.clipboard()?.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Err(ClipboardError::NotText),
            Err(err) => Err(backend(err)),
        }
    }

    fn set_text(&self, content: &str) -> Result<(), ClipboardError> {
        self.clipboard()?.set_text(content).map_err(backend)
    }
}

fn backend(err: arboard::Error) -> ClipboardError {
    ClipboardError::Backend(err.to_string())
}
