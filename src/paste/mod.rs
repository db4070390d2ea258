use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use crate::clipboard::{ClipboardError, ClipboardWatcher};
use crate::view::HistoryView;

pub mod enigo;

#[derive(Debug, Error)]
pub enum PasteError {
    #[error("input synthesis unavailable: {0}")]
    Unavailable(String),
    #[error("failed to send paste gesture: {0}")]
    Gesture(String),
    #[error("clipboard write failed: {0}")]
    Clipboard(#[from] ClipboardError),
}

/// Platform paste chord (Ctrl+V, Cmd+V).
pub trait PasteGesture: Send + Sync {
    fn send_paste(&self) -> Result<(), PasteError>;
}

pub struct PasteExecutor {
    watcher: Arc<ClipboardWatcher>,
    gesture: Arc<dyn PasteGesture>,
    settle_delay: Duration,
}

impl PasteExecutor {
    pub fn new(
        watcher: Arc<ClipboardWatcher>,
        gesture: Arc<dyn PasteGesture>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            watcher,
            gesture,
            settle_delay,
        }
    }

    /// Best effort: failures are logged and the clipboard write is kept.
    pub async fn paste_text(&self, text: &str, view: &mut dyn HistoryView) {
        if let Err(err) = self.try_paste_text(text, view).await {
            error!("failed to paste text: {err}");
        }
    }

    pub async fn try_paste_text(
        &self,
        text: &str,
        view: &mut dyn HistoryView,
    ) -> Result<(), PasteError> {
        if view.is_visible() {
            view.hide();
        }

        self.watcher.replace_clipboard(text)?;

        tokio::time::sleep(self.settle_delay).await;

        let gesture = Arc::clone(&self.gesture);
        tokio::task::spawn_blocking(move || gesture.send_paste())
            .await
            .map_err(|err| PasteError::Gesture(format!("task join error: {err}")))??;
        info!("simulated paste gesture");
        Ok(())
    }
}
