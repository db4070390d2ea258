use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{ClipCallback, ClipboardError, ClipboardService};

/// Detects externally originated clipboard text.
///
/// The baseline is the single authoritative "last seen" value. Detection and
/// our own clipboard writes both go through the same lock, so a paste can never
/// be observed as a new entry.
pub struct ClipboardWatcher {
    clipboard: Arc<dyn ClipboardService>,
    baseline: Mutex<String>,
    observed: AtomicBool,
    stopped: AtomicBool,
}

impl ClipboardWatcher {
    /// Starts with whatever text is on the clipboard right now as the baseline.
    pub fn new(clipboard: Arc<dyn ClipboardService>) -> Self {
        let baseline = match clipboard.read_text() {
            Ok(text) => text,
            Err(ClipboardError::NotText) => String::new(),
            Err(err) => {
                warn!("could not read initial clipboard text: {err}");
                String::new()
            }
        };
        Self {
            clipboard,
            baseline: Mutex::new(baseline),
            observed: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    fn baseline(&self) -> MutexGuard<'_, String> {
        self.baseline.lock().unwrap_or_else(|poisoned| {
            warn!("clipboard baseline lock poisoned, continuing with recovered value");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Records `text` as known without emitting anything.
    pub fn mark_seen(&self, text: &str) {
        let mut baseline = self.baseline();
        baseline.clear();
        baseline.push_str(text);
    }

    /// Writes `text` to the clipboard and marks it seen under one lock.
    /// On a failed write the previous baseline is restored.
    pub fn replace_clipboard(&self, text: &str) -> Result<(), ClipboardError> {
        let mut baseline = self.baseline();
        let previous = std::mem::replace(&mut *baseline, text.to_string());
        if let Err(err) = self.clipboard.set_text(text) {
            *baseline = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Handles one change notification. Returns the new text, if any.
    pub fn poll(&self) -> Option<String> {
        let mut baseline = self.baseline();
        let current = match self.clipboard.read_text() {
            Ok(text) => text,
            Err(ClipboardError::NotText) => return None,
            Err(err) => {
                warn!("clipboard read failed, treating as no change: {err}");
                return None;
            }
        };

        if current.is_empty() || current == *baseline {
            return None;
        }

        debug!("new clipboard text detected ({} bytes)", current.len());
        *baseline = current.clone();
        Some(current)
    }

    /// Lazy, infinite sequence of new clipboard texts, polled every `interval`.
    /// Only one sequence may ever be taken from a watcher.
    pub fn observe(self: &Arc<Self>, interval: Duration) -> Result<Changes, ClipboardError> {
        if self.observed.swap(true, Ordering::SeqCst) {
            return Err(ClipboardError::AlreadyObserving);
        }
        Ok(Changes {
            watcher: Arc::clone(self),
            interval,
        })
    }

    /// Ends the observed sequence at its next poll.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!("clipboard observation stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

pub struct Changes {
    watcher: Arc<ClipboardWatcher>,
    interval: Duration,
}

impl Iterator for Changes {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if self.watcher.is_stopped() {
                return None;
            }
            if let Some(text) = self.watcher.poll() {
                return Some(text);
            }
            thread::sleep(self.interval);
        }
    }
}

/// Drives `observe()` on a background thread, handing each text to `callback`.
pub fn watch_changes(
    watcher: &Arc<ClipboardWatcher>,
    interval: Duration,
    callback: ClipCallback,
) -> Result<JoinHandle<()>, ClipboardError> {
    let changes = watcher.observe(interval)?;
    let handle = thread::Builder::new()
        .name("clipboard-watcher".to_string())
        .spawn(move || {
            for text in changes {
                callback(text);
            }
        })?;
    info!("clipboard watcher polling every {}ms", interval.as_millis());
    Ok(handle)
}
