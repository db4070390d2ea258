use std::io::Write;

use serde::Serialize;
use tracing::{info, warn};

use crate::db::Snippet;

/// What the core needs from the history window.
pub trait HistoryView {
    fn is_visible(&self) -> bool;
    fn show(&mut self, snippets: &[Snippet]);
    fn hide(&mut self);
    fn refresh(&mut self, snippets: &[Snippet]);
    fn notify_new_text(&mut self, text: &str);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewPayload<'a> {
    event: &'static str,
    snippets: &'a [Snippet],
}

/// Headless view: "showing" the history prints it to stdout as one JSON line.
#[derive(Debug, Default)]
pub struct StdoutView {
    visible: bool,
}

impl StdoutView {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&self, event: &'static str, snippets: &[Snippet]) {
        let payload = ViewPayload { event, snippets };
        match serde_json::to_string(&payload) {
            Ok(line) => {
                let mut stdout = std::io::stdout().lock();
                if let Err(err) = writeln!(stdout, "{line}") {
                    warn!("failed to write history: {err}");
                }
            }
            Err(err) => warn!("failed to serialize history: {err}"),
        }
    }
}

impl HistoryView for StdoutView {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn show(&mut self, snippets: &[Snippet]) {
        self.visible = true;
        self.emit("show", snippets);
    }

    fn hide(&mut self) {
        self.visible = false;
        info!("history hidden");
    }

    fn refresh(&mut self, snippets: &[Snippet]) {
        self.emit("refresh", snippets);
    }

    fn notify_new_text(&mut self, text: &str) {
        info!("captured {} chars from clipboard", text.chars().count());
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_view_tracks_visibility() {
        let mut view = StdoutView::new();
        assert!(!view.is_visible());
        view.show(&[]);
        assert!(view.is_visible());
        view.hide();
        assert!(!view.is_visible());
    }

    #[test]
    fn payload_uses_camel_case_fields() {
        let snippet = Snippet {
            id: 1,
            label: "l".to_string(),
            content: "c".to_string(),
            tags: None,
            group: Some("work".to_string()),
            hotkey: None,
            is_pinned: true,
            is_sensitive: false,
            created_at: "2024-01-01 00:00:00".to_string(),
            updated_at: "2024-01-01 00:00:00".to_string(),
        };
        let snippets = [snippet];
        let json = serde_json::to_value(ViewPayload {
            event: "show",
            snippets: &snippets,
        })
        .expect("serialize");
        assert_eq!(json["event"], "show");
        assert_eq!(json["snippets"][0]["isPinned"], true);
        assert_eq!(json["snippets"][0]["group"], "work");
    }
}
