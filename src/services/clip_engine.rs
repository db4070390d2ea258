use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::clipboard::ClipboardWatcher;
use crate::commands::{AppEvent, Command, CommandReply};
use crate::db::Database;
use crate::error::AppResult;
use crate::hotkey::{BindingId, HotkeyBackend, HotkeyRegistry};
use crate::paste::PasteExecutor;
use crate::services::prune::run_prune;
use crate::services::settings::{SettingsProvider, MAIN_HOTKEY};
use crate::services::snippets::{SnippetDraft, SnippetRepository};
use crate::utils::text::derive_label;
use crate::view::HistoryView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyAction {
    ToggleHistory,
    Paste(String),
}

/// Owns every stateful service and runs on the single application thread.
pub struct ClipEngine<V: HistoryView> {
    repo: SnippetRepository,
    settings: SettingsProvider,
    hotkeys: HotkeyRegistry<HotkeyAction>,
    paste: PasteExecutor,
    watcher: Arc<ClipboardWatcher>,
    view: V,
}

impl<V: HistoryView> ClipEngine<V> {
    pub fn new(
        db: Arc<Database>,
        watcher: Arc<ClipboardWatcher>,
        hotkey_backend: Box<dyn HotkeyBackend>,
        paste: PasteExecutor,
        view: V,
    ) -> Self {
        Self {
            repo: SnippetRepository::new(db.clone()),
            settings: SettingsProvider::new(db),
            hotkeys: HotkeyRegistry::new(hotkey_backend),
            paste,
            watcher,
            view,
        }
    }

    pub fn repo(&self) -> &SnippetRepository {
        &self.repo
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Seeds a new store and binds every hotkey.
    pub fn start(&mut self) {
        if let Err(err) = self.repo.seed_if_empty() {
            error!("failed to add sample snippet: {err}");
        }
        self.register_hotkeys();
    }

    pub async fn run(mut self, mut events: mpsc::Receiver<AppEvent>) {
        while let Some(event) = events.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }
        self.shutdown();
    }

    /// Returns `false` once the loop should stop.
    pub async fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::ClipboardText(text) => {
                if let Err(err) = self.handle_clipboard_text(&text) {
                    error!("clipboard ingestion failed: {err}");
                }
                true
            }
            AppEvent::Hotkey(id) => {
                self.handle_hotkey(id).await;
                true
            }
            AppEvent::Command(command, reply) => {
                let quit = command == Command::Quit;
                let response = self.handle_command(command).await;
                let _ = reply.send(response);
                !quit
            }
            AppEvent::Shutdown => false,
        }
    }

    /// Stores new clipboard text and trims history. Returns the new id.
    pub fn handle_clipboard_text(&mut self, text: &str) -> AppResult<Option<i64>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let draft = SnippetDraft::new(trimmed).label(derive_label(trimmed));
        let id = self.repo.add(&draft)?;

        let limit = self.settings.history_limit();
        run_prune(&self.repo, limit)?;

        self.view.notify_new_text(trimmed);
        self.refresh_if_visible();
        Ok(Some(id))
    }

    pub async fn handle_hotkey(&mut self, id: BindingId) {
        match self.hotkeys.dispatch(id) {
            Some(HotkeyAction::ToggleHistory) => self.toggle_history(),
            Some(HotkeyAction::Paste(content)) => {
                self.paste.paste_text(&content, &mut self.view).await;
            }
            None => {}
        }
    }

    pub fn toggle_history(&mut self) {
        if self.view.is_visible() {
            self.view.hide();
            return;
        }
        match self.repo.get_all() {
            Ok(snippets) => self.view.show(&snippets),
            Err(err) => error!("failed to show history: {err}"),
        }
    }

    /// Runs the full unbind-then-bind sequence. `&mut self` keeps it serialized.
    pub fn register_hotkeys(&mut self) {
        let mut entries = vec![(self.settings.main_hotkey(), HotkeyAction::ToggleHistory)];
        match self.repo.get_all() {
            Ok(snippets) => entries.extend(snippets.into_iter().filter_map(|snippet| {
                snippet
                    .hotkey
                    .map(|hotkey| (hotkey, HotkeyAction::Paste(snippet.content)))
            })),
            Err(err) => error!("failed to load snippet hotkeys: {err}"),
        }

        let failures = self.hotkeys.rebind(entries);
        if !failures.is_empty() {
            warn!("{} hotkey(s) could not be registered", failures.len());
        }
    }

    pub async fn handle_command(&mut self, command: Command) -> CommandReply {
        match self.execute(command).await {
            Ok(reply) => reply,
            Err(err) => {
                if err.is_user_facing() {
                    info!("command rejected: {err}");
                } else {
                    error!("command failed: {err}");
                }
                CommandReply::failure(&err)
            }
        }
    }

    async fn execute(&mut self, command: Command) -> AppResult<CommandReply> {
        let reply = match command {
            Command::ListSnippets => CommandReply::success(&self.repo.get_all()?),
            Command::AddSnippet { draft } => {
                let id = self.repo.add(&draft)?;
                self.after_snippet_change();
                CommandReply::success(&id)
            }
            Command::UpdateSnippet { id, draft } => {
                let snippet = self.repo.update(id, &draft)?;
                self.after_snippet_change();
                CommandReply::success(&snippet)
            }
            Command::DeleteSnippet { id } => {
                self.repo.delete(id)?;
                self.after_snippet_change();
                CommandReply::empty()
            }
            Command::SetPinned { id, pinned } => {
                let snippet = self.repo.set_pinned(id, pinned)?;
                self.refresh_if_visible();
                CommandReply::success(&snippet)
            }
            Command::GetSetting { key } => CommandReply::success(&self.settings.get(&key)),
            Command::SetSetting { key, value } => {
                self.settings.set(&key, &value)?;
                if key == MAIN_HOTKEY {
                    self.register_hotkeys();
                }
                CommandReply::empty()
            }
            Command::PasteSnippet { id } => {
                let snippet = self.repo.get(id)?;
                self.paste
                    .try_paste_text(&snippet.content, &mut self.view)
                    .await?;
                CommandReply::empty()
            }
            Command::ToggleHistory => {
                self.toggle_history();
                CommandReply::success(&self.view.is_visible())
            }
            Command::Quit => CommandReply::empty(),
        };
        Ok(reply)
    }

    fn after_snippet_change(&mut self) {
        self.register_hotkeys();
        self.refresh_if_visible();
    }

    fn refresh_if_visible(&mut self) {
        if !self.view.is_visible() {
            return;
        }
        match self.repo.get_all() {
            Ok(snippets) => self.view.refresh(&snippets),
            Err(err) => error!("failed to refresh history: {err}"),
        }
    }

    /// Best effort; never fails.
    pub fn shutdown(&mut self) {
        self.hotkeys.unregister_all();
        self.watcher.stop();
        info!("engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;
    use crate::clipboard::fake::FakeClipboard;
    use crate::hotkey::fake::FakeBackend;
    use crate::paste::fake::FakeGesture;
    use crate::services::settings::HISTORY_LIMIT;
    use crate::view::fake::RecordingView;

    struct Harness {
        clipboard: Arc<FakeClipboard>,
        watcher: Arc<ClipboardWatcher>,
        backend: FakeBackend,
        gesture: Arc<FakeGesture>,
        engine: ClipEngine<RecordingView>,
    }

    fn harness() -> Harness {
        let db = Arc::new(Database::new_in_memory().expect("db init"));
        let clipboard = Arc::new(FakeClipboard::with_text("boot"));
        let watcher = Arc::new(ClipboardWatcher::new(clipboard.clone()));
        let backend = FakeBackend::default();
        let gesture = Arc::new(FakeGesture::default());
        let paste = PasteExecutor::new(watcher.clone(), gesture.clone(), Duration::ZERO);
        let engine = ClipEngine::new(
            db,
            watcher.clone(),
            Box::new(backend.clone()),
            paste,
            RecordingView::default(),
        );
        Harness {
            clipboard,
            watcher,
            backend,
            gesture,
            engine,
        }
    }

    fn contents(engine: &ClipEngine<RecordingView>) -> Vec<String> {
        engine
            .repo()
            .get_all()
            .expect("list")
            .into_iter()
            .map(|s| s.content)
            .collect()
    }

    async fn send(engine: &mut ClipEngine<RecordingView>, command: Command) -> CommandReply {
        let (tx, rx) = oneshot::channel();
        engine.handle_event(AppEvent::Command(command, tx)).await;
        rx.await.expect("reply")
    }

    #[tokio::test]
    async fn clipboard_history_is_capped_by_setting() {
        let mut h = harness();
        let reply = send(
            &mut h.engine,
            Command::SetSetting {
                key: HISTORY_LIMIT.to_string(),
                value: "2".to_string(),
            },
        )
        .await;
        assert!(reply.ok);

        for text in ["A", "B", "C"] {
            h.clipboard.put(text);
            let detected = h.watcher.poll().expect("new text");
            h.engine
                .handle_event(AppEvent::ClipboardText(detected))
                .await;
        }

        assert_eq!(contents(&h.engine), vec!["C", "B"]);
    }

    #[tokio::test]
    async fn blank_clipboard_text_is_ignored_and_content_is_trimmed() {
        let mut h = harness();
        assert_eq!(h.engine.handle_clipboard_text("  \n\t").expect("blank"), None);

        let id = h
            .engine
            .handle_clipboard_text("  first line\nsecond  ")
            .expect("insert")
            .expect("id");
        let snippet = h.engine.repo().get(id).expect("get");
        assert_eq!(snippet.content, "first line\nsecond");
        assert_eq!(snippet.label, "first line");
        assert_eq!(h.engine.view().notified, vec!["first line\nsecond".to_string()]);
    }

    #[tokio::test]
    async fn main_hotkey_toggles_history() {
        let mut h = harness();
        h.engine.start();
        let main = h.backend.id_for("ctrl+shift+`").expect("main bound");

        h.engine.handle_event(AppEvent::Hotkey(main)).await;
        assert!(h.engine.view().is_visible());
        assert_eq!(h.engine.view().refreshes.len(), 1);

        h.engine.handle_event(AppEvent::Hotkey(main)).await;
        assert!(!h.engine.view().is_visible());
    }

    #[tokio::test]
    async fn snippet_hotkey_pastes_without_opening_history() {
        let mut h = harness();
        h.engine.start();
        let reply = send(
            &mut h.engine,
            Command::AddSnippet {
                draft: SnippetDraft::new("hello").hotkey("ctrl+shift+9"),
            },
        )
        .await;
        assert!(reply.ok);

        let id = h.backend.id_for("ctrl+shift+9").expect("bound");
        h.engine.handle_event(AppEvent::Hotkey(id)).await;

        assert_eq!(h.clipboard.writes(), vec!["hello".to_string()]);
        assert_eq!(h.gesture.count(), 1);
        assert_eq!(h.engine.view().shows, 0);
        assert_eq!(h.watcher.poll(), None);
    }

    #[tokio::test]
    async fn start_seeds_and_binds_sample_snippet() {
        let mut h = harness();
        h.engine.start();
        assert_eq!(
            h.backend.bound_combos(),
            vec!["ctrl+shift+1".to_string(), "ctrl+shift+`".to_string()]
        );
        assert_eq!(contents(&h.engine), vec!["This is a sample snippet."]);
    }

    #[tokio::test]
    async fn snippet_edits_rebind_hotkeys() {
        let mut h = harness();
        h.engine.start();
        let sample = h.engine.repo().get_all().expect("list")[0].id;

        let reply = send(
            &mut h.engine,
            Command::UpdateSnippet {
                id: sample,
                draft: SnippetDraft::new("changed").hotkey("alt+f2"),
            },
        )
        .await;
        assert!(reply.ok);
        assert_eq!(
            h.backend.bound_combos(),
            vec!["alt+f2".to_string(), "ctrl+shift+`".to_string()]
        );

        send(&mut h.engine, Command::DeleteSnippet { id: sample }).await;
        assert_eq!(h.backend.bound_combos(), vec!["ctrl+shift+`".to_string()]);
    }

    #[tokio::test]
    async fn changing_main_hotkey_rebinds() {
        let mut h = harness();
        h.engine.start();
        let reply = send(
            &mut h.engine,
            Command::SetSetting {
                key: MAIN_HOTKEY.to_string(),
                value: "Alt+Space".to_string(),
            },
        )
        .await;
        assert!(reply.ok);
        assert!(h.backend.id_for("ctrl+shift+`").is_none());
        assert!(h.backend.id_for("alt+space").is_some());
    }

    #[tokio::test]
    async fn main_hotkey_wins_over_snippet_with_same_combo() {
        let mut h = harness();
        h.engine.start();
        let reply = send(
            &mut h.engine,
            Command::AddSnippet {
                draft: SnippetDraft::new("shadowed").hotkey("ctrl+shift+quoteleft"),
            },
        )
        .await;
        assert!(reply.ok);

        h.engine.register_hotkeys();
        assert_eq!(
            h.backend.bound_combos(),
            vec!["ctrl+shift+1".to_string(), "ctrl+shift+`".to_string()]
        );

        let main = h.backend.id_for("ctrl+shift+`").expect("main bound");
        h.engine.handle_event(AppEvent::Hotkey(main)).await;
        assert_eq!(h.engine.view().shows, 1);
        assert_eq!(h.gesture.count(), 0);
    }

    #[tokio::test]
    async fn duplicate_hotkey_reply_is_user_facing() {
        let mut h = harness();
        h.engine.start();
        let reply = send(
            &mut h.engine,
            Command::AddSnippet {
                draft: SnippetDraft::new("again").hotkey("ctrl+shift+1"),
            },
        )
        .await;
        assert!(!reply.ok);
        assert!(reply.user_facing);
    }

    #[tokio::test]
    async fn pasting_from_history_hides_it_first() {
        let mut h = harness();
        h.engine.start();
        h.engine.toggle_history();
        let sample = h.engine.repo().get_all().expect("list")[0].id;

        let reply = send(&mut h.engine, Command::PasteSnippet { id: sample }).await;

        assert!(reply.ok);
        assert!(!h.engine.view().is_visible());
        assert_eq!(
            h.clipboard.writes(),
            vec!["This is a sample snippet.".to_string()]
        );
    }

    #[tokio::test]
    async fn open_history_is_refreshed_on_new_text() {
        let mut h = harness();
        h.engine.toggle_history();
        h.engine.handle_clipboard_text("fresh").expect("insert");
        assert_eq!(h.engine.view().refreshes.len(), 2);
        assert_eq!(h.engine.view().refreshes[1].len(), 1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_and_unbinds() {
        let mut h = harness();
        h.engine.start();
        let (tx, rx) = mpsc::channel(8);
        tx.send(AppEvent::ClipboardText("queued".to_string()))
            .await
            .expect("send");
        tx.send(AppEvent::Shutdown).await.expect("send");

        let backend = h.backend.clone();
        h.engine.run(rx).await;

        assert!(backend.bound_combos().is_empty());
        assert!(h.watcher.is_stopped());
    }
}
