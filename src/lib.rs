pub mod clipboard;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod hotkey;
pub mod paste;
pub mod services;
pub mod utils;
pub mod view;

use std::io;
use std::sync::Arc;
use std::thread;

use clipboard::{watch_changes, ClipCallback, ClipboardWatcher};
use commands::{serve_lines, AppEvent};
use config::AppConfig;
use db::Database;
use error::{AppError, AppResult};
use hotkey::global::GlobalHotkeyBackend;
use hotkey::{HotkeyBackend, UnavailableBackend};
use paste::enigo::EnigoPaste;
use paste::PasteExecutor;
use services::clip_engine::ClipEngine;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use view::StdoutView;

const EVENT_QUEUE_CAPACITY: usize = 256;

fn hotkey_backend(events: &mpsc::Sender<AppEvent>) -> Box<dyn HotkeyBackend> {
    match GlobalHotkeyBackend::new() {
        Ok(backend) => {
            let events = events.clone();
            GlobalHotkeyBackend::forward_presses(move |id| {
                if let Err(err) = events.try_send(AppEvent::Hotkey(id)) {
                    warn!("dropping hotkey event: {err}");
                }
            });
            Box::new(backend)
        }
        Err(err) => {
            warn!("global hotkeys disabled: {err}");
            Box::new(UnavailableBackend::new(err.to_string()))
        }
    }
}

/// The watcher has already advanced its baseline when this runs, so a dropped
/// text would never be reported again. Runs on the watcher's own thread, which
/// may block until the event loop has room.
fn clipboard_forwarder(events: mpsc::Sender<AppEvent>) -> ClipCallback {
    Arc::new(move |text: String| {
        if events.blocking_send(AppEvent::ClipboardText(text)).is_err() {
            warn!("event loop stopped, clipboard text not stored");
        }
    })
}

async fn serve() -> AppResult<()> {
    let config = AppConfig::from_env()?;
    config.ensure_data_dir()?;
    info!("using data directory {}", config.data_dir.display());

    let db = Arc::new(Database::new(&config.db_path())?);
    let clipboard = clipboard::default_service()?;
    let watcher = Arc::new(ClipboardWatcher::new(clipboard));
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

    let paste = PasteExecutor::new(
        watcher.clone(),
        Arc::new(EnigoPaste::new()),
        config.settle_delay,
    );
    let mut engine = ClipEngine::new(
        db,
        watcher.clone(),
        hotkey_backend(&events_tx),
        paste,
        StdoutView::new(),
    );
    engine.start();

    watch_changes(
        &watcher,
        config.poll_interval,
        clipboard_forwarder(events_tx.clone()),
    )?;

    let command_tx = events_tx.clone();
    thread::Builder::new()
        .name("command-input".to_string())
        .spawn(move || serve_lines(io::stdin().lock(), io::stdout(), command_tx))
        .map_err(|err| AppError::Internal(err.to_string()))?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if events_tx.send(AppEvent::Shutdown).await.is_err() {
                warn!("event loop already stopped before shutdown request");
            }
        }
    });

    info!("snipkey running");
    engine.run(events_rx).await;
    Ok(())
}

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("failed to start runtime: {err}");
            return;
        }
    };

    if let Err(err) = runtime.block_on(serve()) {
        error!("snipkey stopped: {err}");
    }
}
