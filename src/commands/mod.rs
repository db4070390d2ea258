use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::error::AppError;
use crate::hotkey::BindingId;
use crate::services::snippets::SnippetDraft;

/// Everything the application thread reacts to.
#[derive(Debug)]
pub enum AppEvent {
    ClipboardText(String),
    Hotkey(BindingId),
    Command(Command, oneshot::Sender<CommandReply>),
    Shutdown,
}

/// Calls the UI layer makes into the core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum Command {
    ListSnippets,
    AddSnippet { draft: SnippetDraft },
    UpdateSnippet { id: i64, draft: SnippetDraft },
    DeleteSnippet { id: i64 },
    SetPinned { id: i64, pinned: bool },
    GetSetting { key: String },
    SetSetting { key: String, value: String },
    PasteSnippet { id: i64 },
    ToggleHistory,
    Quit,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub user_facing: bool,
}

impl CommandReply {
    pub fn empty() -> Self {
        Self {
            ok: true,
            data: None,
            error: None,
            user_facing: false,
        }
    }

    pub fn success<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                data: Some(value),
                ..Self::empty()
            },
            Err(err) => Self::failure(&AppError::Internal(err.to_string())),
        }
    }

    pub fn failure(err: &AppError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(err.to_string()),
            user_facing: err.is_user_facing(),
        }
    }
}

pub fn parse_command(line: &str) -> Result<Command, serde_json::Error> {
    serde_json::from_str(line)
}

/// Reads one JSON command per line and writes one JSON reply per line.
/// Blocking; run it on its own thread.
pub fn serve_lines<R, W>(input: R, mut output: W, events: mpsc::Sender<AppEvent>)
where
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("failed to read command input: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let (reply, quit) = match parse_command(&line) {
            Ok(command) => {
                let quit = command == Command::Quit;
                let (reply_tx, reply_rx) = oneshot::channel();
                if events
                    .blocking_send(AppEvent::Command(command, reply_tx))
                    .is_err()
                {
                    break;
                }
                match reply_rx.blocking_recv() {
                    Ok(reply) => (reply, quit),
                    Err(_) => break,
                }
            }
            Err(err) => (
                CommandReply::failure(&AppError::Validation(format!("bad command: {err}"))),
                false,
            ),
        };

        match serde_json::to_string(&reply) {
            Ok(json) => {
                if writeln!(output, "{json}").and_then(|_| output.flush()).is_err() {
                    break;
                }
            }
            Err(err) => warn!("failed to serialize reply: {err}"),
        }

        if quit {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::thread;

    use super::*;

    #[test]
    fn parses_tagged_commands() {
        assert_eq!(
            parse_command(r#"{"cmd":"setPinned","id":3,"pinned":true}"#).expect("parse"),
            Command::SetPinned { id: 3, pinned: true }
        );
        let add = parse_command(
            r#"{"cmd":"addSnippet","draft":{"content":"hi","hotkey":"ctrl+shift+2"}}"#,
        )
        .expect("parse");
        assert_eq!(
            add,
            Command::AddSnippet {
                draft: SnippetDraft::new("hi").hotkey("ctrl+shift+2")
            }
        );
        assert!(parse_command(r#"{"cmd":"explode"}"#).is_err());
    }

    #[test]
    fn failure_reply_marks_user_facing_errors() {
        let reply = CommandReply::failure(&AppError::DuplicateHotkey("ctrl+1".to_string()));
        assert!(!reply.ok);
        assert!(reply.user_facing);

        let json = serde_json::to_value(CommandReply::empty()).expect("json");
        assert_eq!(json, serde_json::json!({"ok": true, "userFacing": false}));
    }

    #[tokio::test]
    async fn serve_lines_round_trips_through_the_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let input = "{\"cmd\":\"getSetting\",\"key\":\"history_limit\"}\nnot json\n{\"cmd\":\"quit\"}\n{\"cmd\":\"listSnippets\"}\n";

        let worker = thread::spawn(move || {
            let mut out = Vec::new();
            serve_lines(Cursor::new(input), &mut out, tx);
            String::from_utf8(out).expect("utf8")
        });

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            if let AppEvent::Command(command, reply) = event {
                seen.push(command);
                let _ = reply.send(CommandReply::success(&"15"));
            }
        }

        let output = worker.join().expect("worker");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], Command::Quit);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"data\":\"15\""));
        assert!(lines[1].contains("\"ok\":false"));
    }
}
