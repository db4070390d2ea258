//! Global hotkeys through the `global-hotkey` crate.

use std::collections::HashMap;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tracing::info;

use super::{BindingId, Combo, HotkeyBackend, HotkeyError};

pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    active: HashMap<BindingId, HotKey>,
}

impl GlobalHotkeyBackend {
    pub fn new() -> Result<Self, HotkeyError> {
        let manager = GlobalHotKeyManager::new().map_err(|err| HotkeyError::OsRejected {
            combo: String::new(),
            reason: format!("hotkey manager unavailable: {err}"),
        })?;
        Ok(Self {
            manager,
            active: HashMap::new(),
        })
    }

    /// Forwards key presses from the OS event thread. `on_press` must not block.
    pub fn forward_presses<F>(on_press: F)
    where
        F: Fn(BindingId) + Send + Sync + 'static,
    {
        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if event.state == HotKeyState::Pressed {
                on_press(event.id);
            }
        }));
        info!("global hotkey events forwarded to the application queue");
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn bind(&mut self, combo: &Combo) -> Result<BindingId, HotkeyError> {
        let hotkey = to_hotkey(combo)?;
        self.manager
            .register(hotkey)
            .map_err(|err| rejected(combo, err))?;
        let id = hotkey.id();
        self.active.insert(id, hotkey);
        Ok(id)
    }

    fn unbind(&mut self, id: BindingId) -> Result<(), HotkeyError> {
        let Some(hotkey) = self.active.remove(&id) else {
            return Ok(());
        };
        self.manager
            .unregister(hotkey)
            .map_err(|err| HotkeyError::OsRejected {
                combo: id.to_string(),
                reason: err.to_string(),
            })
    }
}

fn rejected(combo: &Combo, err: impl std::fmt::Display) -> HotkeyError {
    HotkeyError::OsRejected {
        combo: combo.to_string(),
        reason: err.to_string(),
    }
}

pub fn to_hotkey(combo: &Combo) -> Result<HotKey, HotkeyError> {
    let code = key_code(&combo.key).ok_or_else(|| rejected(combo, "unsupported key"))?;

    let mut modifiers = Modifiers::empty();
    if combo.ctrl {
        modifiers |= Modifiers::CONTROL;
    }
    if combo.shift {
        modifiers |= Modifiers::SHIFT;
    }
    if combo.alt {
        modifiers |= Modifiers::ALT;
    }
    let modifiers = (!modifiers.is_empty()).then_some(modifiers);

    Ok(HotKey::new(modifiers, code))
}

/// Expects the spelling `Combo` parsing produces; aliases are folded there.
fn key_code(key: &str) -> Option<Code> {
    let code = match key {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        "`" => Code::Backquote,
        "-" => Code::Minus,
        "=" => Code::Equal,
        "[" => Code::BracketLeft,
        "]" => Code::BracketRight,
        "\\" => Code::Backslash,
        ";" => Code::Semicolon,
        "'" => Code::Quote,
        "," => Code::Comma,
        "." => Code::Period,
        "/" => Code::Slash,
        "space" => Code::Space,
        "enter" => Code::Enter,
        "tab" => Code::Tab,
        "escape" => Code::Escape,
        "backspace" => Code::Backspace,
        "insert" => Code::Insert,
        "delete" => Code::Delete,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "up" => Code::ArrowUp,
        "down" => Code::ArrowDown,
        "left" => Code::ArrowLeft,
        "right" => Code::ArrowRight,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(raw: &str) -> Combo {
        raw.parse().expect("valid combo")
    }

    #[test]
    fn main_hotkey_maps_to_backquote() {
        let hotkey = to_hotkey(&combo("ctrl+shift+`")).expect("hotkey");
        assert_eq!(
            hotkey,
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::Backquote)
        );
    }

    #[test]
    fn bare_key_has_no_modifiers() {
        let hotkey = to_hotkey(&combo("f9")).expect("hotkey");
        assert_eq!(hotkey, HotKey::new(None, Code::F9));
    }

    #[test]
    fn distinct_combos_get_distinct_ids() {
        let a = to_hotkey(&combo("ctrl+shift+1")).expect("a");
        let b = to_hotkey(&combo("ctrl+shift+2")).expect("b");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn aliased_spellings_bind_the_same_key() {
        let escape = to_hotkey(&combo("alt+esc")).expect("esc");
        assert_eq!(escape, HotKey::new(Some(Modifiers::ALT), Code::Escape));
        assert_eq!(
            to_hotkey(&combo("ctrl+quoteleft")).expect("quoteleft"),
            to_hotkey(&combo("ctrl+`")).expect("backquote")
        );
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(matches!(
            to_hotkey(&combo("alt+mediaplay")),
            Err(HotkeyError::OsRejected { .. })
        ));
    }
}
