use std::fmt;
use std::str::FromStr;

use super::HotkeyError;

const MODIFIER_NAMES: [&str; 3] = ["ctrl", "shift", "alt"];

/// Folds alternative names for one physical key onto a single spelling, so
/// stored combos compare equal exactly when they bind the same key.
fn canonical_key(key: &str) -> &str {
    match key {
        "backquote" | "quoteleft" => "`",
        "minus" => "-",
        "equal" => "=",
        "bracketleft" => "[",
        "bracketright" => "]",
        "backslash" => "\\",
        "semicolon" => ";",
        "apostrophe" | "quote" => "'",
        "comma" => ",",
        "period" => ".",
        "slash" => "/",
        "return" => "enter",
        "esc" => "escape",
        other => other,
    }
}

/// A normalized key combination such as `ctrl+shift+1`.
///
/// Modifiers appear at most once and always in `ctrl`, `shift`, `alt` order,
/// followed by exactly one lowercase base key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combo {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub key: String,
}

impl Combo {
    /// Trims and lower-cases user input first. Blank input means "unbound".
    pub fn normalize(raw: &str) -> Result<Option<Combo>, HotkeyError> {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() {
            return Ok(None);
        }
        lowered.parse().map(Some)
    }
}

impl FromStr for Combo {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HotkeyError::InvalidCombo(s.to_string());

        let mut rest = s;
        let mut flags = [false; 3];
        for (flag, name) in flags.iter_mut().zip(MODIFIER_NAMES) {
            if let Some(tail) = rest.strip_prefix(name).and_then(|t| t.strip_prefix('+')) {
                *flag = true;
                rest = tail;
            }
        }

        let key = rest;
        let key_is_valid = !key.is_empty()
            && !key.contains('+')
            && !key.chars().any(|c| c.is_whitespace() || c.is_uppercase())
            && !MODIFIER_NAMES.contains(&key);
        if !key_is_valid {
            return Err(invalid());
        }

        Ok(Combo {
            ctrl: flags[0],
            shift: flags[1],
            alt: flags[2],
            key: canonical_key(key).to_string(),
        })
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("ctrl+")?;
        }
        if self.shift {
            f.write_str("shift+")?;
        }
        if self.alt {
            f.write_str("alt+")?;
        }
        f.write_str(&self.key)
    }
}
