use enigo::{
    Direction::{self, Click, Press, Release},
    Enigo, Key, Keyboard, Settings,
};

use super::{PasteError, PasteGesture};

/// Sends the platform paste chord with enigo. A fresh connection is opened
/// per gesture since pastes are rare and enigo handles are not `Sync`.
#[derive(Debug, Default)]
pub struct EnigoPaste;

impl EnigoPaste {
    pub fn new() -> Self {
        Self
    }
}

impl PasteGesture for EnigoPaste {
    fn send_paste(&self) -> Result<(), PasteError> {
        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|err| PasteError::Unavailable(err.to_string()))?;

        #[cfg(target_os = "macos")]
        let modifier = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = Key::Control;

        paste_chord(&mut enigo, modifier)
    }
}

trait KeyInput {
    fn key(&mut self, key: Key, direction: Direction) -> Result<(), String>;
}

impl KeyInput for Enigo {
    fn key(&mut self, key: Key, direction: Direction) -> Result<(), String> {
        Keyboard::key(self, key, direction).map_err(|err| err.to_string())
    }
}

/// Once the modifier is down it is always released, even if the `v` click
/// failed. The first error wins.
fn paste_chord(input: &mut impl KeyInput, modifier: Key) -> Result<(), PasteError> {
    input.key(modifier, Press).map_err(PasteError::Gesture)?;
    let clicked = input.key(Key::Unicode('v'), Click);
    let released = input.key(modifier, Release);
    clicked.and(released).map_err(PasteError::Gesture)
}
