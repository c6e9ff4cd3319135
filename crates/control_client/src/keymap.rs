//! Keyboard bindings for driving the vehicle.
//!
//! A held key holds its command on: key-down sets it, key-up clears it.
//! Enter stops everything on key-down. Key repeat is passed through as
//! further key-downs.

use shared::{domain::Command, error::ControlError};

use crate::transmitter::CommandTransmitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Space,
    Enter,
}

impl Key {
    pub fn from_char(ch: char) -> Self {
        match ch {
            ' ' => Key::Space,
            '\n' | '\r' => Key::Enter,
            other => Key::Char(other.to_ascii_lowercase()),
        }
    }

    /// Maps a DOM `keyCode` (as sent by browser front-ends) to a key.
    pub fn from_key_code(code: u16) -> Option<Self> {
        match code {
            13 => Some(Key::Enter),
            32 => Some(Key::Space),
            65..=90 => char::from_u32(u32::from(code)).map(Key::from_char),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Hold(Command),
    StopAll,
}

pub const KEY_BINDINGS: [(Key, KeyAction); 10] = [
    (Key::Char('w'), KeyAction::Hold(Command::Forward)),
    (Key::Char('s'), KeyAction::Hold(Command::Reverse)),
    (Key::Char('a'), KeyAction::Hold(Command::Left)),
    (Key::Char('d'), KeyAction::Hold(Command::Right)),
    (Key::Char('q'), KeyAction::Hold(Command::TurretLeft)),
    (Key::Char('e'), KeyAction::Hold(Command::TurretRight)),
    (Key::Char('z'), KeyAction::Hold(Command::TurretElev)),
    (Key::Space, KeyAction::Hold(Command::Fire)),
    (Key::Char('i'), KeyAction::Hold(Command::Ignition)),
    (Key::Enter, KeyAction::StopAll),
];

pub fn action_for(key: Key) -> Option<KeyAction> {
    KEY_BINDINGS
        .iter()
        .find(|(bound, _)| *bound == key)
        .map(|(_, action)| *action)
}

/// Applies a key transition. Returns `Ok(false)` when the key is unbound or
/// the transition does nothing (releasing Enter).
pub fn handle_key(
    transmitter: &mut CommandTransmitter,
    key: Key,
    pressed: bool,
) -> Result<bool, ControlError> {
    match action_for(key) {
        Some(KeyAction::Hold(command)) => transmitter.set_command(command, pressed),
        Some(KeyAction::StopAll) if pressed => {
            transmitter.stop_all();
            Ok(true)
        }
        Some(KeyAction::StopAll) | None => Ok(false),
    }
}

#[cfg(test)]
#[path = "tests/keymap_tests.rs"]
mod tests;
