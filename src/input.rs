// Synthetic input sent to the tracked application.
// Visual expectation: the game's view turns (pointer motion) or a character
// acts (key held), exactly as if the user did it.

use crate::error::Error;
use enigo::{Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use std::str::FromStr;

/// Raw input primitives the view controller and CLI drive.
pub trait InputSink {
    /// Relative pointer motion, both axes in one OS call.
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), Error>;
    fn key_down(&mut self, key: KeyCode) -> Result<(), Error>;
    fn key_up(&mut self, key: KeyCode) -> Result<(), Error>;
}

/// Keys the tool can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Space,
    Shift,
    Control,
    Alt,
}

impl FromStr for KeyCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "space" => Ok(KeyCode::Space),
            "shift" => Ok(KeyCode::Shift),
            "ctrl" | "control" => Ok(KeyCode::Control),
            "alt" => Ok(KeyCode::Alt),
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() => Ok(KeyCode::Char(c)),
                    _ => Err(Error::Input(format!("unknown key '{s}'"))),
                }
            }
        }
    }
}

impl From<KeyCode> for Key {
    fn from(k: KeyCode) -> Key {
        match k {
            KeyCode::Char(c) => Key::Unicode(c),
            KeyCode::Space => Key::Space,
            KeyCode::Shift => Key::Shift,
            KeyCode::Control => Key::Control,
            KeyCode::Alt => Key::Alt,
        }
    }
}

/// OS-backed input via enigo.
pub struct OsInput {
    enigo: Enigo,
}

impl OsInput {
    pub fn new() -> Result<Self, Error> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| Error::Input(format!("Connect input backend: {e}")))?;
        Ok(Self { enigo })
    }

    /// Absolute pointer position on the desktop.
    pub fn cursor_position(&self) -> Result<(i32, i32), Error> {
        self.enigo
            .location()
            .map_err(|e| Error::Input(format!("Read pointer location: {e}")))
    }
}

impl InputSink for OsInput {
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), Error> {
        self.enigo
            .move_mouse(dx, dy, Coordinate::Rel)
            .map_err(|e| Error::Input(format!("Move pointer by ({dx},{dy}): {e}")))
    }

    fn key_down(&mut self, key: KeyCode) -> Result<(), Error> {
        self.enigo
            .key(key.into(), Direction::Press)
            .map_err(|e| Error::Input(format!("Press {key:?}: {e}")))
    }

    fn key_up(&mut self, key: KeyCode) -> Result<(), Error> {
        self.enigo
            .key(key.into(), Direction::Release)
            .map_err(|e| Error::Input(format!("Release {key:?}: {e}")))
    }
}

/// Press `key`, wait `duration`, release it.
pub fn hold_key<S: InputSink>(sink: &mut S, key: KeyCode, duration: std::time::Duration) -> Result<(), Error> {
    sink.key_down(key)?;
    std::thread::sleep(duration);
    sink.key_up(key)
}
