//! Key model and terminal encoding.
//!
//! Keys arrive from crossterm (hardware keyboard) or from the extra-keys row
//! and macros. They are written to sessions as xterm byte sequences.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::modifiers::ModifierState;

/// A key the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// Function key `F1`..=`F12`.
    F(u8),
    /// Physical buttons that can be repurposed as virtual modifiers.
    VolumeUp,
    VolumeDown,
    Back,
}

impl Key {
    /// Parse a normalized extra-key name (`ESC`, `PGUP`, `F5`, ...).
    pub fn from_name(name: &str) -> Option<Key> {
        let key = match name {
            "SPACE" => Key::Char(' '),
            "ESC" => Key::Escape,
            "TAB" => Key::Tab,
            "HOME" => Key::Home,
            "END" => Key::End,
            "PGUP" => Key::PageUp,
            "PGDN" => Key::PageDown,
            "INS" => Key::Insert,
            "DEL" => Key::Delete,
            "BKSP" => Key::Backspace,
            "UP" => Key::Up,
            "DOWN" => Key::Down,
            "LEFT" => Key::Left,
            "RIGHT" => Key::Right,
            "ENTER" => Key::Enter,
            _ => {
                let n: u8 = name.strip_prefix('F')?.parse().ok()?;
                return (1..=12).contains(&n).then_some(Key::F(n));
            }
        };
        Some(key)
    }
}

/// Where a key event came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeySource {
    /// A full alphabetic hardware keyboard. It brings real modifiers, so
    /// volume buttons are never repurposed for its events.
    Keyboard,
    /// Device buttons, the soft keyboard, or the extra-keys row.
    #[default]
    Buttons,
}

/// A key-down or key-up event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    /// Modifiers physically held with the key.
    pub mods: ModifierState,
    pub source: KeySource,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            mods: ModifierState::NONE,
            source: KeySource::Buttons,
        }
    }

    pub fn with_mods(mut self, mods: ModifierState) -> Self {
        self.mods = mods;
        self
    }

    pub fn from_keyboard(mut self) -> Self {
        self.source = KeySource::Keyboard;
        self
    }

    /// Convert a crossterm event. Keys the router has no use for map to `None`.
    pub fn from_crossterm(event: &KeyEvent) -> Option<Self> {
        let mut mods = ModifierState {
            ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
            alt: event.modifiers.contains(KeyModifiers::ALT),
            shift: event.modifiers.contains(KeyModifiers::SHIFT),
            fn_: false,
        };
        let key = match event.code {
            KeyCode::Char(c) => {
                // The shifted character is already in `c`.
                mods.shift = false;
                Key::Char(c)
            }
            KeyCode::Enter => Key::Enter,
            KeyCode::Tab => Key::Tab,
            KeyCode::BackTab => {
                mods.shift = true;
                Key::Tab
            }
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Esc => Key::Escape,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::Insert => Key::Insert,
            KeyCode::Delete => Key::Delete,
            KeyCode::F(n) if (1..=12).contains(&n) => Key::F(n),
            _ => return None,
        };
        Some(Self {
            key,
            mods,
            source: KeySource::Keyboard,
        })
    }
}

/// Bytes for a code point with Ctrl folding, Shift upper-casing and the Alt
/// escape prefix.
pub fn encode_code_point(code_point: char, mods: ModifierState) -> Vec<u8> {
    let mut c = code_point;
    if mods.shift {
        c = c.to_uppercase().next().unwrap_or(c);
    }
    if mods.ctrl {
        if let Some(control) = control_char(c) {
            c = control;
        }
    }

    let mut out = Vec::with_capacity(5);
    if mods.alt {
        out.push(0x1b);
    }
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    out
}

fn control_char(c: char) -> Option<char> {
    let code = match c {
        'a'..='z' => c as u8 - b'a' + 1,
        'A'..='Z' => c as u8 - b'A' + 1,
        ' ' | '2' | '@' => 0,
        '[' | '3' => 27,
        '\\' | '4' => 28,
        ']' | '5' => 29,
        '^' | '6' => 30,
        '_' | '7' | '/' => 31,
        '8' | '?' => 127,
        _ => return None,
    };
    Some(char::from(code))
}

/// xterm bytes for `key`. `app_cursor` is DECCKM (application cursor keys).
pub fn encode_key(key: Key, mods: ModifierState, app_cursor: bool) -> Option<Vec<u8>> {
    let m = mods.xterm_param();
    let alt_prefixed = |bytes: &[u8]| {
        let mut out = Vec::with_capacity(bytes.len() + 1);
        if mods.alt {
            out.push(0x1b);
        }
        out.extend_from_slice(bytes);
        out
    };

    let bytes = match key {
        Key::Char(c) => encode_code_point(c, mods),
        Key::Enter => alt_prefixed(b"\r"),
        Key::Tab if mods.shift => b"\x1b[Z".to_vec(),
        Key::Tab => alt_prefixed(b"\t"),
        Key::Backspace => alt_prefixed(if mods.ctrl { b"\x08" } else { b"\x7f" }),
        Key::Escape => alt_prefixed(b"\x1b"),
        Key::Up => cursor(b'A', m, app_cursor),
        Key::Down => cursor(b'B', m, app_cursor),
        Key::Right => cursor(b'C', m, app_cursor),
        Key::Left => cursor(b'D', m, app_cursor),
        Key::Home => cursor(b'H', m, app_cursor),
        Key::End => cursor(b'F', m, app_cursor),
        Key::Insert => tilde(2, m),
        Key::Delete => tilde(3, m),
        Key::PageUp => tilde(5, m),
        Key::PageDown => tilde(6, m),
        Key::F(n @ 1..=4) => {
            let final_byte = b'P' + (n - 1);
            if m > 1 {
                format!("\x1b[1;{m}{}", final_byte as char).into_bytes()
            } else {
                vec![0x1b, b'O', final_byte]
            }
        }
        Key::F(n @ 5..=12) => {
            let code = [15, 17, 18, 19, 20, 21, 23, 24][usize::from(n - 5)];
            tilde(code, m)
        }
        Key::F(_) | Key::VolumeUp | Key::VolumeDown | Key::Back => return None,
    };
    Some(bytes)
}

fn cursor(final_byte: u8, m: u8, app_cursor: bool) -> Vec<u8> {
    if m > 1 {
        format!("\x1b[1;{m}{}", final_byte as char).into_bytes()
    } else if app_cursor {
        vec![0x1b, b'O', final_byte]
    } else {
        vec![0x1b, b'[', final_byte]
    }
}

fn tilde(code: u8, m: u8) -> Vec<u8> {
    if m > 1 {
        format!("\x1b[{code};{m}~").into_bytes()
    } else {
        format!("\x1b[{code}~").into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_folds_letters_and_alt_prefixes_escape() {
        assert_eq!(encode_code_point('c', ModifierState::ctrl()), vec![3]);
        assert_eq!(encode_code_point('x', ModifierState::ctrl_alt()), vec![0x1b, 0x18]);
        assert_eq!(encode_code_point(' ', ModifierState::ctrl()), vec![0]);
        assert_eq!(encode_code_point('b', ModifierState::alt()), b"\x1bb".to_vec());
        assert_eq!(encode_code_point('é', ModifierState::NONE), "é".as_bytes());
    }

    #[test]
    fn shift_uppercases() {
        let shift = ModifierState {
            shift: true,
            ..ModifierState::NONE
        };
        assert_eq!(encode_code_point('q', shift), b"Q".to_vec());
    }

    #[test]
    fn arrows_follow_cursor_mode() {
        let none = ModifierState::NONE;
        assert_eq!(encode_key(Key::Up, none, false).unwrap(), b"\x1b[A");
        assert_eq!(encode_key(Key::Up, none, true).unwrap(), b"\x1bOA");
        assert_eq!(
            encode_key(Key::Left, ModifierState::ctrl(), true).unwrap(),
            b"\x1b[1;5D"
        );
    }

    #[test]
    fn function_and_paging_keys() {
        let none = ModifierState::NONE;
        assert_eq!(encode_key(Key::F(1), none, false).unwrap(), b"\x1bOP");
        assert_eq!(encode_key(Key::F(5), none, false).unwrap(), b"\x1b[15~");
        assert_eq!(encode_key(Key::F(10), none, false).unwrap(), b"\x1b[21~");
        assert_eq!(encode_key(Key::F(12), none, false).unwrap(), b"\x1b[24~");
        assert_eq!(encode_key(Key::PageUp, none, false).unwrap(), b"\x1b[5~");
        assert_eq!(encode_key(Key::Insert, none, false).unwrap(), b"\x1b[2~");
        assert_eq!(encode_key(Key::VolumeUp, none, false), None);
    }

    #[test]
    fn parses_extra_key_names() {
        assert_eq!(Key::from_name("PGDN"), Some(Key::PageDown));
        assert_eq!(Key::from_name("SPACE"), Some(Key::Char(' ')));
        assert_eq!(Key::from_name("F11"), Some(Key::F(11)));
        assert_eq!(Key::from_name("F13"), None);
        assert_eq!(Key::from_name("FOO"), None);
    }

    #[test]
    fn converts_crossterm_events() {
        let event = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL | KeyModifiers::ALT);
        let input = KeyInput::from_crossterm(&event).unwrap();
        assert_eq!(input.key, Key::Char('n'));
        assert_eq!(input.mods, ModifierState::ctrl_alt());
        assert_eq!(input.source, KeySource::Keyboard);

        let event = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        let input = KeyInput::from_crossterm(&event).unwrap();
        assert_eq!(input.key, Key::Tab);
        assert!(input.mods.shift);

        let event = KeyEvent::new(KeyCode::CapsLock, KeyModifiers::NONE);
        assert!(KeyInput::from_crossterm(&event).is_none());
    }
}
