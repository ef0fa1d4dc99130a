//! Configurable Ctrl+key session shortcuts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session action a shortcut can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShortcutAction {
    CreateSession,
    NextSession,
    PreviousSession,
    RenameSession,
}

/// A `Ctrl + <code point>` binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardShortcut {
    /// Serialized as a binding such as `"ctrl + t"`.
    #[serde(rename = "key", with = "binding")]
    pub code_point: char,
    pub action: ShortcutAction,
}

impl KeyboardShortcut {
    pub fn new(code_point: char, action: ShortcutAction) -> Self {
        Self {
            code_point: code_point.to_ascii_lowercase(),
            action,
        }
    }
}

/// Error parsing a shortcut binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid shortcut binding {0:?}, expected \"ctrl + <key>\"")]
pub struct BindingParseError(String);

/// Parse `"ctrl + t"` (case and spacing insensitive) into its code point.
pub fn parse_binding(s: &str) -> Result<char, BindingParseError> {
    let err = || BindingParseError(s.to_string());
    let (modifier, key) = s.split_once('+').ok_or_else(err)?;
    if !modifier.trim().eq_ignore_ascii_case("ctrl") {
        return Err(err());
    }
    let mut chars = key.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c.to_ascii_lowercase()),
        _ => Err(err()),
    }
}

mod binding {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(code_point: &char, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("ctrl + {code_point}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<char, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_binding(&s).map_err(serde::de::Error::custom)
    }
}

/// Ordered shortcut list, fixed after load.
#[derive(Debug, Clone, Default)]
pub struct ShortcutTable {
    shortcuts: Vec<KeyboardShortcut>,
}

impl ShortcutTable {
    pub fn new(shortcuts: Vec<KeyboardShortcut>) -> Self {
        Self { shortcuts }
    }

    /// Action bound to `code_point`. Later entries win when several match.
    pub fn resolve(&self, code_point: char) -> Option<ShortcutAction> {
        let code_point = code_point.to_ascii_lowercase();
        self.shortcuts
            .iter()
            .rev()
            .find(|s| s.code_point == code_point)
            .map(|s| s.action)
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }
}
