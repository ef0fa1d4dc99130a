//! Extra-keys row: button definitions, key name aliases and macro expansion.

use serde::{Deserialize, Serialize};

use super::keys::Key;
use super::modifiers::{ModifierState, SpecialButton};

/// Buttons handled by the host instead of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostButton {
    /// Toggle the on-screen keyboard.
    Keyboard,
    /// Paste from the clipboard.
    Paste,
    /// Toggle auto-scroll of the emulator.
    Scroll,
}

/// A single resolved extra-key token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraKey {
    Special(SpecialButton),
    Host(HostButton),
    Named(Key),
    /// Literal text, typed one code point at a time.
    Text(String),
}

impl ExtraKey {
    /// Resolve a token such as `"ESC"`, `"pageup"` or `"~"`.
    pub fn parse(token: &str) -> ExtraKey {
        let name = normalize(token);
        if let Some(button) = SpecialButton::from_key(&name) {
            return ExtraKey::Special(button);
        }
        match name.as_str() {
            "KEYBOARD" => return ExtraKey::Host(HostButton::Keyboard),
            "PASTE" => return ExtraKey::Host(HostButton::Paste),
            "SCROLL" => return ExtraKey::Host(HostButton::Scroll),
            _ => {}
        }
        match Key::from_name(&name) {
            Some(key) => ExtraKey::Named(key),
            None => ExtraKey::Text(name),
        }
    }
}

/// Map key name aliases to their canonical spelling. Tokens that are not a
/// known alias come back unchanged (text keeps its case).
pub fn normalize(token: &str) -> String {
    let upper = token.to_ascii_uppercase();
    let canonical = match upper.as_str() {
        "ESCAPE" => "ESC",
        "CONTROL" => "CTRL",
        "SHFT" => "SHIFT",
        "FUNCTION" => "FN",
        "RETURN" => "ENTER",
        "LT" => "LEFT",
        "RT" => "RIGHT",
        "DN" => "DOWN",
        "PAGEUP" | "PAGE_UP" | "PAGE-UP" => "PGUP",
        "PAGEDOWN" | "PAGE_DOWN" | "PAGE-DOWN" => "PGDN",
        "DELETE" => "DEL",
        "BACKSPACE" => "BKSP",
        "INSERT" => "INS",
        "BACKSLASH" => "\\",
        "QUOTE" => "\"",
        "APOSTROPHE" => "'",
        _ if is_known_name(&upper) => return upper,
        _ => return token.to_string(),
    };
    canonical.to_string()
}

fn is_known_name(upper: &str) -> bool {
    upper.len() > 1
        && (SpecialButton::from_key(upper).is_some()
            || Key::from_name(upper).is_some()
            || matches!(upper, "KEYBOARD" | "PASTE" | "SCROLL"))
}

/// One step of an expanded macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroStep {
    pub key: ExtraKey,
    pub mods: ModifierState,
}

/// Expand a macro such as `"CTRL ALT x"`.
///
/// Modifier tokens accumulate; every other token becomes one step carrying
/// the accumulated modifiers, after which the modifiers reset.
pub fn expand_macro(spec: &str) -> Vec<MacroStep> {
    let mut steps = Vec::new();
    let mut mods = ModifierState::NONE;
    for token in spec.split_whitespace() {
        match ExtraKey::parse(token) {
            ExtraKey::Special(button) => mods.set(button),
            key => {
                steps.push(MacroStep { key, mods });
                mods = ModifierState::NONE;
            }
        }
    }
    steps
}

/// A configured button of the extra-keys row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraKeyButton {
    /// Bare key name or text: `"ESC"`, `"/"`.
    Key(String),
    /// Macro: `{ macro = "CTRL d", display = "exit" }`.
    Macro {
        #[serde(rename = "macro")]
        keys: String,
        #[serde(default)]
        display: Option<String>,
    },
    /// Key with a custom label: `{ key = "ESC", display = "esc" }`.
    Labeled {
        key: String,
        #[serde(default)]
        display: Option<String>,
    },
}

impl ExtraKeyButton {
    pub fn is_macro(&self) -> bool {
        matches!(self, ExtraKeyButton::Macro { .. })
    }

    /// Label shown on the button.
    pub fn display(&self) -> &str {
        match self {
            ExtraKeyButton::Key(key) => key,
            ExtraKeyButton::Macro { keys, display } => display.as_deref().unwrap_or(keys),
            ExtraKeyButton::Labeled { key, display } => display.as_deref().unwrap_or(key),
        }
    }

    /// Steps this button produces when pressed.
    ///
    /// A plain key is a single step with no modifiers of its own; latched
    /// special buttons are applied by the router.
    pub fn steps(&self) -> Vec<MacroStep> {
        match self {
            ExtraKeyButton::Macro { keys, .. } => expand_macro(keys),
            ExtraKeyButton::Key(key) | ExtraKeyButton::Labeled { key, .. } => vec![MacroStep {
                key: ExtraKey::parse(key),
                mods: ModifierState::NONE,
            }],
        }
    }
}

/// Default row: `ESC / - HOME UP END PGUP` and `TAB CTRL ALT LEFT DOWN RIGHT PGDN`.
pub fn default_extra_keys() -> Vec<Vec<ExtraKeyButton>> {
    let row = |keys: &[&str]| {
        keys.iter()
            .map(|k| ExtraKeyButton::Key((*k).to_string()))
            .collect()
    };
    vec![
        row(&["ESC", "/", "-", "HOME", "UP", "END", "PGUP"]),
        row(&["TAB", "CTRL", "ALT", "LEFT", "DOWN", "RIGHT", "PGDN"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_alt_x_is_one_step_with_both_modifiers() {
        let steps = expand_macro("CTRL ALT x");
        assert_eq!(
            steps,
            vec![MacroStep {
                key: ExtraKey::Text("x".into()),
                mods: ModifierState::ctrl_alt(),
            }]
        );
    }

    #[test]
    fn modifiers_reset_after_each_key() {
        let steps = expand_macro("CTRL d   ESC SHIFT TAB ls");
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].mods, ModifierState::ctrl());
        assert_eq!(steps[1].key, ExtraKey::Named(Key::Escape));
        assert!(steps[1].mods.is_empty());
        assert!(steps[2].mods.shift);
        assert_eq!(steps[3].key, ExtraKey::Text("ls".into()));
        assert!(steps[3].mods.is_empty());
    }

    #[test]
    fn trailing_modifiers_produce_nothing() {
        assert!(expand_macro("CTRL ALT").is_empty());
        assert!(expand_macro("").is_empty());
    }

    #[test]
    fn aliases_resolve_to_canonical_names() {
        assert_eq!(ExtraKey::parse("escape"), ExtraKey::Named(Key::Escape));
        assert_eq!(ExtraKey::parse("PAGEUP"), ExtraKey::Named(Key::PageUp));
        assert_eq!(ExtraKey::parse("control"), ExtraKey::Special(SpecialButton::Ctrl));
        assert_eq!(ExtraKey::parse("Return"), ExtraKey::Named(Key::Enter));
        assert_eq!(ExtraKey::parse("PASTE"), ExtraKey::Host(HostButton::Paste));
        assert_eq!(ExtraKey::parse("BACKSLASH"), ExtraKey::Text("\\".into()));
        assert_eq!(ExtraKey::parse("a"), ExtraKey::Text("a".into()));
    }

    #[test]
    fn buttons_deserialize_in_every_shape() {
        #[derive(Deserialize)]
        struct Doc {
            keys: Vec<ExtraKeyButton>,
        }
        let doc: Doc = toml::from_str(
            r#"
            keys = [
                "ESC",
                { macro = "CTRL d", display = "exit" },
                { key = "TAB", display = "tab" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(doc.keys[0], ExtraKeyButton::Key("ESC".into()));
        assert!(doc.keys[1].is_macro());
        assert_eq!(doc.keys[1].display(), "exit");
        assert_eq!(doc.keys[2].display(), "tab");
        assert_eq!(
            doc.keys[2].steps()[0].key,
            ExtraKey::Named(Key::Tab)
        );
    }
}
