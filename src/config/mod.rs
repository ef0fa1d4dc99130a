//! Configuration for termhost.
//!
//! Loaded once at startup from `$XDG_CONFIG_HOME/termhost/config.toml`. Every
//! field has a default, so a missing file or a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::input::extra_keys::{default_extra_keys, ExtraKeyButton};
use crate::input::{KeyboardShortcut, RouterSettings, ShortcutTable};

const DEFAULT_FAILSAFE_SHELL: &str = "/bin/sh";

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Working directory for new sessions when there is no current session.
    pub default_working_directory: PathBuf,

    /// Shell for normal sessions; `$SHELL` when unset.
    pub shell: Option<String>,

    /// Minimal shell for failsafe sessions.
    pub failsafe_shell: String,

    pub bell_behaviour: BellBehaviour,

    /// Disable the Ctrl+Alt command table.
    pub disable_hardware_keyboard_shortcuts: bool,

    /// Stop treating volume keys as virtual Ctrl/Fn.
    pub disable_virtual_volume_keys: bool,

    /// Don't show a toast when switching sessions.
    pub disable_session_change_toasts: bool,

    /// Rows of extra-keys buttons.
    pub extra_keys: Vec<Vec<ExtraKeyButton>>,

    /// Ctrl+key session shortcuts. Later entries win on collision.
    pub shortcuts: Vec<KeyboardShortcut>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_working_directory: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            shell: None,
            failsafe_shell: DEFAULT_FAILSAFE_SHELL.to_string(),
            bell_behaviour: BellBehaviour::default(),
            disable_hardware_keyboard_shortcuts: false,
            disable_virtual_volume_keys: false,
            disable_session_change_toasts: false,
            extra_keys: default_extra_keys(),
            shortcuts: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from disk, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, or return default if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate();
        Ok(config)
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not find config directory")?;

        Ok(config_dir.join("termhost").join("config.toml"))
    }

    /// Replace unusable values with defaults.
    pub fn validate(&mut self) {
        if self.failsafe_shell.trim().is_empty() {
            self.failsafe_shell = DEFAULT_FAILSAFE_SHELL.to_string();
        }
        if self.shell.as_deref().is_some_and(|s| s.trim().is_empty()) {
            self.shell = None;
        }
        self.extra_keys.retain(|row| !row.is_empty());
    }

    /// Router settings derived from this configuration.
    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            hardware_shortcuts: !self.disable_hardware_keyboard_shortcuts,
            virtual_volume_keys: !self.disable_virtual_volume_keys,
            shortcuts: ShortcutTable::new(self.shortcuts.clone()),
        }
    }
}

/// What happens when a session rings the bell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BellBehaviour {
    /// Tell the UI, which flashes or vibrates.
    #[default]
    Vibrate,
    /// Play the bell sound.
    Beep,
    Ignore,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ShortcutAction;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.failsafe_shell, "/bin/sh");
        assert_eq!(config.bell_behaviour, BellBehaviour::Vibrate);
        assert_eq!(config.extra_keys.len(), 2);
        assert!(config.shortcuts.is_empty());

        let settings = config.router_settings();
        assert!(settings.hardware_shortcuts);
        assert!(settings.virtual_volume_keys);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.bell_behaviour, BellBehaviour::Vibrate);
    }

    #[test]
    fn loads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            bell_behaviour = "beep"
            disable_virtual_volume_keys = true
            failsafe_shell = "  "
            extra_keys = [["ESC", { macro = "CTRL c", display = "^C" }], []]
            shortcuts = [
                { key = "ctrl + t", action = "create-session" },
                { key = "ctrl + 2", action = "next-session" },
            ]
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.bell_behaviour, BellBehaviour::Beep);
        assert_eq!(config.failsafe_shell, "/bin/sh");
        assert_eq!(config.extra_keys.len(), 1);
        assert!(config.extra_keys[0][1].is_macro());

        let settings = config.router_settings();
        assert!(!settings.virtual_volume_keys);
        assert_eq!(settings.shortcuts.resolve('t'), Some(ShortcutAction::CreateSession));
        assert_eq!(settings.shortcuts.resolve('2'), Some(ShortcutAction::NextSession));
    }

    #[test]
    fn invalid_file_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "bell_behaviour = \"loud\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }
}
