//! Durable storage for the current-session handle.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::session::SessionHandle;

/// Key-value store for the handle that was current when the host went to
/// the background.
pub trait SessionStore {
    fn current_session(&self) -> Result<Option<SessionHandle>, StoreError>;
    fn set_current_session(&self, handle: Option<SessionHandle>) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    #[serde(default)]
    current_session: Option<SessionHandle>,
}

/// JSON state file, by default `$XDG_DATA_HOME/termhost/state.json`.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Store at the default location.
    pub fn open() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .context("Could not find data directory")?
            .join("termhost");
        Ok(Self::at(data_dir.join("state.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<State, StoreError> {
        if !self.path.exists() {
            return Ok(State::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl SessionStore for JsonStore {
    fn current_session(&self) -> Result<Option<SessionHandle>, StoreError> {
        Ok(self.read()?.current_session)
    }

    fn set_current_session(&self, handle: Option<SessionHandle>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let state = State {
            current_session: handle,
        };
        let content = serde_json::to_string_pretty(&state)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// In-memory store for tests and hosts without a data directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    current: RefCell<Option<SessionHandle>>,
}

impl SessionStore for MemoryStore {
    fn current_session(&self) -> Result<Option<SessionHandle>, StoreError> {
        Ok(*self.current.borrow())
    }

    fn set_current_session(&self, handle: Option<SessionHandle>) -> Result<(), StoreError> {
        *self.current.borrow_mut() = handle;
        Ok(())
    }
}
