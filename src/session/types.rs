//! Identifiers and messages shared between sessions, the process backend and
//! the UI loop.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable, opaque identifier for a session.
///
/// Handles are the only session reference other components may keep. They
/// stay valid regardless of the session's position in the registry and never
/// repeat, not even across host restarts, so a persisted handle can only ever
/// resolve to the session it was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(Uuid);

impl SessionHandle {
    /// Allocate a fresh handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Everything the process backend needs to start a session's child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Initial working directory of the child.
    pub cwd: PathBuf,
    /// Start the minimal fallback shell instead of the configured one.
    pub failsafe: bool,
    /// User-visible session name.
    pub name: Option<String>,
    /// Program to run; `None` means the backend's default shell.
    pub program: Option<String>,
    pub args: Vec<String>,
    /// Extra environment on top of the backend's defaults.
    pub env: Vec<(String, String)>,
    /// Exit must be reported back to an external caller without waiting for
    /// the user to dismiss the session.
    pub pending_result: bool,
    pub rows: u16,
    pub cols: u16,
}

impl SpawnRequest {
    /// Plain interactive shell request.
    pub fn shell(cwd: impl Into<PathBuf>, failsafe: bool, name: Option<String>) -> Self {
        Self {
            cwd: cwd.into(),
            failsafe,
            name,
            program: None,
            args: Vec::new(),
            env: Vec::new(),
            pending_result: false,
            rows: 24,
            cols: 80,
        }
    }

    /// Run `program` and report its result as soon as it exits.
    pub fn command(
        cwd: impl Into<PathBuf>,
        program: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            program: Some(program.into()),
            args,
            pending_result: true,
            ..Self::shell(cwd, false, None)
        }
    }

    pub fn with_size(mut self, rows: u16, cols: u16) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }
}

/// Message sent from a session's I/O threads to the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// Bytes read from the pseudo-terminal.
    Output { handle: SessionHandle, data: Vec<u8> },
    /// The child exited; `code` is `None` when the status could not be read.
    Exited {
        handle: SessionHandle,
        code: Option<i32>,
    },
}

impl BackendEvent {
    pub fn handle(&self) -> SessionHandle {
        match self {
            BackendEvent::Output { handle, .. } | BackendEvent::Exited { handle, .. } => *handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_parse_back() {
        let a = SessionHandle::new();
        let b = SessionHandle::new();
        assert_ne!(a, b);

        let parsed: SessionHandle = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn command_request_expects_a_result() {
        let req = SpawnRequest::command("/tmp", "make", vec!["test".into()]);
        assert!(req.pending_result);
        assert!(!req.failsafe);
        assert_eq!(req.program.as_deref(), Some("make"));

        let req = SpawnRequest::shell("/tmp", true, Some("build".into())).with_size(40, 120);
        assert!(!req.pending_result);
        assert_eq!((req.rows, req.cols), (40, 120));
    }
}
