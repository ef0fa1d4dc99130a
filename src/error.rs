//! Error types for the session core.
//!
//! Registry and controller operations are total over stale handles, so the
//! only errors that reach callers are genuine resource exhaustion, backend
//! failures, and persistence problems.

use thiserror::Error;

use crate::session::SessionHandle;

/// Errors raised while creating or driving sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The registry already holds the maximum number of sessions.
    #[error("maximum number of sessions reached ({max})")]
    CapacityExceeded { max: usize },

    /// A handle no longer resolves in the registry.
    #[error("no session with handle {0}")]
    UnknownHandle(SessionHandle),

    /// The process backend could not start the shell.
    #[error("failed to start session process: {0}")]
    BackendSpawnFailure(String),
}

impl SessionError {
    /// Capacity problems are shown as a blocking dialog, everything else as a
    /// transient notice.
    pub fn is_modal(&self) -> bool {
        matches!(self, SessionError::CapacityExceeded { .. })
    }
}

/// Errors raised by the current-session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be read or written.
    #[error("session state unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::PersistenceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::PersistenceUnavailable(err.to_string())
    }
}
