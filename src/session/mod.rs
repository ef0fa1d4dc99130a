//! Terminal sessions and their process backend.
//!
//! This module provides:
//! - `SessionRegistry` - Owns every session, in creation order
//! - `Session` - A child process plus its `vt100` emulator state
//! - `ProcessBackend` / `PtyBackend` - Spawning children on a pseudo-terminal

pub mod backend;
pub mod registry;
pub mod terminal;
pub mod types;

pub use backend::{ProcessBackend, ProcessHandle, PtyBackend};
pub use registry::{SessionRegistry, MAX_SESSIONS};
pub use terminal::{OutputChanges, Session};
pub use types::{BackendEvent, SessionHandle, SpawnRequest};
