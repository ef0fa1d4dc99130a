//! Ordered collection of live sessions.
//!
//! The registry is the sole owner of [`Session`]s. It hands out stable
//! [`SessionHandle`]s, enforces [`MAX_SESSIONS`], and keeps sessions in
//! creation order. Indices are only meaningful until the next mutation.

use std::path::Path;
use std::sync::mpsc::Sender;

use tracing::{debug, info};

use super::backend::ProcessBackend;
use super::terminal::Session;
use super::types::{BackendEvent, SessionHandle, SpawnRequest};
use crate::error::SessionError;

/// Maximum number of concurrent sessions.
pub const MAX_SESSIONS: usize = 8;

/// Owns all sessions of the host.
pub struct SessionRegistry {
    sessions: Vec<Session>,
    backend: Box<dyn ProcessBackend>,
    /// Cloned into every spawned process for its output/exit notifications.
    events_tx: Sender<BackendEvent>,
    /// Terminal size used for newly spawned sessions.
    size: (u16, u16),
}

impl SessionRegistry {
    pub fn new(backend: Box<dyn ProcessBackend>, events_tx: Sender<BackendEvent>) -> Self {
        Self {
            sessions: Vec::new(),
            backend,
            events_tx,
            size: (24, 80),
        }
    }

    /// Create an interactive shell session in `cwd`.
    pub fn create(
        &mut self,
        failsafe: bool,
        name: Option<String>,
        cwd: &Path,
    ) -> Result<&Session, SessionError> {
        self.create_with(SpawnRequest::shell(cwd, failsafe, name))
    }

    /// Create a session from a full spawn request.
    ///
    /// Nothing is registered when the capacity check or the spawn fails.
    pub fn create_with(&mut self, request: SpawnRequest) -> Result<&Session, SessionError> {
        if self.sessions.len() >= MAX_SESSIONS {
            return Err(SessionError::CapacityExceeded { max: MAX_SESSIONS });
        }

        let (rows, cols) = self.size;
        let request = request.with_size(rows, cols);
        let handle = SessionHandle::new();
        let process = self
            .backend
            .spawn(handle, &request, self.events_tx.clone())?;

        info!(%handle, cwd = %request.cwd.display(), failsafe = request.failsafe, "session created");
        self.sessions.push(Session::new(handle, &request, process));
        Ok(&self.sessions[self.sessions.len() - 1])
    }

    /// Remove a session, killing its process if it is still running.
    ///
    /// Returns the index the session had before removal, or `None` when the
    /// handle is unknown (the session may already be gone).
    pub fn remove(&mut self, handle: SessionHandle) -> Option<usize> {
        let index = self.index_of(handle)?;
        let mut session = self.sessions.remove(index);
        session.kill();
        debug!(%handle, index, "session removed");
        Some(index)
    }

    pub fn get(&self, handle: SessionHandle) -> Option<&Session> {
        self.sessions.iter().find(|s| s.handle() == handle)
    }

    pub fn get_mut(&mut self, handle: SessionHandle) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.handle() == handle)
    }

    pub fn get_by_index(&self, index: usize) -> Option<&Session> {
        self.sessions.get(index)
    }

    pub fn index_of(&self, handle: SessionHandle) -> Option<usize> {
        self.sessions.iter().position(|s| s.handle() == handle)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= MAX_SESSIONS
    }

    /// Most recently created session still present.
    pub fn last(&self) -> Option<&Session> {
        self.sessions.last()
    }

    /// First session, in creation order, whose working directory is `path`.
    pub fn find_by_cwd(&self, path: &Path) -> Option<&Session> {
        self.sessions.iter().find(|s| s.cwd() == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }

    pub fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.iter().map(Session::handle).collect()
    }

    /// Resize every session and remember the size for new ones.
    pub fn resize_all(&mut self, rows: u16, cols: u16) {
        self.size = (rows, cols);
        for session in &mut self.sessions {
            if let Err(e) = session.resize(rows, cols) {
                debug!(handle = %session.handle(), "resize failed: {e}");
            }
        }
    }
}
