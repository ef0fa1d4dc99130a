//! Session lifecycle methods on Host.

use std::path::{Path, PathBuf};
use std::sync::mpsc::TryRecvError;

use tracing::{debug, info, warn};

use super::*;
use crate::notice::Notice;
use crate::session::SpawnRequest;

impl Host {
    /// Start a new shell session and make it current.
    ///
    /// Without an explicit `cwd` the session starts in the current session's
    /// working directory, or the configured default when there is none.
    /// Failures are reported as notices; the current session is unchanged.
    pub fn new_session(
        &mut self,
        failsafe: bool,
        name: Option<String>,
        cwd: Option<PathBuf>,
    ) -> Option<SessionHandle> {
        let cwd = cwd
            .or_else(|| self.current_session().map(Session::cwd))
            .unwrap_or_else(|| self.config.default_working_directory.clone());
        self.spawn(SpawnRequest::shell(cwd, failsafe, name))
    }

    /// Run `program` in a new session whose exit status is reported back as
    /// soon as it finishes.
    pub fn run_command(
        &mut self,
        cwd: &Path,
        program: &str,
        args: Vec<String>,
    ) -> Option<SessionHandle> {
        self.spawn(SpawnRequest::command(cwd, program, args))
    }

    /// Switch to the first session already in `cwd`, or start one there.
    pub fn open_in(&mut self, cwd: &Path) -> Option<SessionHandle> {
        if let Some(handle) = self.registry.find_by_cwd(cwd).map(Session::handle) {
            self.active.set_current(&self.registry, handle, &mut self.sink);
            return Some(handle);
        }
        self.new_session(false, None, Some(cwd.to_path_buf()))
    }

    fn spawn(&mut self, request: SpawnRequest) -> Option<SessionHandle> {
        match self.registry.create_with(request) {
            Ok(session) => {
                let handle = session.handle();
                self.active.set_current(&self.registry, handle, &mut self.sink);
                Some(handle)
            }
            Err(e) => {
                warn!("failed to create session: {e}");
                let notice = if e.is_modal() {
                    Notice::dialog(e.to_string())
                } else {
                    Notice::error(e.to_string())
                };
                self.sink.notice(notice);
                None
            }
        }
    }

    pub fn set_current(&mut self, handle: SessionHandle) {
        self.active.set_current(&self.registry, handle, &mut self.sink);
    }

    pub fn switch_relative(&mut self, forward: bool) {
        self.active
            .switch_relative(&self.registry, forward, &mut self.sink);
    }

    pub fn switch_to_index(&mut self, index: usize) {
        self.active
            .switch_to_index(&self.registry, index, &mut self.sink);
    }

    /// Dismiss a session, killing it if it is still running.
    pub fn remove_session(&mut self, handle: SessionHandle) {
        self.active
            .remove_finished(&mut self.registry, handle, &mut self.sink);
    }

    /// Rename a session. Unknown handles are ignored.
    pub fn rename_session(&mut self, handle: SessionHandle, name: &str) {
        if let Some(session) = self.registry.get_mut(handle) {
            session.set_name(name);
            debug!(%handle, name = ?session.name(), "session renamed");
        }
    }

    /// Pull pending backend notifications into the sessions, at most
    /// [`PUMP_BUDGET`] per call so a flooding session cannot starve input.
    /// Returns the number of notifications handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while handled < PUMP_BUDGET {
            match self.backend_rx.try_recv() {
                Ok(event) => {
                    self.handle_backend_event(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        handled
    }

    fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Output { handle, data } => self.on_output(handle, &data),
            BackendEvent::Exited { handle, code } => self.on_exited(handle, code),
        }
    }

    fn on_output(&mut self, handle: SessionHandle, data: &[u8]) {
        let Some(index) = self.registry.index_of(handle) else {
            debug!(%handle, "dropping output for removed session");
            return;
        };
        let is_current = self.active.current() == Some(handle);
        let Some(session) = self.registry.get_mut(handle) else {
            return;
        };
        let changes = session.process_output(data);

        if changes.title_changed {
            let title = session.title().to_string();
            if !is_current {
                self.sink.notice(Notice::info(session.label(index)).long());
            }
            self.sink
                .push_visible(HostEvent::TitleChanged { handle, title });
        }
        if is_current {
            self.sink.push_visible(HostEvent::ScreenUpdated(handle));
        }
        if changes.bells > 0 {
            self.lifecycle.ring_bell(&mut self.sink);
        }
    }

    fn on_exited(&mut self, handle: SessionHandle, code: Option<i32>) {
        let Some(session) = self.registry.get_mut(handle) else {
            debug!(%handle, "exit for removed session");
            return;
        };
        if !session.mark_finished(code) {
            return;
        }
        info!(%handle, ?code, "session finished");
        self.sink.push(HostEvent::SessionFinished {
            handle,
            exit_code: code,
        });
        self.active
            .on_session_finished(&mut self.registry, handle, self.stopping, &mut self.sink);
    }

    /// The UI became visible or hidden.
    pub fn set_visible(&mut self, visible: bool) {
        self.sink.set_visible(visible);
    }

    /// Going to the background.
    pub fn on_stop(&mut self) {
        self.lifecycle
            .on_stop(self.active.current(), self.store.as_ref());
    }

    /// Coming back to the foreground.
    pub fn on_start(&mut self) {
        self.lifecycle.on_start(
            &mut self.active,
            &self.registry,
            self.store.as_ref(),
            &mut self.sink,
        );
    }

    /// Resize every session to the new terminal size.
    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.registry.resize_all(rows, cols);
        if let Some(handle) = self.active.current() {
            self.sink.push_visible(HostEvent::ScreenUpdated(handle));
        }
    }
}
