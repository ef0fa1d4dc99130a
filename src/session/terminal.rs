//! A single terminal session: one child process plus its emulator state.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::backend::ProcessHandle;
use super::types::{SessionHandle, SpawnRequest};
use crate::input::keys::{encode_code_point, encode_key, Key};
use crate::input::modifiers::ModifierState;

/// Number of scrollback lines to retain in terminal history per session.
pub const SCROLLBACK_LINES: usize = 10000;

/// What changed after feeding output into the emulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputChanges {
    /// The window title set through OSC 0/2 differs from before.
    pub title_changed: bool,
    /// Number of BEL characters seen.
    pub bells: usize,
}

/// A running (or finished but not yet dismissed) terminal session.
///
/// Owned by the [`SessionRegistry`](super::SessionRegistry); everything else
/// refers to it by [`SessionHandle`].
pub struct Session {
    handle: SessionHandle,
    name: Option<String>,
    initial_cwd: PathBuf,
    pending_result: bool,
    process: Box<dyn ProcessHandle>,
    emulator: vt100::Parser,
    title: String,
    running: bool,
    exit_code: Option<i32>,
    bell_count: usize,
}

impl Session {
    pub(crate) fn new(
        handle: SessionHandle,
        request: &SpawnRequest,
        process: Box<dyn ProcessHandle>,
    ) -> Self {
        Self {
            handle,
            name: request.name.clone(),
            initial_cwd: request.cwd.clone(),
            pending_result: request.pending_result,
            process,
            emulator: vt100::Parser::new(request.rows, request.cols, SCROLLBACK_LINES),
            title: String::new(),
            running: true,
            exit_code: None,
            bell_count: 0,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Rename the session. An empty name clears it.
    pub fn set_name(&mut self, name: &str) {
        let name = name.trim();
        self.name = (!name.is_empty()).then(|| name.to_string());
    }

    /// Title most recently set by the program running in the session.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Whether the session's exit must be delivered to an external caller.
    pub fn has_pending_result(&self) -> bool {
        self.pending_result
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    /// Directory the session was started in.
    pub fn initial_cwd(&self) -> &Path {
        &self.initial_cwd
    }

    /// Current working directory of the shell, falling back to the directory
    /// the session was started in.
    pub fn cwd(&self) -> PathBuf {
        self.pid()
            .filter(|_| self.running)
            .and_then(process_cwd)
            .unwrap_or_else(|| self.initial_cwd.clone())
    }

    /// Emulator screen, for the renderer.
    pub fn screen(&self) -> &vt100::Screen {
        self.emulator.screen()
    }

    /// Write raw bytes to the child. Input to a finished session is dropped.
    pub fn write(&mut self, data: &[u8]) {
        if !self.running {
            debug!(handle = %self.handle, "dropping input for finished session");
            return;
        }
        self.process.write(data);
    }

    /// Write a code point, applying Ctrl folding and the Alt escape prefix.
    pub fn write_code_point(&mut self, code_point: char, mods: ModifierState) {
        let bytes = encode_code_point(code_point, mods);
        self.write(&bytes);
    }

    /// Write a special key using the emulator's current cursor mode.
    pub fn write_key(&mut self, key: Key, mods: ModifierState) {
        let app_cursor = self.emulator.screen().application_cursor();
        let bytes = encode_key(key, mods, app_cursor);
        match bytes {
            Some(bytes) => self.write(&bytes),
            None => debug!(?key, "key has no terminal encoding"),
        }
    }

    /// Paste text, honoring bracketed paste mode.
    pub fn paste(&mut self, text: &str) {
        let text = text.replace("\r\n", "\r").replace('\n', "\r");
        if self.emulator.screen().bracketed_paste() {
            self.write(format!("\x1b[200~{text}\x1b[201~").as_bytes());
        } else {
            self.write(text.as_bytes());
        }
    }

    /// Resize the pty and the emulator.
    pub fn resize(&mut self, rows: u16, cols: u16) -> io::Result<()> {
        let (cur_rows, cur_cols) = self.emulator.screen().size();
        if (cur_rows, cur_cols) == (rows, cols) {
            return Ok(());
        }
        if self.running {
            self.process.resize(rows, cols)?;
        }
        // Resizing in place keeps the title, bell count and terminal modes.
        self.emulator.screen_mut().set_size(rows, cols);
        Ok(())
    }

    /// Feed output from the child into the emulator.
    pub fn process_output(&mut self, data: &[u8]) -> OutputChanges {
        self.emulator.process(data);

        let screen = self.emulator.screen();
        let title_changed = screen.title() != self.title;
        if title_changed {
            self.title = screen.title().to_string();
        }

        let bell_count = screen.audible_bell_count();
        let bells = bell_count.saturating_sub(self.bell_count);
        self.bell_count = bell_count;

        OutputChanges {
            title_changed,
            bells,
        }
    }

    /// Record the child's exit. Returns false when it was already recorded.
    pub fn mark_finished(&mut self, exit_code: Option<i32>) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.exit_code = exit_code;
        true
    }

    /// Kill the child if it is still running.
    pub fn kill(&mut self) {
        if !self.running {
            return;
        }
        if let Err(e) = self.process.kill() {
            debug!(handle = %self.handle, "kill failed: {e}");
        }
    }

    /// Notice title for the session at 0-based `index`: `"[n] name\ntitle"`.
    pub fn label(&self, index: usize) -> String {
        let mut label = format!("[{}]", index + 1);
        if let Some(name) = self.name() {
            label.push(' ');
            label.push_str(name);
        }
        if !self.title.is_empty() {
            label.push(if self.name.is_none() { ' ' } else { '\n' });
            label.push_str(&self.title);
        }
        label
    }
}

#[cfg(target_os = "linux")]
fn process_cwd(pid: u32) -> Option<PathBuf> {
    std::fs::read_link(format!("/proc/{pid}/cwd")).ok()
}

#[cfg(not(target_os = "linux"))]
fn process_cwd(_pid: u32) -> Option<PathBuf> {
    None
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::session::backend::fake::FakeBackend;
    use crate::session::backend::ProcessBackend;

    fn session(backend: &mut FakeBackend) -> Session {
        let handle = SessionHandle::new();
        let request = SpawnRequest::shell("/tmp", false, None);
        let (tx, _rx) = mpsc::channel();
        let process = backend.spawn(handle, &request, tx).unwrap();
        Session::new(handle, &request, process)
    }

    #[test]
    fn tracks_title_and_bells_from_output() {
        let mut backend = FakeBackend::default();
        let mut s = session(&mut backend);

        let changes = s.process_output(b"\x1b]2;vim notes.md\x07hello");
        assert!(changes.title_changed);
        assert_eq!(s.title(), "vim notes.md");

        let changes = s.process_output(b"\x07\x07");
        assert!(!changes.title_changed);
        assert_eq!(changes.bells, 2);
    }

    #[test]
    fn input_after_exit_is_dropped() {
        let mut backend = FakeBackend::default();
        let mut s = session(&mut backend);

        s.write(b"ls\r");
        assert!(s.mark_finished(Some(0)));
        assert!(!s.mark_finished(Some(1)));
        s.write(b"pwd\r");

        assert_eq!(backend.written(s.handle()), b"ls\r");
        assert_eq!(s.exit_code(), Some(0));
        assert!(!s.is_running());
    }

    #[test]
    fn paste_normalizes_newlines() {
        let mut backend = FakeBackend::default();
        let mut s = session(&mut backend);

        s.paste("a\r\nb\nc");
        assert_eq!(backend.written(s.handle()), b"a\rb\rc");

        s.process_output(b"\x1b[?2004h");
        s.paste("x");
        assert!(backend.written(s.handle()).ends_with(b"\x1b[200~x\x1b[201~"));
    }

    #[test]
    fn label_combines_index_name_and_title() {
        let mut backend = FakeBackend::default();
        let mut s = session(&mut backend);
        assert_eq!(s.label(0), "[1]");

        s.process_output(b"\x1b]0;htop\x07");
        assert_eq!(s.label(2), "[3] htop");

        s.set_name("monitor");
        assert_eq!(s.label(2), "[3] monitor\nhtop");

        s.set_name("   ");
        assert_eq!(s.name(), None);
    }

    #[test]
    fn resize_keeps_title_bells_and_modes() {
        let mut backend = FakeBackend::default();
        let mut s = session(&mut backend);
        s.process_output(b"\x1b]2;vim\x07\x07\x07\x1b[?1h\x1b[?2004h");

        s.resize(40, 100).unwrap();
        let changes = s.process_output(b"x");

        assert_eq!(changes, OutputChanges::default());
        assert_eq!(s.title(), "vim");
        assert!(s.screen().application_cursor());
        assert!(s.screen().bracketed_paste());

        s.write_key(Key::Up, ModifierState::NONE);
        assert_eq!(backend.written(s.handle()), b"\x1bOA");
    }

    #[test]
    fn resize_reaches_the_process() {
        let mut backend = FakeBackend::default();
        let mut s = session(&mut backend);

        s.resize(40, 100).unwrap();
        assert_eq!(s.screen().size(), (40, 100));
        let size = backend.logs.lock().unwrap()[&s.handle()].size;
        assert_eq!(size, Some((40, 100)));
    }
}
