//! Process backend: spawns a child attached to a pseudo-terminal.
//!
//! The core only sees the [`ProcessBackend`] and [`ProcessHandle`] traits.
//! [`PtyBackend`] is the `portable-pty` implementation used by the binary.
//! Each spawned process gets a reader thread, which forwards output and the
//! final exit status as [`BackendEvent`]s, and a writer thread, so that
//! writes from the UI loop never block on the pty.

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, warn};

use super::types::{BackendEvent, SessionHandle, SpawnRequest};
use crate::error::SessionError;

/// Spawns session processes.
pub trait ProcessBackend {
    /// Start the process described by `request`.
    ///
    /// Output and the exit notification for `handle` must be delivered on
    /// `events`; the backend never touches UI-owned state directly.
    fn spawn(
        &mut self,
        handle: SessionHandle,
        request: &SpawnRequest,
        events: Sender<BackendEvent>,
    ) -> Result<Box<dyn ProcessHandle>, SessionError>;
}

/// A running child process, owned by its session.
pub trait ProcessHandle: Send {
    /// Queue bytes for the child. Never blocks on the pty; bytes written after
    /// the child went away are dropped.
    fn write(&mut self, data: &[u8]);

    fn resize(&mut self, rows: u16, cols: u16) -> io::Result<()>;

    fn kill(&mut self) -> io::Result<()>;

    /// OS process id, when known.
    fn pid(&self) -> Option<u32>;
}

/// `portable-pty` backed [`ProcessBackend`].
pub struct PtyBackend {
    shell: Option<String>,
    failsafe_shell: String,
}

impl PtyBackend {
    pub fn new(shell: Option<String>, failsafe_shell: impl Into<String>) -> Self {
        Self {
            shell,
            failsafe_shell: failsafe_shell.into(),
        }
    }

    fn command(&self, request: &SpawnRequest) -> CommandBuilder {
        let mut cmd = if let Some(program) = &request.program {
            let mut cmd = CommandBuilder::new(program);
            cmd.args(&request.args);
            cmd
        } else if request.failsafe {
            CommandBuilder::new(&self.failsafe_shell)
        } else if let Some(shell) = &self.shell {
            CommandBuilder::new(shell)
        } else {
            CommandBuilder::new_default_prog()
        };

        cmd.cwd(&request.cwd);

        // Set environment variables for better terminal experience
        cmd.env("TERM", "xterm-256color");
        cmd.env("COLORTERM", "truecolor");
        for (key, value) in &request.env {
            cmd.env(key, value);
        }
        cmd
    }

    fn spawn_pty(
        &self,
        handle: SessionHandle,
        request: &SpawnRequest,
        events: Sender<BackendEvent>,
    ) -> Result<PtyProcess> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows: request.rows,
                cols: request.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to open PTY")?;

        let mut child = pair
            .slave
            .spawn_command(self.command(request))
            .context("Failed to spawn shell")?;
        // The master only sees EOF once every slave handle is closed.
        drop(pair.slave);

        let pid = child.process_id();
        let killer = child.clone_killer();
        let writer = pair.master.take_writer()?;
        let mut reader = pair.master.try_clone_reader()?;

        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break, // EOF
                    Ok(n) => {
                        let event = BackendEvent::Output {
                            handle,
                            data: buf[..n].to_vec(),
                        };
                        if events.send(event).is_err() {
                            break; // Host gone
                        }
                    }
                    Err(_) => break,
                }
            }

            let code = match child.wait() {
                Ok(status) => i32::try_from(status.exit_code()).ok(),
                Err(e) => {
                    warn!(%handle, "failed to read exit status: {e}");
                    None
                }
            };
            debug!(%handle, ?code, "session process exited");
            let _ = events.send(BackendEvent::Exited { handle, code });
        });

        let (input_tx, input_rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = mpsc::channel();
        thread::spawn(move || {
            let mut writer = writer;
            // Ends when the sending half is dropped with the session.
            while let Ok(data) = input_rx.recv() {
                if writer.write_all(&data).and_then(|()| writer.flush()).is_err() {
                    break;
                }
            }
        });

        Ok(PtyProcess {
            master: pair.master,
            input_tx,
            killer,
            pid,
        })
    }
}

impl ProcessBackend for PtyBackend {
    fn spawn(
        &mut self,
        handle: SessionHandle,
        request: &SpawnRequest,
        events: Sender<BackendEvent>,
    ) -> Result<Box<dyn ProcessHandle>, SessionError> {
        self.spawn_pty(handle, request, events)
            .map(|process| Box::new(process) as Box<dyn ProcessHandle>)
            .map_err(|e| SessionError::BackendSpawnFailure(format!("{e:#}")))
    }
}

/// A child process running on a pseudo-terminal.
pub struct PtyProcess {
    master: Box<dyn MasterPty + Send>,
    input_tx: Sender<Vec<u8>>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    pid: Option<u32>,
}

impl ProcessHandle for PtyProcess {
    fn write(&mut self, data: &[u8]) {
        // The writer thread is gone once the child exited.
        let _ = self.input_tx.send(data.to_vec());
    }

    fn resize(&mut self, rows: u16, cols: u16) -> io::Result<()> {
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(io::Error::other)
    }

    fn kill(&mut self) -> io::Result<()> {
        self.killer.kill()
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failsafe_request_uses_failsafe_shell() {
        let backend = PtyBackend::new(Some("/bin/zsh".into()), "/bin/sh");
        let cmd = backend.command(&SpawnRequest::shell("/tmp", true, None));
        assert_eq!(cmd.get_argv()[0], "/bin/sh");

        let cmd = backend.command(&SpawnRequest::shell("/tmp", false, None));
        assert_eq!(cmd.get_argv()[0], "/bin/zsh");
    }

    #[test]
    fn command_request_passes_arguments() {
        let backend = PtyBackend::new(None, "/bin/sh");
        let cmd = backend.command(&SpawnRequest::command(
            "/tmp",
            "echo",
            vec!["hello".into()],
        ));
        let argv: Vec<_> = cmd.get_argv().iter().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(argv, vec!["echo", "hello"]);
    }

    #[test]
    fn spawns_and_reports_exit() {
        let mut backend = PtyBackend::new(None, "/bin/sh");
        let (tx, rx) = mpsc::channel();
        let handle = SessionHandle::new();
        let request = SpawnRequest::command("/", "/bin/sh", vec!["-c".into(), "exit 3".into()]);

        let _process = backend.spawn(handle, &request, tx).unwrap();

        let exit = rx
            .iter()
            .find(|event| matches!(event, BackendEvent::Exited { .. }))
            .unwrap();
        assert_eq!(exit, BackendEvent::Exited { handle, code: Some(3) });
    }
}
