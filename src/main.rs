use std::env;
use std::fs::{self, File};
use std::io::{self, IsTerminal, Stdout, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        poll, read, DisableBracketedPaste, DisableFocusChange, DisableMouseCapture,
        EnableBracketedPaste, EnableFocusChange, EnableMouseCapture, Event, KeyCode, KeyEvent,
        KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{
        self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use termhost::app::{BellLoader, BellSound, Host, PUMP_BUDGET};
use termhost::config::Config;
use termhost::event::{HostEvent, UiRequest};
use termhost::input::{ExtraKey, ExtraKeyButton, SpecialButton};
use termhost::notice::NoticeQueue;
use termhost::session::{PtyBackend, SessionHandle};
use termhost::store::{JsonStore, MemoryStore, SessionStore};

/// What to start with when the host comes up.
enum Launch {
    /// Restore or create an interactive shell.
    Shell,
    /// Reuse or create a session in this directory.
    Directory(PathBuf),
    /// Run a command and exit with its status.
    Command { program: String, args: Vec<String> },
}

fn parse_args() -> Launch {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(flag) if flag == "--" => match args.next() {
            Some(program) => Launch::Command {
                program,
                args: args.collect(),
            },
            None => Launch::Shell,
        },
        Some(dir) => Launch::Directory(PathBuf::from(dir)),
        None => Launch::Shell,
    }
}

fn main() -> Result<()> {
    if !io::stdin().is_terminal() {
        anyhow::bail!("termhost must be run in an interactive terminal");
    }

    if let Err(e) = init_logging() {
        eprintln!("termhost: logging disabled: {e:#}");
    }

    let config = Config::load().context("Failed to load configuration")?;
    let store: Box<dyn SessionStore> = match JsonStore::open() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("session state will not persist: {e:#}");
            Box::new(MemoryStore::default())
        }
    };
    let backend = PtyBackend::new(config.shell.clone(), config.failsafe_shell.clone());
    let loader: BellLoader = Box::new(|| Ok(Box::new(TerminalBell) as Box<dyn BellSound>));
    let extra_keys = config.extra_keys.clone();
    let mut host = Host::new(config, Box::new(backend), store, loader);

    enable_raw_mode().context("Failed to enable raw mode - are you in a terminal?")?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste,
        EnableFocusChange
    )
    .context("Failed to setup terminal")?;

    let mut ui = Ui::new(extra_keys);
    let result =
        start(&mut host, &mut ui, parse_args()).and_then(|()| run(&mut host, &mut ui, &mut stdout));

    host.request_stop();
    host.on_stop();

    // Restore terminal (always try to restore even on error)
    let _ = execute!(
        stdout,
        DisableFocusChange,
        DisableBracketedPaste,
        DisableMouseCapture,
        LeaveAlternateScreen,
        Show
    );
    let _ = disable_raw_mode();

    result?;
    if let Some(code) = ui.command_exit.filter(|&code| code != 0) {
        std::process::exit(code);
    }
    Ok(())
}

/// Log to a file so the terminal stays clean. Filtered by `TERMHOST_LOG`.
fn init_logging() -> Result<()> {
    let dir = dirs::cache_dir()
        .context("Could not find cache directory")?
        .join("termhost");
    fs::create_dir_all(&dir).context("Failed to create log directory")?;
    let file = File::create(dir.join("termhost.log")).context("Failed to create log file")?;

    let filter = EnvFilter::try_from_env("TERMHOST_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Rings the outer terminal's bell.
struct TerminalBell;

impl BellSound for TerminalBell {
    fn play(&mut self) {
        let mut out = io::stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }
}

/// Inline rename prompt on the status line.
struct Prompt {
    handle: SessionHandle,
    buffer: String,
}

/// Host-side UI state: notices, toolbar and prompt.
struct Ui {
    notices: NoticeQueue,
    extra_keys: Vec<Vec<ExtraKeyButton>>,
    show_toolbar: bool,
    prompt: Option<Prompt>,
    size: (u16, u16),
    redraw: bool,
    command: Option<SessionHandle>,
    command_exit: Option<i32>,
}

enum Flow {
    Continue,
    Quit,
}

impl Ui {
    fn new(extra_keys: Vec<Vec<ExtraKeyButton>>) -> Self {
        Self {
            notices: NoticeQueue::new(),
            show_toolbar: !extra_keys.is_empty(),
            extra_keys,
            prompt: None,
            size: (24, 80),
            redraw: true,
            command: None,
            command_exit: None,
        }
    }

    fn toolbar_rows(&self) -> u16 {
        if self.show_toolbar {
            u16::try_from(self.extra_keys.len()).unwrap_or(u16::MAX)
        } else {
            0
        }
    }

    /// Rows left for the session after the toolbar and status line.
    fn screen_rows(&self) -> u16 {
        self.size.0.saturating_sub(self.toolbar_rows() + 1).max(1)
    }

    fn resize(&mut self, host: &mut Host, rows: u16, cols: u16) {
        self.size = (rows, cols);
        host.resize(self.screen_rows(), cols);
        self.redraw = true;
    }

    fn handle_event(&mut self, host: &mut Host, event: HostEvent) -> Flow {
        match event {
            HostEvent::SessionChanged(_)
            | HostEvent::ScreenUpdated(_)
            | HostEvent::TitleChanged { .. }
            | HostEvent::StyleRefresh => self.redraw = true,
            HostEvent::SessionFinished { handle, exit_code } => {
                if self.command == Some(handle) {
                    self.command_exit = Some(command_status(exit_code));
                }
                self.redraw = true;
            }
            HostEvent::SessionCleared | HostEvent::TerminateHost => return Flow::Quit,
            HostEvent::Bell => TerminalBell.play(),
            HostEvent::Notice(notice) => {
                self.notices.push(notice);
                self.redraw = true;
            }
            HostEvent::Ui(request) => self.handle_request(host, request),
        }
        Flow::Continue
    }

    fn handle_request(&mut self, host: &mut Host, request: UiRequest) {
        match request {
            UiRequest::Paste => match arboard::Clipboard::new().and_then(|mut c| c.get_text()) {
                Ok(text) => host.paste(&text),
                Err(e) => warn!("clipboard unavailable: {e}"),
            },
            UiRequest::ToggleToolbar => {
                self.show_toolbar = !self.show_toolbar && !self.extra_keys.is_empty();
                let (rows, cols) = self.size;
                self.resize(host, rows, cols);
            }
            UiRequest::Rename(handle) => {
                let buffer = host
                    .registry()
                    .get(handle)
                    .and_then(|s| s.name())
                    .unwrap_or_default()
                    .to_string();
                self.prompt = Some(Prompt { handle, buffer });
                self.redraw = true;
            }
            other => debug!(?other, "request not supported by this host"),
        }
    }

    /// Keys typed into the rename prompt. Returns false when no prompt is open.
    fn prompt_key(&mut self, host: &mut Host, key: &KeyEvent) -> bool {
        let Some(prompt) = self.prompt.as_mut() else {
            return false;
        };
        if key.kind == KeyEventKind::Release {
            return true;
        }
        match key.code {
            KeyCode::Char(c) => prompt.buffer.push(c),
            KeyCode::Backspace => {
                prompt.buffer.pop();
            }
            KeyCode::Enter => {
                host.rename_session(prompt.handle, &prompt.buffer);
                self.prompt = None;
            }
            KeyCode::Esc => self.prompt = None,
            _ => {}
        }
        self.redraw = true;
        true
    }

    /// Toolbar button under a screen position.
    fn button_at(&self, column: u16, row: u16) -> Option<&ExtraKeyButton> {
        let first = self.screen_rows();
        let index = usize::from(row.checked_sub(first)?);
        let buttons = self.extra_keys.get(index).filter(|_| self.show_toolbar)?;
        let width = button_width(self.size.1, buttons.len());
        let slot = (usize::from(column) / width).min(buttons.len().saturating_sub(1));
        buttons.get(slot)
    }

    fn mouse(&mut self, host: &mut Host, mouse: MouseEvent) {
        let lock = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => false,
            MouseEventKind::Down(MouseButton::Right) => true,
            _ => return,
        };
        let Some(button) = self.button_at(mouse.column, mouse.row).cloned() else {
            return;
        };
        match special_of(&button) {
            Some(special) if lock => host.lock_button(special),
            _ => host.press_button(&button),
        }
        self.redraw = true;
    }
}

/// Exit status to report for the command run with `termhost -- cmd`. A
/// missing code means the child died from a signal.
fn command_status(exit_code: Option<i32>) -> i32 {
    exit_code.unwrap_or(1)
}

fn special_of(button: &ExtraKeyButton) -> Option<SpecialButton> {
    match button {
        ExtraKeyButton::Key(key) | ExtraKeyButton::Labeled { key, .. } => match ExtraKey::parse(key) {
            ExtraKey::Special(special) => Some(special),
            _ => None,
        },
        ExtraKeyButton::Macro { .. } => None,
    }
}

fn button_width(cols: u16, buttons: usize) -> usize {
    (usize::from(cols) / buttons.max(1)).max(1)
}

fn start(host: &mut Host, ui: &mut Ui, launch: Launch) -> Result<()> {
    let (cols, rows) = terminal::size().context("Failed to get terminal size")?;
    ui.resize(host, rows, cols);

    let started = match launch {
        Launch::Shell => {
            host.on_start();
            host.current().or_else(|| host.new_session(false, None, None))
        }
        Launch::Directory(dir) => host.open_in(&dir),
        Launch::Command { program, args } => {
            let cwd = env::current_dir().context("Failed to read current directory")?;
            let handle = host.run_command(&cwd, &program, args);
            ui.command = handle;
            handle
        }
    };

    match started {
        Some(handle) => {
            info!(%handle, "host started");
            Ok(())
        }
        None => anyhow::bail!("Failed to start a session, see the log for details"),
    }
}

fn run(host: &mut Host, ui: &mut Ui, out: &mut Stdout) -> Result<()> {
    loop {
        // Output is still queued when the budget ran out; don't wait for input.
        let backlog = host.pump() == PUMP_BUDGET;

        let shown = ui.notices.visible().count();
        ui.notices.update();
        if ui.notices.visible().count() != shown {
            ui.redraw = true;
        }

        for event in host.drain_events() {
            if let Flow::Quit = ui.handle_event(host, event) {
                return Ok(());
            }
        }

        if ui.redraw {
            draw(out, host, ui)?;
            ui.redraw = false;
        }

        let timeout = if backlog { Duration::ZERO } else { Duration::from_millis(20) };
        if !poll(timeout)? {
            continue;
        }
        match read()? {
            Event::Key(key) => {
                if ui.prompt_key(host, &key) {
                    continue;
                }
                if ui.notices.has_modal() {
                    if key.kind == KeyEventKind::Press {
                        ui.notices.dismiss();
                        ui.redraw = true;
                    }
                    continue;
                }
                host.handle_key_event(&key);
                ui.redraw = true;
            }
            Event::Mouse(mouse) => ui.mouse(host, mouse),
            Event::Paste(text) => host.paste(&text),
            Event::Resize(cols, rows) => ui.resize(host, rows, cols),
            Event::FocusGained => {
                host.set_visible(true);
                host.on_start();
            }
            Event::FocusLost => {
                host.set_visible(false);
                host.on_stop();
            }
        }
    }
}

fn fit(text: &str, width: usize) -> String {
    let mut line: String = text.chars().take(width).collect();
    let len = line.chars().count();
    line.extend(std::iter::repeat(' ').take(width - len));
    line
}

fn draw(out: &mut Stdout, host: &Host, ui: &Ui) -> Result<()> {
    let (rows, cols) = ui.size;
    let width = usize::from(cols);

    queue!(out, Hide, MoveTo(0, 0), Clear(ClearType::All))?;
    if let Some(session) = host.current_session() {
        out.write_all(&session.screen().contents_formatted())?;
    }

    if ui.show_toolbar {
        let active = host.router().buttons();
        for (i, buttons) in ui.extra_keys.iter().enumerate() {
            let row = ui.screen_rows() + u16::try_from(i).unwrap_or(u16::MAX);
            let cell = button_width(cols, buttons.len());
            let mut line = String::new();
            for button in buttons {
                let label = match special_of(button) {
                    Some(special) if active.is_active(special) => format!("[{}]", button.display()),
                    _ => button.display().to_string(),
                };
                let pad = cell.saturating_sub(label.chars().count()) / 2;
                line.push_str(&fit(&format!("{}{label}", " ".repeat(pad)), cell));
            }
            queue!(out, MoveTo(0, row), Print(fit(&line, width)))?;
        }
    }

    queue!(
        out,
        MoveTo(0, rows.saturating_sub(1)),
        SetAttribute(Attribute::Reverse),
        Print(fit(&status_line(host, ui), width)),
        SetAttribute(Attribute::Reset)
    )?;

    match (&ui.prompt, host.current_session()) {
        (Some(prompt), _) => {
            let col = u16::try_from("Rename: ".len() + prompt.buffer.chars().count()).unwrap_or(cols);
            queue!(out, MoveTo(col.min(cols.saturating_sub(1)), rows.saturating_sub(1)), Show)?;
        }
        (None, Some(session)) => {
            let screen = session.screen();
            let (row, col) = screen.cursor_position();
            queue!(out, MoveTo(col, row))?;
            if !screen.hide_cursor() {
                queue!(out, Show)?;
            }
        }
        (None, None) => {}
    }
    out.flush()?;
    Ok(())
}

fn status_line(host: &Host, ui: &Ui) -> String {
    if let Some(prompt) = &ui.prompt {
        return format!("Rename: {}", prompt.buffer);
    }
    if let Some(notice) = ui.notices.visible().last() {
        let text = notice.message.replace('\n', " ");
        return if notice.modal {
            format!("[!] {text} (press any key)")
        } else {
            text
        };
    }

    let current = host.current();
    let mut line = String::new();
    for (index, session) in host.registry().iter().enumerate() {
        let label = session.label(index);
        let name = label.lines().next().unwrap_or_default();
        let mark = if session.is_running() { "" } else { "!" };
        if Some(session.handle()) == current {
            line.push_str(&format!("<{name}{mark}> "));
        } else {
            line.push_str(&format!(" {name}{mark}  "));
        }
    }
    let router = host.router();
    if router.virtual_ctrl() {
        line.push_str(" CTRL");
    }
    if router.virtual_fn() {
        line.push_str(" FN");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn killed_command_exits_non_zero() {
        assert_eq!(command_status(None), 1);
        assert_eq!(command_status(Some(0)), 0);
        assert_eq!(command_status(Some(3)), 3);
    }

    #[test]
    fn toolbar_buttons_split_the_width() {
        let mut ui = Ui::new(termhost::input::extra_keys::default_extra_keys());
        ui.size = (24, 70);
        assert_eq!(ui.screen_rows(), 21);
        assert_eq!(ui.button_at(0, 21).map(ExtraKeyButton::display), Some("ESC"));
        assert_eq!(ui.button_at(69, 22).map(ExtraKeyButton::display), Some("PGDN"));
        assert!(ui.button_at(0, 5).is_none());
    }
}
