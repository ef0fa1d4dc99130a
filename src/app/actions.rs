//! Input handling on Host: routing keys and carrying out the result.

use crossterm::event::{KeyEvent, KeyEventKind};
use tracing::trace;

use super::*;
use crate::event::UiRequest;
use crate::input::{Dispatch, ExtraKeyButton, KeyInput, SessionAction, SpecialButton};

impl Host {
    /// Handle a crossterm key event from the hardware keyboard.
    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        let Some(input) = KeyInput::from_crossterm(event) else {
            return;
        };
        match event.kind {
            KeyEventKind::Release => self.key_up(input),
            KeyEventKind::Press | KeyEventKind::Repeat => self.key_down(input),
        }
    }

    pub fn key_down(&mut self, input: KeyInput) {
        let ctx = self.route_context();
        let dispatch = self.router.key_down(input, ctx);
        self.dispatch(dispatch);
    }

    pub fn key_up(&mut self, input: KeyInput) {
        let ctx = self.route_context();
        let dispatch = self.router.key_up(input, ctx);
        self.dispatch(dispatch);
    }

    /// Press a button of the extra-keys row.
    pub fn press_button(&mut self, button: &ExtraKeyButton) {
        let ctx = self.route_context();
        for dispatch in self.router.press_button(button, ctx) {
            self.dispatch(dispatch);
        }
    }

    /// Long press on a special button: keep it active until tapped again.
    pub fn lock_button(&mut self, button: SpecialButton) {
        self.router.lock_button(button);
    }

    /// Run a macro string such as `"CTRL ALT x"` against the current session.
    pub fn run_macro(&mut self, keys: &str) {
        let ctx = self.route_context();
        for dispatch in self.router.macro_keys(keys, ctx) {
            self.dispatch(dispatch);
        }
    }

    /// Paste text into the current session.
    pub fn paste(&mut self, text: &str) {
        if let Some(session) = self.current_session_mut() {
            session.paste(text);
        }
    }

    fn dispatch(&mut self, dispatch: Dispatch) {
        trace!(?dispatch, "dispatch");
        match dispatch {
            Dispatch::Action(action) => self.perform(action),
            Dispatch::Ui(request) => self.sink.push(HostEvent::Ui(request)),
            Dispatch::Key { key, mods } => {
                if let Some(session) = self.current_session_mut() {
                    session.write_key(key, mods);
                }
            }
            Dispatch::CodePoint { code_point, mods } => {
                if let Some(session) = self.current_session_mut() {
                    session.write_code_point(code_point, mods);
                }
            }
            Dispatch::TerminateHost => self.sink.push(HostEvent::TerminateHost),
            Dispatch::Consumed | Dispatch::Ignored => {}
        }
    }

    fn perform(&mut self, action: SessionAction) {
        match action {
            SessionAction::NewSession => {
                self.new_session(false, None, None);
            }
            SessionAction::NextSession => self.switch_relative(true),
            SessionAction::PreviousSession => self.switch_relative(false),
            SessionAction::SwitchTo(index) => self.switch_to_index(index),
            SessionAction::RenameSession => {
                if let Some(handle) = self.current() {
                    self.sink.push(HostEvent::Ui(UiRequest::Rename(handle)));
                }
            }
            SessionAction::RemoveFinished => {
                if let Some(handle) = self.current() {
                    self.remove_session(handle);
                }
            }
        }
    }
}
