//! Key routing state machine.
//!
//! [`InputRouter`] turns raw key events into a [`Dispatch`]: a session
//! action, a UI request, or a key/code point for the current session. It
//! owns all modifier latching state, so independent hosts never share it.

use tracing::trace;

use super::extra_keys::{ExtraKey, ExtraKeyButton, HostButton, MacroStep};
use super::fn_keys::{self, FnSubstitution};
use super::keys::{Key, KeyInput, KeySource};
use super::modifiers::{ModifierState, SpecialButton, SpecialButtons};
use super::shortcuts::{ShortcutAction, ShortcutTable};
use crate::event::UiRequest;

/// Session-level commands produced by routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    NewSession,
    NextSession,
    PreviousSession,
    RenameSession,
    /// Jump to the session at this 0-based index.
    SwitchTo(usize),
    /// Dismiss the finished current session.
    RemoveFinished,
}

impl From<ShortcutAction> for SessionAction {
    fn from(action: ShortcutAction) -> Self {
        match action {
            ShortcutAction::CreateSession => SessionAction::NewSession,
            ShortcutAction::NextSession => SessionAction::NextSession,
            ShortcutAction::PreviousSession => SessionAction::PreviousSession,
            ShortcutAction::RenameSession => SessionAction::RenameSession,
        }
    }
}

/// Result of routing one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Action(SessionAction),
    Ui(UiRequest),
    /// Write a special key to the current session.
    Key { key: Key, mods: ModifierState },
    /// Write a code point to the current session.
    CodePoint {
        code_point: char,
        mods: ModifierState,
    },
    TerminateHost,
    /// Handled by the router itself (modifier latching, swallowed keys).
    Consumed,
    /// Not ours; the platform may handle it.
    Ignored,
}

/// What the router needs to know about the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteContext {
    pub has_session: bool,
    pub session_running: bool,
}

impl RouteContext {
    fn session_finished(&self) -> bool {
        self.has_session && !self.session_running
    }
}

/// Router configuration, fixed after startup.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Ctrl+Alt command table for hardware keyboards.
    pub hardware_shortcuts: bool,
    /// Volume down acts as Ctrl and volume up as Fn.
    pub virtual_volume_keys: bool,
    pub shortcuts: ShortcutTable,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            hardware_shortcuts: true,
            virtual_volume_keys: true,
            shortcuts: ShortcutTable::default(),
        }
    }
}

pub struct InputRouter {
    settings: RouterSettings,
    virtual_ctrl: bool,
    virtual_fn: bool,
    buttons: SpecialButtons,
}

impl InputRouter {
    pub fn new(settings: RouterSettings) -> Self {
        Self {
            settings,
            virtual_ctrl: false,
            virtual_fn: false,
            buttons: SpecialButtons::default(),
        }
    }

    pub fn virtual_ctrl(&self) -> bool {
        self.virtual_ctrl
    }

    pub fn virtual_fn(&self) -> bool {
        self.virtual_fn
    }

    /// Extra-keys special buttons, for rendering their latched state.
    pub fn buttons(&self) -> &SpecialButtons {
        &self.buttons
    }

    /// Route a key-down event.
    pub fn key_down(&mut self, input: KeyInput, ctx: RouteContext) -> Dispatch {
        if let Some(down) = self.virtual_modifier(&input, true) {
            return down;
        }
        let extra = self.buttons.take();
        self.route(input.key, input.mods, extra, ctx)
    }

    /// Route a key-up event. Only releases virtual modifiers, except Back
    /// with no session, which terminates the host.
    pub fn key_up(&mut self, input: KeyInput, ctx: RouteContext) -> Dispatch {
        if input.key == Key::Back && !ctx.has_session {
            return Dispatch::TerminateHost;
        }
        self.virtual_modifier(&input, false)
            .unwrap_or(Dispatch::Ignored)
    }

    /// Route a press on an extra-keys button. Macros yield one dispatch per
    /// step.
    pub fn press_button(&mut self, button: &ExtraKeyButton, ctx: RouteContext) -> Vec<Dispatch> {
        let is_macro = button.is_macro();
        let mut out = Vec::new();
        for step in button.steps() {
            self.press_step(step, is_macro, ctx, &mut out);
        }
        out
    }

    /// Long press on a special button: lock it.
    pub fn lock_button(&mut self, button: SpecialButton) {
        self.buttons.lock(button);
    }

    /// Expand and route a macro string such as `"CTRL ALT x"`.
    pub fn macro_keys(&mut self, spec: &str, ctx: RouteContext) -> Vec<Dispatch> {
        self.press_button(
            &ExtraKeyButton::Macro {
                keys: spec.to_string(),
                display: None,
            },
            ctx,
        )
    }

    fn press_step(
        &mut self,
        step: MacroStep,
        is_macro: bool,
        ctx: RouteContext,
        out: &mut Vec<Dispatch>,
    ) {
        match step.key {
            ExtraKey::Special(button) => {
                // Only reachable for a plain button; macros fold modifiers into steps.
                self.buttons.toggle(button);
                out.push(Dispatch::Consumed);
            }
            ExtraKey::Host(button) => out.push(Dispatch::Ui(match button {
                HostButton::Keyboard => UiRequest::ToggleKeyboard,
                HostButton::Paste => UiRequest::Paste,
                HostButton::Scroll => UiRequest::ToggleAutoScroll,
            })),
            ExtraKey::Named(key) => {
                let extra = self.step_modifiers(step.mods, is_macro);
                out.push(self.route(key, ModifierState::NONE, extra, ctx));
            }
            ExtraKey::Text(text) => {
                for c in text.chars() {
                    let extra = self.step_modifiers(step.mods, is_macro);
                    out.push(self.route(Key::Char(c), ModifierState::NONE, extra, ctx));
                }
            }
        }
    }

    fn step_modifiers(&mut self, mods: ModifierState, is_macro: bool) -> ModifierState {
        if is_macro {
            mods
        } else {
            mods.union(self.buttons.take())
        }
    }

    /// Volume keys as virtual Ctrl/Fn. `None` when the event is not one.
    fn virtual_modifier(&mut self, input: &KeyInput, down: bool) -> Option<Dispatch> {
        if !self.settings.virtual_volume_keys || input.source == KeySource::Keyboard {
            return None;
        }
        match input.key {
            Key::VolumeDown => self.virtual_ctrl = down,
            Key::VolumeUp => self.virtual_fn = down,
            _ => return None,
        }
        trace!(ctrl = self.virtual_ctrl, fn_ = self.virtual_fn, "virtual modifiers");
        Some(Dispatch::Consumed)
    }

    /// Single-key handler. `physical` are modifiers held on a real keyboard;
    /// `extra` come from special buttons or macro steps.
    fn route(
        &mut self,
        key: Key,
        physical: ModifierState,
        extra: ModifierState,
        ctx: RouteContext,
    ) -> Dispatch {
        if key == Key::Enter && ctx.session_finished() {
            return Dispatch::Action(SessionAction::RemoveFinished);
        }

        if self.settings.hardware_shortcuts && physical.ctrl && physical.alt {
            return ctrl_alt_command(key).unwrap_or(Dispatch::Consumed);
        }

        let mods = physical.union(extra);
        match key {
            Key::Char(c) => self.route_code_point(c, mods, ctx),
            Key::VolumeUp | Key::VolumeDown | Key::Back => Dispatch::Ignored,
            key => Dispatch::Key {
                key,
                mods: mods.without_fn(),
            },
        }
    }

    fn route_code_point(&mut self, c: char, mods: ModifierState, ctx: RouteContext) -> Dispatch {
        if self.virtual_fn || mods.fn_ {
            let sub = fn_keys::substitute(c);
            if sub.clears_fn() {
                self.virtual_fn = false;
            }
            return match sub {
                FnSubstitution::Key(key) => Dispatch::Key {
                    key,
                    mods: ModifierState::NONE,
                },
                FnSubstitution::CodePoint(code_point, mods) => {
                    Dispatch::CodePoint { code_point, mods }
                }
                FnSubstitution::Ui(request) => Dispatch::Ui(request),
                FnSubstitution::Swallow => Dispatch::Consumed,
            };
        }

        let ctrl = mods.ctrl || self.virtual_ctrl;
        if ctrl {
            if c.to_ascii_lowercase() == 'j' && ctx.session_finished() {
                return Dispatch::Action(SessionAction::RemoveFinished);
            }
            if let Some(action) = self.settings.shortcuts.resolve(c) {
                return Dispatch::Action(action.into());
            }
        }

        Dispatch::CodePoint {
            code_point: c,
            mods: ModifierState { ctrl, ..mods }.without_fn(),
        }
    }
}

/// Fixed Ctrl+Alt table for hardware keyboards.
fn ctrl_alt_command(key: Key) -> Option<Dispatch> {
    let action = |a| Some(Dispatch::Action(a));
    let ui = |r| Some(Dispatch::Ui(r));
    match key {
        Key::Down | Key::Right => action(SessionAction::NextSession),
        Key::Up | Key::Left => action(SessionAction::PreviousSession),
        Key::Char(c) => match c.to_ascii_lowercase() {
            'n' => action(SessionAction::NextSession),
            'p' => action(SessionAction::PreviousSession),
            'c' => action(SessionAction::NewSession),
            'r' => action(SessionAction::RenameSession),
            'k' => ui(UiRequest::ToggleKeyboard),
            'm' => ui(UiRequest::ContextMenu),
            'u' => ui(UiRequest::UrlSelection),
            'v' => ui(UiRequest::Paste),
            '+' | '=' => ui(UiRequest::FontSize { increase: true }),
            '-' => ui(UiRequest::FontSize { increase: false }),
            d @ '1'..='9' => action(SessionAction::SwitchTo(d as usize - '1' as usize)),
            _ => None,
        },
        _ => None,
    }
}
