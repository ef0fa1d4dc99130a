//! Modifier state and the extra-keys special buttons.

/// Modifiers applied to a single resolved key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub fn_: bool,
}

impl ModifierState {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        fn_: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::NONE
        }
    }

    pub fn ctrl_alt() -> Self {
        Self {
            ctrl: true,
            alt: true,
            ..Self::NONE
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Both sets combined.
    pub fn union(self, other: Self) -> Self {
        Self {
            ctrl: self.ctrl || other.ctrl,
            alt: self.alt || other.alt,
            shift: self.shift || other.shift,
            fn_: self.fn_ || other.fn_,
        }
    }

    pub fn without_fn(self) -> Self {
        Self { fn_: false, ..self }
    }

    /// Set the flag for `button`.
    pub fn set(&mut self, button: SpecialButton) {
        match button {
            SpecialButton::Ctrl => self.ctrl = true,
            SpecialButton::Alt => self.alt = true,
            SpecialButton::Shift => self.shift = true,
            SpecialButton::Fn => self.fn_ = true,
        }
    }

    /// xterm modifier parameter (`1 + shift + 2*alt + 4*ctrl`).
    pub fn xterm_param(&self) -> u8 {
        1 + u8::from(self.shift) + 2 * u8::from(self.alt) + 4 * u8::from(self.ctrl)
    }
}

/// Modifier buttons of the extra-keys row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialButton {
    Ctrl,
    Alt,
    Shift,
    Fn,
}

impl SpecialButton {
    pub const ALL: [SpecialButton; 4] = [
        SpecialButton::Ctrl,
        SpecialButton::Alt,
        SpecialButton::Shift,
        SpecialButton::Fn,
    ];

    /// Parse an (already normalized) extra-key name.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "CTRL" => Some(SpecialButton::Ctrl),
            "ALT" => Some(SpecialButton::Alt),
            "SHIFT" => Some(SpecialButton::Shift),
            "FN" => Some(SpecialButton::Fn),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            SpecialButton::Ctrl => "CTRL",
            SpecialButton::Alt => "ALT",
            SpecialButton::Shift => "SHIFT",
            SpecialButton::Fn => "FN",
        }
    }

    fn slot(self) -> usize {
        match self {
            SpecialButton::Ctrl => 0,
            SpecialButton::Alt => 1,
            SpecialButton::Shift => 2,
            SpecialButton::Fn => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ButtonState {
    active: bool,
    locked: bool,
}

/// Latched special buttons.
///
/// A tap makes a button active for the next resolved key only. A long press
/// locks it until it is tapped again.
#[derive(Debug, Clone, Default)]
pub struct SpecialButtons {
    states: [ButtonState; 4],
}

impl SpecialButtons {
    /// Tap: toggles the button, and unlocks it if it was locked.
    pub fn toggle(&mut self, button: SpecialButton) {
        let state = &mut self.states[button.slot()];
        if state.locked {
            *state = ButtonState::default();
        } else {
            state.active = !state.active;
        }
    }

    /// Long press: keep the button active across keys.
    pub fn lock(&mut self, button: SpecialButton) {
        self.states[button.slot()] = ButtonState {
            active: true,
            locked: true,
        };
    }

    pub fn is_active(&self, button: SpecialButton) -> bool {
        self.states[button.slot()].active
    }

    /// Read every button for one resolved key, deactivating the unlocked ones.
    pub fn take(&mut self) -> ModifierState {
        let mut mods = ModifierState::NONE;
        for button in SpecialButton::ALL {
            let state = &mut self.states[button.slot()];
            if state.active {
                mods.set(button);
                if !state.locked {
                    state.active = false;
                }
            }
        }
        mods
    }
}
