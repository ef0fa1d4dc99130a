//! Virtual Fn substitution table.

use super::keys::Key;
use super::modifiers::ModifierState;
use crate::event::UiRequest;

/// What a code point means while virtual Fn is latched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnSubstitution {
    /// Send a special key.
    Key(Key),
    /// Send a code point, optionally with extra modifiers (Alt+letter).
    CodePoint(char, ModifierState),
    /// Host-side action. Consumes the event and releases Fn.
    Ui(UiRequest),
    /// No mapping. Swallowed.
    Swallow,
}

impl FnSubstitution {
    /// Whether resolving this substitution releases the latched Fn flag.
    pub fn clears_fn(&self) -> bool {
        matches!(self, FnSubstitution::Ui(UiRequest::ToggleToolbar))
    }
}

/// Look up `code_point` in the Fn table. Every code point is consumed while
/// Fn is latched.
pub fn substitute(code_point: char) -> FnSubstitution {
    match code_point.to_ascii_lowercase() {
        'w' => FnSubstitution::Key(Key::Up),
        'a' => FnSubstitution::Key(Key::Left),
        's' => FnSubstitution::Key(Key::Down),
        'd' => FnSubstitution::Key(Key::Right),
        'p' => FnSubstitution::Key(Key::PageUp),
        'n' => FnSubstitution::Key(Key::PageDown),
        't' => FnSubstitution::Key(Key::Tab),
        'i' => FnSubstitution::Key(Key::Insert),
        'e' => FnSubstitution::Key(Key::Escape),
        'h' => FnSubstitution::CodePoint('~', ModifierState::NONE),
        'u' => FnSubstitution::CodePoint('_', ModifierState::NONE),
        'l' => FnSubstitution::CodePoint('|', ModifierState::NONE),
        '.' => FnSubstitution::CodePoint('\u{1c}', ModifierState::NONE),
        c @ '1'..='9' => FnSubstitution::Key(Key::F(c as u8 - b'0')),
        '0' => FnSubstitution::Key(Key::F(10)),
        c @ ('b' | 'f' | 'x') => FnSubstitution::CodePoint(c, ModifierState::alt()),
        'v' => FnSubstitution::Ui(UiRequest::VolumePanel),
        'q' | 'k' => FnSubstitution::Ui(UiRequest::ToggleToolbar),
        _ => FnSubstitution::Swallow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasd_are_arrows_and_keep_fn() {
        let up = substitute('w');
        assert_eq!(up, FnSubstitution::Key(Key::Up));
        assert!(!up.clears_fn());
        assert_eq!(substitute('D'), FnSubstitution::Key(Key::Right));
    }

    #[test]
    fn digits_map_to_function_keys() {
        assert_eq!(substitute('1'), FnSubstitution::Key(Key::F(1)));
        assert_eq!(substitute('9'), FnSubstitution::Key(Key::F(9)));
        assert_eq!(substitute('0'), FnSubstitution::Key(Key::F(10)));
    }

    #[test]
    fn alt_letters_and_punctuation() {
        assert_eq!(
            substitute('b'),
            FnSubstitution::CodePoint('b', ModifierState::alt())
        );
        assert_eq!(
            substitute('.'),
            FnSubstitution::CodePoint('\u{1c}', ModifierState::NONE)
        );
    }

    #[test]
    fn toolbar_toggle_releases_fn() {
        for c in ['q', 'k'] {
            assert!(substitute(c).clears_fn());
        }
        assert!(!substitute('v').clears_fn());
    }

    #[test]
    fn unmapped_code_points_are_swallowed() {
        assert_eq!(substitute('z'), FnSubstitution::Swallow);
        assert_eq!(substitute('/'), FnSubstitution::Swallow);
    }
}
