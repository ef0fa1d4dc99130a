//! Key input resolution.
//!
//! This module provides:
//! - `InputRouter` - Resolves key events into session actions or terminal input
//! - `keys` - Key model and xterm byte encoding
//! - `modifiers` - Modifier state and the extra-keys special buttons
//! - `extra_keys` - Extra-keys buttons, aliases and macro expansion
//! - `shortcuts` - Configurable Ctrl+key session shortcuts
//! - `fn_keys` - Virtual Fn substitution table

pub mod extra_keys;
pub mod fn_keys;
pub mod keys;
pub mod modifiers;
pub mod router;
pub mod shortcuts;

pub use extra_keys::{ExtraKey, ExtraKeyButton, HostButton};
pub use keys::{Key, KeyInput, KeySource};
pub use modifiers::{ModifierState, SpecialButton};
pub use router::{Dispatch, InputRouter, RouteContext, RouterSettings, SessionAction};
pub use shortcuts::{KeyboardShortcut, ShortcutAction, ShortcutTable};
