//! termhost library crate.
//!
//! The session multiplexing and input routing core of a terminal host:
//! - PTY-backed sessions and the bounded session registry
//! - Active-session tracking, dismissal and foreground/background handling
//! - Key routing for hardware keyboards, extra-key buttons and macros
//! - Configuration and the persisted current-session store

pub mod app;
pub mod config;
pub mod error;
pub mod event;
pub mod input;
pub mod notice;
pub mod session;
pub mod store;
