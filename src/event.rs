//! Events the host core emits for the UI layer.
//!
//! The core never calls into rendering code. It queues [`HostEvent`]s which
//! the UI drains after every input or backend pump.

use std::collections::VecDeque;

use crate::notice::Notice;
use crate::session::SessionHandle;

/// Host-side requests that have no effect on session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiRequest {
    ToggleKeyboard,
    ContextMenu,
    UrlSelection,
    /// Paste the clipboard into the current session.
    Paste,
    FontSize { increase: bool },
    ToggleToolbar,
    VolumePanel,
    ToggleAutoScroll,
    /// Ask the user for a new name for the session.
    Rename(SessionHandle),
}

/// Notification from the host core to its UI observer.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A different session became current.
    SessionChanged(SessionHandle),
    /// The last session was removed; nothing is current.
    SessionCleared,
    TitleChanged {
        handle: SessionHandle,
        title: String,
    },
    SessionFinished {
        handle: SessionHandle,
        exit_code: Option<i32>,
    },
    /// New output for the current session.
    ScreenUpdated(SessionHandle),
    Bell,
    /// Re-derive background/foreground colors from the current session.
    StyleRefresh,
    Notice(Notice),
    Ui(UiRequest),
    /// The host should exit.
    TerminateHost,
}

/// Queue of [`HostEvent`]s plus the UI visibility flag that gates them.
///
/// Visibility is owned by the host and passed explicitly to every component
/// that emits user-facing notifications.
#[derive(Debug)]
pub struct EventSink {
    queue: VecDeque<HostEvent>,
    visible: bool,
}

impl EventSink {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            visible: true,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Queue an event regardless of visibility.
    pub fn push(&mut self, event: HostEvent) {
        self.queue.push_back(event);
    }

    /// Queue an event only while the UI is visible.
    pub fn push_visible(&mut self, event: HostEvent) {
        if self.visible {
            self.queue.push_back(event);
        }
    }

    /// Queue a notice. Toasts are dropped while hidden; dialogs never are.
    pub fn notice(&mut self, notice: Notice) {
        if notice.modal {
            self.push(HostEvent::Notice(notice));
        } else {
            self.push_visible(HostEvent::Notice(notice));
        }
    }

    pub fn drain(&mut self) -> impl Iterator<Item = HostEvent> + '_ {
        self.queue.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}
