//! Toast and dialog payloads, plus a small expiring queue for hosts that
//! show them inline.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    /// Shown as a blocking dialog rather than a toast.
    pub modal: bool,
    /// Shown for the long toast duration.
    pub long: bool,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Info,
            modal: false,
            long: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Error,
            modal: false,
            long: true,
        }
    }

    /// Blocking dialog.
    pub fn dialog(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Warning,
            modal: true,
            long: true,
        }
    }

    /// Use the long toast duration.
    pub fn long(mut self) -> Self {
        self.long = true;
        self
    }

    pub fn duration(&self) -> Duration {
        if self.long {
            Duration::from_millis(3500)
        } else {
            Duration::from_millis(2000)
        }
    }
}

#[derive(Debug, Clone)]
struct Shown {
    notice: Notice,
    created_at: Instant,
}

impl Shown {
    fn is_expired(&self) -> bool {
        !self.notice.modal && self.created_at.elapsed() >= self.notice.duration()
    }
}

/// Notices currently on screen. Modal notices stay until dismissed.
pub struct NoticeQueue {
    queue: VecDeque<Shown>,
    max_visible: usize,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            max_visible: 3,
        }
    }

    pub fn push(&mut self, notice: Notice) {
        self.queue.push_back(Shown {
            notice,
            created_at: Instant::now(),
        });
        while self.queue.len() > self.max_visible {
            self.queue.pop_front();
        }
    }

    /// Drop expired toasts.
    pub fn update(&mut self) {
        self.queue.retain(|s| !s.is_expired());
    }

    /// Dismiss modal notices.
    pub fn dismiss(&mut self) {
        self.queue.retain(|s| !s.notice.modal);
    }

    pub fn has_modal(&self) -> bool {
        self.queue.iter().any(|s| s.notice.modal)
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notice> {
        self.queue.iter().map(|s| &s.notice)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for NoticeQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_notices() {
        let mut queue = NoticeQueue::new();
        for i in 0..5 {
            queue.push(Notice::info(format!("n{i}")));
        }
        let messages: Vec<_> = queue.visible().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["n2", "n3", "n4"]);
    }

    #[test]
    fn modal_notices_survive_until_dismissed() {
        let mut queue = NoticeQueue::new();
        queue.push(Notice::dialog("full"));
        queue.update();
        assert!(queue.has_modal());

        queue.dismiss();
        assert!(queue.is_empty());
    }
}
