//! Single authority for which session is current.
//!
//! The controller keeps a handle only. Every operation re-resolves it through
//! the [`SessionRegistry`], and every operation on an unknown handle is a
//! no-op, since sessions may disappear between an event being queued and
//! handled.

use tracing::debug;

use crate::event::{EventSink, HostEvent};
use crate::notice::Notice;
use crate::session::{Session, SessionHandle, SessionRegistry};
use crate::store::SessionStore;

/// Current-session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveState {
    Empty,
    Active(SessionHandle),
}

/// What finishing a session led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// The host should exit.
    Terminate,
    /// The session was removed right away to deliver its result.
    Removed,
    /// The session stays visible until the user dismisses it.
    Kept,
}

pub struct ActiveSessionController {
    current: Option<SessionHandle>,
    session_change_toasts: bool,
}

impl ActiveSessionController {
    pub fn new(session_change_toasts: bool) -> Self {
        Self {
            current: None,
            session_change_toasts,
        }
    }

    pub fn state(&self) -> ActiveState {
        match self.current {
            Some(handle) => ActiveState::Active(handle),
            None => ActiveState::Empty,
        }
    }

    pub fn current(&self) -> Option<SessionHandle> {
        self.current
    }

    /// Make `handle` current. Unknown handles are ignored.
    ///
    /// Emits `SessionChanged` (and a toast) only when the current session
    /// actually changes and the UI is visible. Always requests a style
    /// refresh.
    pub fn set_current(
        &mut self,
        registry: &SessionRegistry,
        handle: SessionHandle,
        sink: &mut EventSink,
    ) {
        let Some(index) = registry.index_of(handle) else {
            debug!(%handle, "ignoring switch to unknown session");
            return;
        };

        if self.current != Some(handle) {
            self.current = Some(handle);
            sink.push_visible(HostEvent::SessionChanged(handle));
            if self.session_change_toasts {
                if let Some(session) = registry.get(handle) {
                    sink.notice(Notice::info(session.label(index)));
                }
            }
        }
        sink.push(HostEvent::StyleRefresh);
    }

    /// Move to the next or previous session, wrapping around.
    pub fn switch_relative(
        &mut self,
        registry: &SessionRegistry,
        forward: bool,
        sink: &mut EventSink,
    ) {
        let count = registry.count();
        if count == 0 {
            return;
        }
        let next = match self.current.and_then(|h| registry.index_of(h)) {
            Some(index) if forward => (index + 1) % count,
            Some(index) => (index + count - 1) % count,
            None if forward => 0,
            None => count - 1,
        };
        if let Some(session) = registry.get_by_index(next) {
            let handle = session.handle();
            self.set_current(registry, handle, sink);
        }
    }

    /// Jump to the session at `index`. Out of range is a no-op.
    pub fn switch_to_index(&mut self, registry: &SessionRegistry, index: usize, sink: &mut EventSink) {
        if let Some(session) = registry.get_by_index(index) {
            let handle = session.handle();
            self.set_current(registry, handle, sink);
        }
    }

    /// Remove a session and pick a new current one: the session at the
    /// compacted index (clamped to the new last index) if it is running, else
    /// the nearest running survivor. Only when every survivor has finished
    /// does a finished session become current. Empty when nothing is left.
    pub fn remove_finished(
        &mut self,
        registry: &mut SessionRegistry,
        handle: SessionHandle,
        sink: &mut EventSink,
    ) -> Option<usize> {
        let index = registry.remove(handle)?;

        match registry.count() {
            0 => {
                self.current = None;
                sink.push(HostEvent::SessionCleared);
            }
            count => {
                let start = index.min(count - 1);
                let replacement = nearest_running(registry, start)
                    .or_else(|| registry.get_by_index(start).map(Session::handle));
                if let Some(replacement) = replacement {
                    self.set_current(registry, replacement, sink);
                }
            }
        }
        Some(index)
    }

    /// React to a session's process exiting.
    ///
    /// A stopping backend wins over everything. A pending result forces
    /// immediate removal whether or not the session is current or visible.
    /// Anything else stays around, dead, until the user dismisses it.
    pub fn on_session_finished(
        &mut self,
        registry: &mut SessionRegistry,
        handle: SessionHandle,
        backend_wants_to_stop: bool,
        sink: &mut EventSink,
    ) -> FinishOutcome {
        if backend_wants_to_stop {
            sink.push(HostEvent::TerminateHost);
            return FinishOutcome::Terminate;
        }

        let Some(index) = registry.index_of(handle) else {
            return FinishOutcome::Kept;
        };
        let pending_result = registry
            .get(handle)
            .is_some_and(|s| s.has_pending_result());

        if self.current != Some(handle) {
            if let Some(session) = registry.get(handle) {
                sink.notice(Notice::info(format!("{} - exited", session.label(index))).long());
            }
        }

        if pending_result {
            debug!(%handle, "removing session with pending result");
            self.remove_finished(registry, handle, sink);
            return FinishOutcome::Removed;
        }
        FinishOutcome::Kept
    }

    /// Handle to restore: the stored one if it still resolves, else the most
    /// recently created session.
    pub fn current_stored_or_last(
        &self,
        registry: &SessionRegistry,
        store: &dyn SessionStore,
    ) -> Option<SessionHandle> {
        let stored = match store.current_session() {
            Ok(stored) => stored,
            Err(e) => {
                debug!("stored session unavailable: {e}");
                None
            }
        };
        stored
            .filter(|h| registry.get(*h).is_some())
            .or_else(|| registry.last().map(|s| s.handle()))
    }
}

/// Running session closest to `index`, preferring the later one on a tie.
fn nearest_running(registry: &SessionRegistry, index: usize) -> Option<SessionHandle> {
    (0..registry.count())
        .flat_map(|d| [index.checked_add(d), index.checked_sub(d)])
        .flatten()
        .filter_map(|i| registry.get_by_index(i))
        .find(|s| s.is_running())
        .map(Session::handle)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use proptest::prelude::*;

    use super::*;
    use crate::error::StoreError;
    use crate::session::registry::tests::registry;
    use crate::session::{BackendEvent, SpawnRequest};
    use crate::store::MemoryStore;

    fn controller() -> ActiveSessionController {
        ActiveSessionController::new(true)
    }

    fn changes(sink: &mut EventSink) -> Vec<SessionHandle> {
        sink.drain()
            .filter_map(|e| match e {
                HostEvent::SessionChanged(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn set_current_emits_only_on_change() {
        let (mut reg, _backend) = registry();
        let a = reg.create(false, None, Path::new("/")).unwrap().handle();
        let mut ctl = controller();
        let mut sink = EventSink::new();

        ctl.set_current(&reg, a, &mut sink);
        ctl.set_current(&reg, a, &mut sink);
        let events: Vec<_> = sink.drain().collect();
        let changed = events
            .iter()
            .filter(|e| matches!(e, HostEvent::SessionChanged(_)))
            .count();
        let refreshed = events
            .iter()
            .filter(|e| matches!(e, HostEvent::StyleRefresh))
            .count();
        assert_eq!((changed, refreshed), (1, 2));
        assert_eq!(ctl.state(), ActiveState::Active(a));
    }

    #[test]
    fn hidden_ui_switches_silently() {
        let (mut reg, _backend) = registry();
        let a = reg.create(false, None, Path::new("/")).unwrap().handle();
        let mut ctl = controller();
        let mut sink = EventSink::new();
        sink.set_visible(false);

        ctl.set_current(&reg, a, &mut sink);
        assert_eq!(ctl.current(), Some(a));
        assert!(changes(&mut sink).is_empty());
    }

    #[test]
    fn unknown_handle_is_ignored() {
        let (mut reg, _backend) = registry();
        let a = reg.create(false, None, Path::new("/")).unwrap().handle();
        let mut ctl = controller();
        let mut sink = EventSink::new();
        ctl.set_current(&reg, a, &mut sink);

        ctl.set_current(&reg, SessionHandle::new(), &mut sink);
        assert_eq!(ctl.current(), Some(a));
        ctl.switch_to_index(&reg, 5, &mut sink);
        assert_eq!(ctl.current(), Some(a));
    }

    #[test]
    fn switch_relative_wraps_both_ways() {
        let (mut reg, _backend) = registry();
        let handles: Vec<_> = (0..3)
            .map(|_| reg.create(false, None, Path::new("/")).unwrap().handle())
            .collect();
        let mut ctl = controller();
        let mut sink = EventSink::new();
        ctl.set_current(&reg, handles[2], &mut sink);

        ctl.switch_relative(&reg, true, &mut sink);
        assert_eq!(ctl.current(), Some(handles[0]));
        ctl.switch_relative(&reg, false, &mut sink);
        assert_eq!(ctl.current(), Some(handles[2]));
    }

    #[test]
    fn switch_without_current_starts_at_either_end() {
        let (mut reg, _backend) = registry();
        let handles: Vec<_> = (0..3)
            .map(|_| reg.create(false, None, Path::new("/")).unwrap().handle())
            .collect();
        let mut sink = EventSink::new();

        let mut ctl = controller();
        ctl.switch_relative(&reg, true, &mut sink);
        assert_eq!(ctl.current(), Some(handles[0]));

        let mut ctl = controller();
        ctl.switch_relative(&reg, false, &mut sink);
        assert_eq!(ctl.current(), Some(handles[2]));
    }

    #[test]
    fn switch_on_empty_registry_is_a_no_op() {
        let (reg, _backend) = registry();
        let mut ctl = controller();
        let mut sink = EventSink::new();
        ctl.switch_relative(&reg, true, &mut sink);
        assert_eq!(ctl.state(), ActiveState::Empty);
        assert!(sink.is_empty());
    }

    #[test]
    fn pending_result_session_is_removed_immediately() {
        let (mut reg, _backend) = registry();
        let a = reg
            .create_with(SpawnRequest::command("/", "make", vec!["test".into()]))
            .unwrap()
            .handle();
        let b = reg.create(false, None, Path::new("/")).unwrap().handle();
        let mut ctl = controller();
        let mut sink = EventSink::new();
        sink.set_visible(false);
        ctl.set_current(&reg, a, &mut sink);

        reg.get_mut(a).unwrap().mark_finished(Some(0));
        let outcome = ctl.on_session_finished(&mut reg, a, false, &mut sink);

        assert_eq!(outcome, FinishOutcome::Removed);
        assert_eq!(reg.handles(), vec![b]);
        assert_eq!(ctl.current(), Some(b));
    }

    #[test]
    fn ordinary_finished_session_is_kept_until_dismissed() {
        let (mut reg, _backend) = registry();
        let a = reg.create(false, None, Path::new("/")).unwrap().handle();
        let b = reg.create(false, None, Path::new("/")).unwrap().handle();
        let mut ctl = controller();
        let mut sink = EventSink::new();
        ctl.set_current(&reg, a, &mut sink);
        sink.drain().for_each(drop);

        reg.get_mut(b).unwrap().mark_finished(Some(1));
        assert_eq!(
            ctl.on_session_finished(&mut reg, b, false, &mut sink),
            FinishOutcome::Kept
        );
        assert_eq!(reg.count(), 2);
        let toast = sink.drain().find_map(|e| match e {
            HostEvent::Notice(n) => Some(n.message),
            _ => None,
        });
        assert_eq!(toast.as_deref(), Some("[2] - exited"));
    }

    #[test]
    fn stopping_backend_terminates() {
        let (mut reg, _backend) = registry();
        let a = reg.create(false, None, Path::new("/")).unwrap().handle();
        let mut ctl = controller();
        let mut sink = EventSink::new();

        let outcome = ctl.on_session_finished(&mut reg, a, true, &mut sink);
        assert_eq!(outcome, FinishOutcome::Terminate);
        assert!(sink.drain().any(|e| e == HostEvent::TerminateHost));
        assert_eq!(reg.count(), 1);
    }

    #[test]
    fn removing_last_session_empties_controller() {
        let (mut reg, _backend) = registry();
        let a = reg.create(false, None, Path::new("/")).unwrap().handle();
        let mut ctl = controller();
        let mut sink = EventSink::new();
        ctl.set_current(&reg, a, &mut sink);

        assert_eq!(ctl.remove_finished(&mut reg, a, &mut sink), Some(0));
        assert_eq!(ctl.state(), ActiveState::Empty);
        assert!(sink.drain().any(|e| e == HostEvent::SessionCleared));
        assert_eq!(ctl.remove_finished(&mut reg, a, &mut sink), None);
    }

    #[test]
    fn removing_last_index_clamps_replacement() {
        let (mut reg, _backend) = registry();
        let a = reg.create(false, None, Path::new("/")).unwrap().handle();
        let b = reg.create(false, None, Path::new("/")).unwrap().handle();
        let mut ctl = controller();
        let mut sink = EventSink::new();
        ctl.set_current(&reg, b, &mut sink);

        ctl.remove_finished(&mut reg, b, &mut sink);
        assert_eq!(ctl.current(), Some(a));
    }

    #[test]
    fn removal_skips_finished_neighbours() {
        let (mut reg, _backend) = registry();
        let a = reg.create(false, None, Path::new("/")).unwrap().handle();
        let b = reg.create(false, None, Path::new("/")).unwrap().handle();
        let c = reg.create(false, None, Path::new("/")).unwrap().handle();
        let mut ctl = controller();
        let mut sink = EventSink::new();
        ctl.set_current(&reg, a, &mut sink);

        reg.get_mut(b).unwrap().mark_finished(Some(0));
        ctl.remove_finished(&mut reg, a, &mut sink);
        assert_eq!(ctl.current(), Some(c));

        reg.get_mut(c).unwrap().mark_finished(Some(0));
        ctl.remove_finished(&mut reg, c, &mut sink);
        assert_eq!(ctl.current(), Some(b));
    }

    struct BrokenStore;

    impl SessionStore for BrokenStore {
        fn current_session(&self) -> Result<Option<SessionHandle>, StoreError> {
            Err(StoreError::PersistenceUnavailable("disk gone".into()))
        }

        fn set_current_session(&self, _: Option<SessionHandle>) -> Result<(), StoreError> {
            Err(StoreError::PersistenceUnavailable("disk gone".into()))
        }
    }

    #[test]
    fn restores_stored_handle_or_falls_back_to_last() {
        let (mut reg, _backend) = registry();
        let a = reg.create(false, None, Path::new("/")).unwrap().handle();
        let b = reg.create(false, None, Path::new("/")).unwrap().handle();
        let ctl = controller();
        let store = MemoryStore::default();

        assert_eq!(ctl.current_stored_or_last(&reg, &store), Some(b));
        store.set_current_session(Some(a)).unwrap();
        assert_eq!(ctl.current_stored_or_last(&reg, &store), Some(a));
        store.set_current_session(Some(SessionHandle::new())).unwrap();
        assert_eq!(ctl.current_stored_or_last(&reg, &store), Some(b));
        assert_eq!(ctl.current_stored_or_last(&reg, &BrokenStore), Some(b));
    }

    proptest! {
        #[test]
        fn switching_count_times_returns_to_start(count in 1usize..=8, start in 0usize..8, forward in any::<bool>()) {
            let (mut reg, _backend) = registry();
            for _ in 0..count {
                reg.create(false, None, Path::new("/")).unwrap();
            }
            let mut ctl = controller();
            let mut sink = EventSink::new();
            ctl.switch_to_index(&reg, start % count, &mut sink);
            let origin = ctl.current();

            for _ in 0..count {
                ctl.switch_relative(&reg, forward, &mut sink);
            }
            prop_assert_eq!(ctl.current(), origin);
        }

        #[test]
        fn removing_current_leaves_a_valid_state(
            count in 1usize..=8,
            pick in 0usize..8,
            finished in prop::collection::vec(any::<bool>(), 8),
        ) {
            let (mut reg, _backend) = registry();
            for _ in 0..count {
                reg.create(false, None, Path::new("/")).unwrap();
            }
            let mut ctl = controller();
            let mut sink = EventSink::new();
            ctl.switch_to_index(&reg, pick % count, &mut sink);
            let current = ctl.current().unwrap();
            for (handle, done) in reg.handles().into_iter().zip(finished) {
                if done && handle != current {
                    reg.get_mut(handle).unwrap().mark_finished(Some(0));
                }
            }

            ctl.remove_finished(&mut reg, current, &mut sink);
            let any_running = reg.iter().any(Session::is_running);
            match ctl.state() {
                ActiveState::Empty => prop_assert!(reg.is_empty()),
                ActiveState::Active(h) => {
                    prop_assert!(h != current);
                    let session = reg.get(h);
                    prop_assert!(session.is_some());
                    prop_assert!(session.is_some_and(Session::is_running) || !any_running);
                }
            }
        }
    }

    #[test]
    fn late_events_for_removed_sessions_are_harmless() {
        let (mut reg, _backend) = registry();
        let a = reg.create(false, None, Path::new("/")).unwrap().handle();
        let mut ctl = controller();
        let mut sink = EventSink::new();
        ctl.remove_finished(&mut reg, a, &mut sink);

        let late = BackendEvent::Exited { handle: a, code: Some(0) };
        assert_eq!(
            ctl.on_session_finished(&mut reg, late.handle(), false, &mut sink),
            FinishOutcome::Kept
        );
    }
}
