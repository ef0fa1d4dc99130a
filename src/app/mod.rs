//! Host state: the glue between sessions, input routing and the UI.
//!
//! [`Host`] is owned by the UI loop. Input goes in through the key methods in
//! `actions.rs`, backend output is pulled in by [`Host::pump`], and everything
//! the UI needs to react to comes out of [`Host::drain_events`].

pub mod active;
mod actions;
pub mod lifecycle;
mod sessions;

use std::sync::mpsc::{self, Receiver};

use crate::config::Config;
use crate::event::{EventSink, HostEvent};
use crate::input::{InputRouter, RouteContext};
use crate::session::{BackendEvent, ProcessBackend, Session, SessionHandle, SessionRegistry};
use crate::store::SessionStore;

pub use active::{ActiveSessionController, ActiveState, FinishOutcome};
pub use lifecycle::{BellLoader, BellSound, LifecycleCoordinator};

/// Most backend notifications handled by one [`Host::pump`] call.
pub const PUMP_BUDGET: usize = 256;

/// The session multiplexing core of a terminal host.
pub struct Host {
    config: Config,
    registry: SessionRegistry,
    active: ActiveSessionController,
    router: InputRouter,
    lifecycle: LifecycleCoordinator,
    store: Box<dyn SessionStore>,
    /// Output and exit notifications from every session's I/O threads.
    backend_rx: Receiver<BackendEvent>,
    sink: EventSink,
    /// Set once the host has been asked to shut down.
    stopping: bool,
}

impl Host {
    pub fn new(
        config: Config,
        backend: Box<dyn ProcessBackend>,
        store: Box<dyn SessionStore>,
        bell_loader: BellLoader,
    ) -> Self {
        let (events_tx, backend_rx) = mpsc::channel();
        let registry = SessionRegistry::new(backend, events_tx);
        let active = ActiveSessionController::new(!config.disable_session_change_toasts);
        let router = InputRouter::new(config.router_settings());
        let lifecycle = LifecycleCoordinator::new(config.bell_behaviour, bell_loader);

        Self {
            config,
            registry,
            active,
            router,
            lifecycle,
            store,
            backend_rx,
            sink: EventSink::new(),
            stopping: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn router(&self) -> &InputRouter {
        &self.router
    }

    pub fn state(&self) -> ActiveState {
        self.active.state()
    }

    pub fn current(&self) -> Option<SessionHandle> {
        self.active.current()
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.active.current().and_then(|h| self.registry.get(h))
    }

    fn current_session_mut(&mut self) -> Option<&mut Session> {
        let handle = self.active.current()?;
        self.registry.get_mut(handle)
    }

    pub fn is_visible(&self) -> bool {
        self.sink.is_visible()
    }

    /// Take every event queued since the last call.
    pub fn drain_events(&mut self) -> Vec<HostEvent> {
        self.sink.drain().collect()
    }

    /// Ask the host to shut down. The next finished session terminates it.
    pub fn request_stop(&mut self) {
        self.stopping = true;
    }

    fn route_context(&self) -> RouteContext {
        match self.current_session() {
            Some(session) => RouteContext {
                has_session: true,
                session_running: session.is_running(),
            },
            None => RouteContext::default(),
        }
    }
}
