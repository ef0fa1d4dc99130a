//! Foreground/background transitions and the bell sound resource.

use std::io;

use tracing::{debug, warn};

use super::active::ActiveSessionController;
use crate::config::BellBehaviour;
use crate::event::{EventSink, HostEvent};
use crate::session::{SessionHandle, SessionRegistry};
use crate::store::SessionStore;

/// A loaded bell sound. Dropping it releases the underlying resource.
pub trait BellSound {
    fn play(&mut self);
}

/// Loads the bell sound on first use.
pub type BellLoader = Box<dyn FnMut() -> io::Result<Box<dyn BellSound>>>;

/// Persists the current session when the host goes to the background and
/// restores it when it comes back. Owns the bell sound, which is loaded
/// lazily and released before backgrounding.
pub struct LifecycleCoordinator {
    bell_behaviour: BellBehaviour,
    loader: BellLoader,
    bell: Option<Box<dyn BellSound>>,
}

impl LifecycleCoordinator {
    pub fn new(bell_behaviour: BellBehaviour, loader: BellLoader) -> Self {
        Self {
            bell_behaviour,
            loader,
            bell: None,
        }
    }

    /// Whether the bell sound is currently loaded.
    pub fn has_bell_sound(&self) -> bool {
        self.bell.is_some()
    }

    /// Going to the background: store the current handle and release the bell.
    pub fn on_stop(&mut self, current: Option<SessionHandle>, store: &dyn SessionStore) {
        if let Err(e) = store.set_current_session(current) {
            warn!("failed to store current session: {e}");
        }
        if self.bell.take().is_some() {
            debug!("bell sound released");
        }
    }

    /// Back in the foreground: make the stored (or last) session current and
    /// force a redraw.
    pub fn on_start(
        &mut self,
        active: &mut ActiveSessionController,
        registry: &SessionRegistry,
        store: &dyn SessionStore,
        sink: &mut EventSink,
    ) {
        if let Some(handle) = active.current_stored_or_last(registry, store) {
            active.set_current(registry, handle, sink);
        }
        if let Some(handle) = active.current() {
            sink.push(HostEvent::ScreenUpdated(handle));
        }
    }

    /// Ring the bell according to the configured behaviour. Silent while the
    /// UI is hidden.
    pub fn ring_bell(&mut self, sink: &mut EventSink) {
        if !sink.is_visible() {
            return;
        }
        match self.bell_behaviour {
            BellBehaviour::Vibrate => sink.push(HostEvent::Bell),
            BellBehaviour::Beep => {
                if let Some(bell) = self.bell_sound() {
                    bell.play();
                }
            }
            BellBehaviour::Ignore => {}
        }
    }

    fn bell_sound(&mut self) -> Option<&mut Box<dyn BellSound>> {
        if self.bell.is_none() {
            match (self.loader)() {
                Ok(sound) => {
                    debug!("bell sound loaded");
                    self.bell = Some(sound);
                }
                Err(e) => warn!("failed to load bell sound: {e}"),
            }
        }
        self.bell.as_mut()
    }
}
