//! # Immersive Session Controller
//!
//! Bridges the head-mounted session device into the experience. Capability
//! is probed once at construction and cached in the shared state; everyone
//! else treats the flag as read-only. When the film starts on a capable
//! device a session is requested; the device answers asynchronously with
//! lifecycle events the host forwards into
//! [`handle_event`](ImmersiveSessionController::handle_event). A failed
//! request degrades to the on-screen transport, never a crash.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::store::{AppStore, PlaybackState, StateChange, StateField, Subscription};

/// Opaque identifier of a granted immersive session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionHandle(pub u64);

/// Lifecycle events delivered by the session device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Started(SessionHandle),
    /// User- or device-initiated teardown.
    Ended,
}

/// The device/session collaborator.
pub trait SessionDevice {
    /// Whether immersive sessions are available at all. Called once.
    fn supported(&self) -> bool;
    /// Initiates a session request; the grant arrives later as
    /// [`SessionEvent::Started`].
    fn request_session(&mut self) -> Result<(), EngineError>;
}

/// The viewer rig node whose offset places the camera in the scene.
pub trait ViewerRig {
    fn set_offset(&mut self, offset: Vec3);
}

/// Eye-height compensation applied while a floor-referenced session runs.
const FLOOR_OFFSET: Vec3 = Vec3::new(0.0, -1.6, 0.0);

pub struct ImmersiveSessionController {
    device: Box<dyn SessionDevice>,
    rig: Box<dyn ViewerRig>,
    store: AppStore,
    subscriptions: Vec<Subscription>,
}

impl ImmersiveSessionController {
    /// Probes capability, caches it in the store and subscribes for film
    /// start.
    pub fn new(
        device: Box<dyn SessionDevice>,
        rig: Box<dyn ViewerRig>,
        store: AppStore,
    ) -> Rc<RefCell<Self>> {
        store.set_xr_supported(device.supported());

        let controller = Rc::new(RefCell::new(Self {
            device,
            rig,
            store: store.clone(),
            subscriptions: Vec::new(),
        }));

        let weak = Rc::downgrade(&controller);
        let sub = store.subscribe(StateField::Playback, move |_, change| {
            if let Some(controller) = weak.upgrade() {
                controller.borrow_mut().on_playback(change);
            }
        });
        controller.borrow_mut().subscriptions.push(sub);
        controller
    }

    /// Handles a session lifecycle event from the device.
    ///
    /// Start repositions the rig to floor height and publishes the handle;
    /// end forces the transport back to idle and restores the rig.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Started(handle) => {
                debug!(?handle, "immersive session started");
                self.rig.set_offset(FLOOR_OFFSET);
                self.store.set_session(Some(handle));
            }
            SessionEvent::Ended => {
                debug!("immersive session ended");
                self.store.set_session(None);
                self.store.request_stop();
                self.rig.set_offset(Vec3::ZERO);
            }
        }
    }

    fn on_playback(&mut self, change: &StateChange) {
        let started = change.prev.playback == PlaybackState::Stopped
            && change.next.playback == PlaybackState::Playing;
        if !started || !self.store.xr_supported() {
            return;
        }
        if let Err(err) = self.device.request_session() {
            // Transient device failure: fall back to on-screen transport.
            warn!(%err, "immersive session request failed; continuing on screen");
            self.store.set_xr_supported(false);
        }
    }
}
