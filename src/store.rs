//! # Reactive Shared State
//!
//! Process-wide store of the small set of fields the experience shares
//! between the transport engine, the input controllers and the page UI.
//!
//! ## Responsibilities
//! - **Playback state**: the `Stopped / Playing / Paused / Ended` machine,
//!   with invalid transitions rejected rather than applied.
//! - **Change notification**: field-level subscriptions; a subscriber
//!   registers a field selector and a callback and is invoked with the
//!   previous and next snapshots.
//! - **Scroll mailbox**: the pending scroll impulse as a single overwritable
//!   slot with an explicit consume, not a queue.
//!
//! ## Key Types
//! - `AppStore`: cheaply cloneable handle, single-threaded.
//! - `PlaybackState`: the transport state machine.
//! - `Subscription`: RAII handle; dropping it retires the subscriber.
//!
//! Delivery is deferred: mutations enqueue change events and `dispatch()`
//! drains them. The render loop pumps `dispatch()` between frame phases, so
//! callbacks never run while another component is being updated. A callback
//! may observe that the field has changed again since the event was queued;
//! subscribers get the snapshot pair and no intermediate-state guarantee.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::session::SessionHandle;

/// The mutually exclusive transport states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
    Ended,
}

impl PlaybackState {
    /// Whether `next` is a legal transition from this state.
    ///
    /// The machine is `Stopped → Playing → {Paused, Ended} → Stopped`, with
    /// `Paused` able to resume and any active state able to stop.
    pub fn can_transition(self, next: PlaybackState) -> bool {
        use PlaybackState::*;
        matches!(
            (self, next),
            (Stopped, Playing)
                | (Playing, Paused)
                | (Playing, Ended)
                | (Playing, Stopped)
                | (Paused, Playing)
                | (Paused, Stopped)
                | (Ended, Stopped)
        )
    }

    /// True for every state except `Stopped`: the film is underway.
    pub fn is_active(self) -> bool {
        !matches!(self, PlaybackState::Stopped)
    }
}

/// Snapshot of every shared field.
#[derive(Clone, Debug, PartialEq)]
pub struct AppState {
    pub playback: PlaybackState,
    /// Total clip duration in seconds, 0.0 until the scene is loaded.
    pub clip_duration: f64,
    /// Whether the device supports immersive sessions. Probed once at load.
    pub xr_supported: bool,
    /// Handle of the live immersive session, if any.
    pub session: Option<SessionHandle>,
    /// Pending scroll impulse. Mailbox slot, consumed by the transport.
    pub scroll_impulse: Option<f64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            playback: PlaybackState::Stopped,
            clip_duration: 0.0,
            xr_supported: false,
            session: None,
            scroll_impulse: None,
        }
    }
}

/// Field selectors for subscriptions.
///
/// The scroll impulse is intentionally absent: it is a polled mailbox, not a
/// broadcast field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateField {
    Playback,
    ClipDuration,
    XrSupported,
    Session,
}

/// A change event delivered to subscribers of a field.
#[derive(Clone, Debug)]
pub struct StateChange {
    pub field: StateField,
    pub prev: AppState,
    pub next: AppState,
}

type SubscriberFn = dyn FnMut(&AppStore, &StateChange);

struct Subscriber {
    id: u64,
    field: StateField,
    active: Cell<bool>,
    callback: RefCell<Box<SubscriberFn>>,
}

struct StoreInner {
    state: RefCell<AppState>,
    subscribers: RefCell<Vec<Rc<Subscriber>>>,
    queue: RefCell<VecDeque<StateChange>>,
    dispatching: Cell<bool>,
    next_id: Cell<u64>,
}

/// Handle to the shared state. Clones share the same underlying store.
#[derive(Clone)]
pub struct AppStore {
    inner: Rc<StoreInner>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(AppState::default()),
                subscribers: RefCell::new(Vec::new()),
                queue: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> AppState {
        self.inner.state.borrow().clone()
    }

    pub fn playback(&self) -> PlaybackState {
        self.inner.state.borrow().playback
    }

    pub fn clip_duration(&self) -> f64 {
        self.inner.state.borrow().clip_duration
    }

    pub fn xr_supported(&self) -> bool {
        self.inner.state.borrow().xr_supported
    }

    pub fn session(&self) -> Option<SessionHandle> {
        self.inner.state.borrow().session
    }

    /// Applies a transition of the playback machine.
    ///
    /// Returns `true` if the state now equals `next` (including the no-op
    /// case); an illegal transition is rejected with a warning and leaves the
    /// state untouched.
    pub fn set_playback(&self, next: PlaybackState) -> bool {
        let current = self.playback();
        if current == next {
            return true;
        }
        if !current.can_transition(next) {
            warn!(?current, ?next, "rejected playback transition");
            return false;
        }
        debug!(?current, ?next, "playback transition");
        self.publish(StateField::Playback, |s| s.playback = next);
        true
    }

    /// `Stopped → Playing`: begin the film from the top.
    pub fn request_play(&self) -> bool {
        self.set_playback(PlaybackState::Playing)
    }

    /// Stops the film from any active state. No-op when already stopped.
    pub fn request_stop(&self) -> bool {
        self.set_playback(PlaybackState::Stopped)
    }

    /// `Playing → Paused`.
    pub fn pause(&self) -> bool {
        self.set_playback(PlaybackState::Paused)
    }

    /// `Paused → Playing`.
    pub fn resume(&self) -> bool {
        self.set_playback(PlaybackState::Playing)
    }

    /// `Playing → Ended`. Set by the transport when the clock reaches the
    /// clip duration.
    pub fn mark_ended(&self) -> bool {
        self.set_playback(PlaybackState::Ended)
    }

    pub fn set_clip_duration(&self, duration: f64) {
        self.publish(StateField::ClipDuration, |s| s.clip_duration = duration);
    }

    pub fn set_xr_supported(&self, supported: bool) {
        self.publish(StateField::XrSupported, |s| s.xr_supported = supported);
    }

    pub fn set_session(&self, session: Option<SessionHandle>) {
        self.publish(StateField::Session, |s| s.session = session);
    }

    /// Writes a scroll impulse into the mailbox. Last writer wins: an
    /// unconsumed impulse is replaced, never queued behind.
    pub fn offer_scroll(&self, delta: f64) {
        self.inner.state.borrow_mut().scroll_impulse = Some(delta);
    }

    /// Consumes the pending scroll impulse, clearing the slot.
    pub fn take_scroll_impulse(&self) -> Option<f64> {
        self.inner.state.borrow_mut().scroll_impulse.take()
    }

    /// Registers a subscriber for changes of one field.
    ///
    /// The callback receives the store handle and the `prev`/`next` snapshot
    /// pair; it is only invoked when the selected field actually changed.
    pub fn subscribe<F>(&self, field: StateField, callback: F) -> Subscription
    where
        F: FnMut(&AppStore, &StateChange) + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let sub = Rc::new(Subscriber {
            id,
            field,
            active: Cell::new(true),
            callback: RefCell::new(Box::new(callback)),
        });
        self.inner.subscribers.borrow_mut().push(sub);
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Drains the change queue, invoking matching subscribers.
    ///
    /// Re-entrant calls (a callback mutating the store) only enqueue; the
    /// outermost dispatch delivers them before returning.
    pub fn dispatch(&self) {
        if self.inner.dispatching.replace(true) {
            return;
        }
        loop {
            let event = self.inner.queue.borrow_mut().pop_front();
            let Some(event) = event else { break };
            // Snapshot so callbacks may subscribe/unsubscribe freely.
            let targets: Vec<Rc<Subscriber>> = self
                .inner
                .subscribers
                .borrow()
                .iter()
                .filter(|s| s.field == event.field && s.active.get())
                .cloned()
                .collect();
            for sub in targets {
                // A callback earlier in this event may have retired this one.
                if sub.active.get() {
                    (sub.callback.borrow_mut())(self, &event);
                }
            }
        }
        self.inner.dispatching.set(false);
    }

    fn publish(&self, field: StateField, mutate: impl FnOnce(&mut AppState)) {
        let prev = self.inner.state.borrow().clone();
        mutate(&mut self.inner.state.borrow_mut());
        let next = self.inner.state.borrow().clone();
        if prev == next {
            return;
        }
        self.inner
            .queue
            .borrow_mut()
            .push_back(StateChange { field, prev, next });
    }
}

/// Handle to a registered subscriber. Unsubscribes on drop.
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
}

impl Subscription {
    /// Retires the subscriber immediately. The callback will not run again,
    /// even for events already queued.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.store.upgrade() {
            let mut subs = inner.subscribers.borrow_mut();
            if let Some(pos) = subs.iter().position(|s| s.id == self.id) {
                subs[pos].active.set(false);
                subs.remove(pos);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
