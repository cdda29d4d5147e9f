//! Render-loop glue: wires the store, sampler, transport, camera and session
//! controller together and exposes the one-call-per-frame driver contract the
//! external renderer owns.

use std::cell::RefCell;
use std::rc::Rc;

use crossbeam_channel::Sender;
use glam::Quat;

use crate::animation::{primary_once_clip, ClipInfo, PoseEvaluator, ScriptedAction};
use crate::audio::AudioBus;
use crate::camera::FreeLookCamera;
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::scroll::{ScrollIntentSampler, WheelEvent};
use crate::session::{ImmersiveSessionController, SessionDevice, SessionEvent, ViewerRig};
use crate::store::AppStore;
use crate::transport::{ClipTimeline, SceneOverlay, TransportEngine};

/// The assembled experience, driven by the host's render loop.
pub struct FilmRuntime {
    store: AppStore,
    sampler: ScrollIntentSampler,
    transport: Rc<RefCell<TransportEngine>>,
    camera: Rc<RefCell<FreeLookCamera>>,
    session: Rc<RefCell<ImmersiveSessionController>>,
}

impl FilmRuntime {
    /// Wires all components from the loaded scene's collaborators.
    ///
    /// The clip duration comes from the primary clock-gated clip; a missing
    /// primary clip or a non-positive duration is fatal to starting and
    /// surfaces here, before any playback is possible.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        clips: &[ClipInfo],
        audio: AudioBus,
        evaluator: Box<dyn PoseEvaluator>,
        overlay: Box<dyn SceneOverlay>,
        actions: Vec<Box<dyn ScriptedAction>>,
        device: Box<dyn SessionDevice>,
        rig: Box<dyn ViewerRig>,
    ) -> Result<Self, EngineError> {
        let primary = primary_once_clip(clips).ok_or(EngineError::MissingPrimaryClip)?;
        let timeline = ClipTimeline::new(primary.duration)?;

        let store = AppStore::new();
        store.set_clip_duration(timeline.duration());

        let transport = TransportEngine::new(
            config.transport,
            timeline,
            audio,
            evaluator,
            overlay,
            store.clone(),
        );
        let camera = FreeLookCamera::new(config.camera, actions, store.clone());
        let session = ImmersiveSessionController::new(device, rig, store.clone());
        let sampler = ScrollIntentSampler::new(config.sampler);

        Ok(Self {
            store,
            sampler,
            transport,
            camera,
            session,
        })
    }

    /// The shared state: the sole contract the surrounding UI reads or
    /// writes (play/pause/stop requests, progress, capability flag).
    pub fn store(&self) -> &AppStore {
        &self.store
    }

    /// Endpoint for the host's wheel/trackpad handler.
    pub fn wheel_sender(&self) -> Sender<WheelEvent> {
        self.sampler.sender()
    }

    /// Advances the experience by one rendered frame.
    ///
    /// Change notifications are pumped between phases so each component
    /// updates against the frame's settled state.
    pub fn frame(&mut self, dt: f64) {
        self.sampler.poll(&self.store);
        self.store.dispatch();
        self.transport.borrow_mut().update(dt);
        self.store.dispatch();
        self.camera.borrow_mut().update(dt);
        self.store.dispatch();
    }

    pub fn current_time(&self) -> f64 {
        self.transport.borrow().current_time()
    }

    /// The free-look override orientation for the renderer's camera.
    pub fn camera_orientation(&self) -> Quat {
        self.camera.borrow().orientation()
    }

    pub fn pointer_down(&self, x: f32, y: f32) {
        self.camera.borrow_mut().pointer_down(x, y);
    }

    pub fn pointer_move(&self, x: f32, y: f32) {
        self.camera.borrow_mut().pointer_move(x, y);
    }

    pub fn pointer_up(&self) {
        self.camera.borrow_mut().pointer_up();
    }

    pub fn pointer_leave(&self) {
        self.camera.borrow_mut().pointer_leave();
    }

    pub fn click(&self) {
        self.camera.borrow_mut().click();
        self.store.dispatch();
    }

    /// Forwards a session lifecycle event from the device.
    pub fn session_event(&self, event: SessionEvent) {
        self.session.borrow_mut().handle_event(event);
        self.store.dispatch();
    }
}
