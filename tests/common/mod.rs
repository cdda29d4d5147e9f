//! Shared mock collaborators for the integration tests.
//!
//! Every mock exposes its state through an `Rc<RefCell<..>>` so a test can
//! keep inspecting it after the boxed handle moves into the engine.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use film_engine::animation::{PoseEvaluator, ScriptedAction};
use film_engine::audio::{AudioBus, AudioTransport};
use film_engine::config::TransportConfig;
use film_engine::errors::EngineError;
use film_engine::session::{SessionDevice, ViewerRig};
use film_engine::store::AppStore;
use film_engine::transport::{ClipTimeline, SceneOverlay, TransportEngine};

/// Installs a test-writer subscriber so engine traces land in captured test
/// output. Safe to call from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Default)]
pub struct TrackState {
    pub playing: bool,
    pub volume: f32,
    pub offset: f64,
    /// Estimated playback position; tests set this to simulate drift.
    pub position: Option<f64>,
    /// Every volume the engine ever set, in order.
    pub volume_log: Vec<f32>,
    pub plays: u32,
    pub pauses: u32,
    pub stops: u32,
}

pub struct MockTrack(pub Rc<RefCell<TrackState>>);

impl MockTrack {
    pub fn new() -> (Self, Rc<RefCell<TrackState>>) {
        let state = Rc::new(RefCell::new(TrackState::default()));
        (Self(state.clone()), state)
    }
}

impl AudioTransport for MockTrack {
    fn play(&mut self) {
        let mut s = self.0.borrow_mut();
        s.playing = true;
        s.plays += 1;
    }

    fn pause(&mut self) {
        let mut s = self.0.borrow_mut();
        s.playing = false;
        s.pauses += 1;
    }

    fn stop(&mut self) {
        let mut s = self.0.borrow_mut();
        s.playing = false;
        s.position = None;
        s.stops += 1;
    }

    fn is_playing(&self) -> bool {
        self.0.borrow().playing
    }

    fn set_volume(&mut self, gain: f32) {
        let mut s = self.0.borrow_mut();
        s.volume = gain;
        s.volume_log.push(gain);
    }

    fn volume(&self) -> f32 {
        self.0.borrow().volume
    }

    fn set_offset(&mut self, seconds: f64) {
        self.0.borrow_mut().offset = seconds;
    }

    fn position(&self) -> Option<f64> {
        self.0.borrow().position
    }
}

pub struct MockEvaluator(pub Rc<RefCell<Vec<f64>>>);

impl MockEvaluator {
    pub fn new() -> (Self, Rc<RefCell<Vec<f64>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (Self(log.clone()), log)
    }
}

impl PoseEvaluator for MockEvaluator {
    fn set_time(&mut self, seconds: f64) {
        self.0.borrow_mut().push(seconds);
    }
}

#[derive(Default)]
pub struct OverlayState {
    pub driver: f32,
    pub opacity: f32,
    pub opacity_log: Vec<f32>,
}

pub struct MockOverlay(pub Rc<RefCell<OverlayState>>);

impl MockOverlay {
    pub fn new() -> (Self, Rc<RefCell<OverlayState>>) {
        let state = Rc::new(RefCell::new(OverlayState::default()));
        (Self(state.clone()), state)
    }
}

impl SceneOverlay for MockOverlay {
    fn driver_value(&self) -> f32 {
        self.0.borrow().driver
    }

    fn set_opacity(&mut self, value: f32) {
        let mut s = self.0.borrow_mut();
        s.opacity = value;
        s.opacity_log.push(value);
    }
}

#[derive(Default)]
pub struct ActionState {
    pub playing: bool,
    pub plays: u32,
    pub stops: u32,
}

pub struct MockAction {
    name: String,
    pub state: Rc<RefCell<ActionState>>,
}

impl MockAction {
    pub fn new(name: &str) -> (Self, Rc<RefCell<ActionState>>) {
        let state = Rc::new(RefCell::new(ActionState::default()));
        (
            Self {
                name: name.to_string(),
                state: state.clone(),
            },
            state,
        )
    }
}

impl ScriptedAction for MockAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(&mut self) {
        let mut s = self.state.borrow_mut();
        s.playing = true;
        s.plays += 1;
    }

    fn stop(&mut self) {
        let mut s = self.state.borrow_mut();
        s.playing = false;
        s.stops += 1;
    }
}

#[derive(Default)]
pub struct DeviceState {
    pub requests: u32,
}

pub struct MockDevice {
    pub supported: bool,
    pub fail_requests: bool,
    pub state: Rc<RefCell<DeviceState>>,
}

impl MockDevice {
    pub fn new(supported: bool, fail_requests: bool) -> (Self, Rc<RefCell<DeviceState>>) {
        let state = Rc::new(RefCell::new(DeviceState::default()));
        (
            Self {
                supported,
                fail_requests,
                state: state.clone(),
            },
            state,
        )
    }
}

impl SessionDevice for MockDevice {
    fn supported(&self) -> bool {
        self.supported
    }

    fn request_session(&mut self) -> Result<(), EngineError> {
        self.state.borrow_mut().requests += 1;
        if self.fail_requests {
            Err(EngineError::SessionUnavailable("denied by user".into()))
        } else {
            Ok(())
        }
    }
}

pub struct MockRig(pub Rc<RefCell<Vec3>>);

impl MockRig {
    pub fn new() -> (Self, Rc<RefCell<Vec3>>) {
        let offset = Rc::new(RefCell::new(Vec3::ZERO));
        (Self(offset.clone()), offset)
    }
}

impl ViewerRig for MockRig {
    fn set_offset(&mut self, offset: Vec3) {
        *self.0.borrow_mut() = offset;
    }
}

/// A transport engine over two phase-locked mocks and one ambience loop.
pub struct Harness {
    pub store: AppStore,
    pub engine: Rc<RefCell<TransportEngine>>,
    pub track_a: Rc<RefCell<TrackState>>,
    pub track_b: Rc<RefCell<TrackState>>,
    pub ambience: Rc<RefCell<TrackState>>,
    pub evaluated: Rc<RefCell<Vec<f64>>>,
    pub overlay: Rc<RefCell<OverlayState>>,
}

impl Harness {
    pub fn new(duration: f64) -> Self {
        Self::with_config(duration, TransportConfig::default())
    }

    pub fn with_config(duration: f64, config: TransportConfig) -> Self {
        init_tracing();
        let (a, track_a) = MockTrack::new();
        let (b, track_b) = MockTrack::new();
        let (amb, ambience) = MockTrack::new();
        let (evaluator, evaluated) = MockEvaluator::new();
        let (overlay_impl, overlay) = MockOverlay::new();
        let store = AppStore::new();
        let timeline = ClipTimeline::new(duration).expect("valid duration");
        let bus = AudioBus::new(vec![Box::new(a), Box::new(b)], vec![Box::new(amb)]);
        let engine = TransportEngine::new(
            config,
            timeline,
            bus,
            Box::new(evaluator),
            Box::new(overlay_impl),
            store.clone(),
        );
        Self {
            store,
            engine,
            track_a,
            track_b,
            ambience,
            evaluated,
            overlay,
        }
    }

    pub fn play(&self) {
        self.store.request_play();
        self.store.dispatch();
    }

    /// Runs `n` frames of `dt` seconds, pumping notifications like the
    /// render loop does.
    pub fn frames(&self, n: usize, dt: f64) {
        for _ in 0..n {
            self.engine.borrow_mut().update(dt);
            self.store.dispatch();
        }
    }

    pub fn time(&self) -> f64 {
        self.engine.borrow().current_time()
    }

    pub fn seeking(&self) -> bool {
        self.engine.borrow().is_seeking()
    }
}
