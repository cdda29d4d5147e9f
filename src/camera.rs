//! # Free-Look Camera Controller
//!
//! Drag-to-look override on top of the scripted camera rig. Pointer
//! ownership follows the film: handlers attach when the film starts (along
//! with the clock-gated "Once" actions) and detach when it stops. While a
//! drag is held the yaw/pitch follow the pointer; on release the view glides
//! back to center. A press that never travels past the drag threshold is a
//! tap: it toggles pause during the film, and requests a return to idle once
//! the film has ended.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{EulerRot, Quat};

use crate::animation::ScriptedAction;
use crate::config::CameraConfig;
use crate::store::{AppStore, PlaybackState, StateChange, StateField, Subscription};

pub struct FreeLookCamera {
    config: CameraConfig,
    store: AppStore,
    yaw: f32,
    pitch: f32,
    pointer_down: bool,
    prev_x: f32,
    prev_y: f32,
    returning: bool,
    /// Set when travel exceeds the drag threshold; poisons the pending tap.
    moved: bool,
    /// Set when the pointer left the surface mid-press; also poisons the tap.
    left_surface: bool,
    attached: bool,
    drag_enabled: bool,
    actions: Vec<Box<dyn ScriptedAction>>,
    subscriptions: Vec<Subscription>,
}

impl FreeLookCamera {
    /// Builds the controller and subscribes it to playback transitions.
    ///
    /// `actions` are the animation collaborator's scripted actions; the
    /// clock-gated ones (names containing `Once`) are started and stopped
    /// with the film.
    pub fn new(
        config: CameraConfig,
        actions: Vec<Box<dyn ScriptedAction>>,
        store: AppStore,
    ) -> Rc<RefCell<Self>> {
        let camera = Rc::new(RefCell::new(Self {
            config,
            store: store.clone(),
            yaw: 0.0,
            pitch: 0.0,
            pointer_down: false,
            prev_x: 0.0,
            prev_y: 0.0,
            returning: false,
            moved: false,
            left_surface: false,
            attached: false,
            drag_enabled: false,
            actions,
            subscriptions: Vec::new(),
        }));

        let weak = Rc::downgrade(&camera);
        let sub = store.subscribe(StateField::Playback, move |_, change| {
            if let Some(camera) = weak.upgrade() {
                camera.borrow_mut().on_playback(change);
            }
        });
        camera.borrow_mut().subscriptions.push(sub);
        camera
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Current look override, applied on top of the scripted rig.
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if !self.attached || !self.drag_enabled {
            return;
        }
        self.pointer_down = true;
        self.returning = false;
        self.moved = false;
        self.left_surface = false;
        self.prev_x = x;
        self.prev_y = y;
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if !self.pointer_down {
            return;
        }
        let dx = x - self.prev_x;
        let dy = y - self.prev_y;
        if dx.abs() > self.config.drag_threshold || dy.abs() > self.config.drag_threshold {
            self.moved = true;
        }
        self.prev_x = x;
        self.prev_y = y;

        self.yaw -= dx * self.config.sensitivity;
        self.pitch -= dy * self.config.sensitivity;
        self.pitch = self
            .pitch
            .clamp(-self.config.max_pitch, self.config.max_pitch);
    }

    pub fn pointer_up(&mut self) {
        if !self.pointer_down {
            return;
        }
        self.pointer_down = false;
        self.returning = true;
    }

    pub fn pointer_leave(&mut self) {
        if self.pointer_down {
            self.left_surface = true;
        }
        self.pointer_up();
    }

    /// A completed press. Drags and presses that wandered off the surface do
    /// not count as taps.
    pub fn click(&mut self) {
        if !self.attached {
            return;
        }
        if self.store.playback() == PlaybackState::Ended {
            self.store.request_stop();
            return;
        }
        if self.moved || self.left_surface {
            return;
        }
        match self.store.playback() {
            PlaybackState::Playing => {
                self.store.pause();
            }
            PlaybackState::Paused => {
                self.store.resume();
            }
            _ => {}
        }
    }

    /// Per-frame glide back to center after the pointer is released.
    pub fn update(&mut self, dt: f64) {
        if !self.returning {
            return;
        }
        let decay = (-self.config.recenter_rate * dt as f32).exp();
        self.yaw *= decay;
        self.pitch *= decay;
        if self.yaw.abs() < self.config.settle_epsilon
            && self.pitch.abs() < self.config.settle_epsilon
        {
            self.yaw = 0.0;
            self.pitch = 0.0;
            self.returning = false;
        }
    }

    fn on_playback(&mut self, change: &StateChange) {
        use PlaybackState::*;
        match (change.prev.playback, change.next.playback) {
            (Stopped, Playing) => {
                self.attached = true;
                self.drag_enabled = true;
                self.for_each_once_action(|a| a.play());
            }
            (_, Stopped) => {
                self.attached = false;
                self.drag_enabled = false;
                self.pointer_down = false;
                self.for_each_once_action(|a| a.stop());
            }
            (_, Ended) => {
                // Taps still land (to return to idle) but dragging stops.
                self.drag_enabled = false;
                self.pointer_down = false;
            }
            _ => {}
        }
    }

    fn for_each_once_action(&mut self, mut f: impl FnMut(&mut dyn ScriptedAction)) {
        for action in &mut self.actions {
            if action.name().contains("Once") {
                f(action.as_mut());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_camera() -> (Rc<RefCell<FreeLookCamera>>, AppStore) {
        let store = AppStore::new();
        let camera = FreeLookCamera::new(CameraConfig::default(), Vec::new(), store.clone());
        store.request_play();
        store.dispatch();
        (camera, store)
    }

    #[test]
    fn drag_adjusts_yaw_and_pitch() {
        let (camera, _store) = playing_camera();
        let mut cam = camera.borrow_mut();
        cam.pointer_down(100.0, 100.0);
        cam.pointer_move(150.0, 80.0);
        assert!(cam.yaw() < 0.0); // dragged right looks left
        assert!(cam.pitch() > 0.0);
        assert!((cam.yaw() - (-50.0 * 0.002)).abs() < 1e-6);
    }

    #[test]
    fn pitch_is_clamped_short_of_the_pole() {
        let (camera, _store) = playing_camera();
        let mut cam = camera.borrow_mut();
        cam.pointer_down(0.0, 0.0);
        cam.pointer_move(0.0, -100_000.0);
        let limit = CameraConfig::default().max_pitch;
        assert!(cam.pitch() <= limit + 1e-6);
    }

    #[test]
    fn recenters_after_release() {
        let (camera, _store) = playing_camera();
        let mut cam = camera.borrow_mut();
        cam.pointer_down(0.0, 0.0);
        cam.pointer_move(200.0, 120.0);
        cam.pointer_up();
        for _ in 0..2000 {
            cam.update(1.0 / 60.0);
        }
        assert_eq!(cam.yaw(), 0.0);
        assert_eq!(cam.pitch(), 0.0);
    }

    #[test]
    fn tap_toggles_pause_but_drag_does_not() {
        let (camera, store) = playing_camera();
        {
            let mut cam = camera.borrow_mut();
            cam.pointer_down(10.0, 10.0);
            cam.pointer_up();
            cam.click();
        }
        assert_eq!(store.playback(), PlaybackState::Paused);

        {
            let mut cam = camera.borrow_mut();
            cam.pointer_down(10.0, 10.0);
            cam.pointer_up();
            cam.click();
        }
        assert_eq!(store.playback(), PlaybackState::Playing);

        {
            let mut cam = camera.borrow_mut();
            cam.pointer_down(10.0, 10.0);
            cam.pointer_move(60.0, 10.0);
            cam.pointer_up();
            cam.click();
        }
        assert_eq!(store.playback(), PlaybackState::Playing);
    }

    #[test]
    fn tap_after_end_requests_stop() {
        let (camera, store) = playing_camera();
        store.mark_ended();
        store.dispatch();
        camera.borrow_mut().click();
        assert_eq!(store.playback(), PlaybackState::Stopped);
    }

    #[test]
    fn pointer_leave_poisons_the_tap() {
        let (camera, store) = playing_camera();
        let mut cam = camera.borrow_mut();
        cam.pointer_down(10.0, 10.0);
        cam.pointer_leave();
        cam.click();
        drop(cam);
        assert_eq!(store.playback(), PlaybackState::Playing);
    }

    #[test]
    fn input_ignored_while_idle() {
        let store = AppStore::new();
        let camera = FreeLookCamera::new(CameraConfig::default(), Vec::new(), store.clone());
        let mut cam = camera.borrow_mut();
        cam.pointer_down(0.0, 0.0);
        cam.pointer_move(100.0, 100.0);
        assert_eq!(cam.yaw(), 0.0);
        assert_eq!(cam.pitch(), 0.0);
    }
}
