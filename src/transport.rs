//! # Transport Engine
//!
//! The core of the experience: owns the virtual clock over the fixed-length
//! clip, turns scroll impulses into smoothed clock motion, poses the external
//! animation evaluator at the clock value, and keeps the phase-locked audio
//! group within tolerance of the playhead.
//!
//! ## Responsibilities
//! - **Virtual clock**: advance in real time while playing, exponentially
//!   close on a seek target, clamp to `[0, duration]`.
//! - **Seek**: impulse → time delta, fade the audio out in discrete steps,
//!   debounce the restart so a burst of impulses restarts audio once.
//! - **Drift correction**: throttled comparison of each phase-locked track's
//!   estimated position against the clock; any offender triggers a whole
//!   group restart to preserve inter-track phase.
//! - **End detection**: flip the shared state to `Ended` on the frame the
//!   clock reaches the clip duration.
//!
//! All deferral goes through the owned [`TaskQueue`]; a superseding seek
//! cancels the stale restart and any in-flight fade by key, so no stale
//! callback can act on the audio group.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::animation::PoseEvaluator;
use crate::audio::{AudioBus, TrackGroup};
use crate::config::TransportConfig;
use crate::errors::EngineError;
use crate::sched::TaskQueue;
use crate::store::{AppStore, PlaybackState, StateChange, StateField, Subscription};

/// Immutable per-load facts about the film clip.
#[derive(Clone, Copy, Debug)]
pub struct ClipTimeline {
    duration: f64,
}

impl ClipTimeline {
    /// Rejects a malformed duration: the engine must never drive audio
    /// against a zero-length or unbounded target.
    pub fn new(duration: f64) -> Result<Self, EngineError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(EngineError::InvalidDuration(duration));
        }
        Ok(Self { duration })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

/// The authoritative playhead.
#[derive(Clone, Copy, Debug, Default)]
pub struct VirtualClock {
    /// Smoothed, render-visible position.
    pub current: f64,
    /// Most recently requested position.
    pub target: f64,
    /// True while the clock is closing on `target` instead of advancing in
    /// real time.
    pub seeking: bool,
}

/// The visual value the transport drives each frame: a scene-graph scalar
/// read and an opacity write. The opacity is forced to zero while a
/// seek-triggered audio re-fade is in flight, hiding the restart glitch.
pub trait SceneOverlay {
    fn driver_value(&self) -> f32;
    fn set_opacity(&mut self, value: f32);
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum TaskKey {
    Fade,
    Restart,
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum FadePurpose {
    /// Seek fade-out: the final step stops the group.
    SeekOut,
    /// Restart fade-in: the final step ends the re-fade window.
    RampIn,
}

#[derive(Clone, Copy, Debug)]
enum Task {
    FadeStep {
        step: u32,
        steps: u32,
        from: f32,
        to: f32,
        purpose: FadePurpose,
    },
    Restart,
}

/// Owns the virtual clock and drives animation and audio at it.
pub struct TransportEngine {
    config: TransportConfig,
    timeline: ClipTimeline,
    clock: VirtualClock,
    store: AppStore,
    audio: AudioBus,
    evaluator: Box<dyn PoseEvaluator>,
    overlay: Box<dyn SceneOverlay>,
    tasks: TaskQueue<TaskKey, Task>,
    /// Accumulated update time; the deadline clock for scheduled tasks.
    wall: f64,
    last_drift_check: f64,
    /// True from the start of a seek fade-out until the fade-in completes.
    refading: bool,
    /// Set when a pause interrupts the fade/restart pipeline; the next
    /// resume restarts the group at the playhead instead of resuming it.
    restart_on_resume: bool,
    subscriptions: Vec<Subscription>,
}

impl TransportEngine {
    /// Builds the engine and subscribes it to playback transitions.
    pub fn new(
        config: TransportConfig,
        timeline: ClipTimeline,
        audio: AudioBus,
        evaluator: Box<dyn PoseEvaluator>,
        overlay: Box<dyn SceneOverlay>,
        store: AppStore,
    ) -> Rc<RefCell<Self>> {
        let engine = Rc::new(RefCell::new(Self {
            config,
            timeline,
            clock: VirtualClock::default(),
            store: store.clone(),
            audio,
            evaluator,
            overlay,
            tasks: TaskQueue::new(),
            wall: 0.0,
            last_drift_check: 0.0,
            refading: false,
            restart_on_resume: false,
            subscriptions: Vec::new(),
        }));

        let weak = Rc::downgrade(&engine);
        let sub = store.subscribe(StateField::Playback, move |_, change| {
            if let Some(engine) = weak.upgrade() {
                engine.borrow_mut().on_playback(change);
            }
        });
        engine.borrow_mut().subscriptions.push(sub);
        engine
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current
    }

    pub fn target_time(&self) -> f64 {
        self.clock.target
    }

    pub fn is_seeking(&self) -> bool {
        self.clock.seeking
    }

    /// Number of scheduled fade/restart tasks awaiting their deadline.
    pub fn pending_task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn timeline(&self) -> ClipTimeline {
        self.timeline
    }

    /// Moves the playhead by a scroll impulse.
    ///
    /// The impulse is converted through the configured gain, the target is
    /// clamped to the clip, the playing audio is faded out and a debounced
    /// restart is (re)scheduled — a later seek before the debounce fires
    /// replaces the earlier restart. Seeking while paused resumes playback.
    pub fn seek(&mut self, impulse: f64) {
        if impulse == 0.0 {
            return;
        }
        let playback = self.store.playback();
        if matches!(playback, PlaybackState::Stopped | PlaybackState::Ended) {
            return;
        }

        let delta = impulse * self.config.scroll_gain;
        self.clock.target = (self.clock.current + delta).clamp(0.0, self.timeline.duration());
        self.clock.seeking = true;
        debug!(
            impulse,
            target = self.clock.target,
            "seek requested"
        );

        self.fade_out_for_seek();

        self.tasks.cancel(TaskKey::Restart);
        self.tasks.schedule(
            TaskKey::Restart,
            self.wall + self.config.restart_debounce,
            Task::Restart,
        );

        if playback == PlaybackState::Paused {
            self.store.resume();
        }
    }

    /// Per-frame update with the wall-clock delta since the previous frame.
    ///
    /// Order within a frame is fixed: impulse consumption, clock motion,
    /// clamp and end detection, pose evaluation, due scheduled tasks, the
    /// throttled drift check, then the overlay write. Later steps always see
    /// the frame's final clock value.
    pub fn update(&mut self, dt: f64) {
        let playback = self.store.playback();
        if playback == PlaybackState::Stopped {
            return;
        }
        self.wall += dt;

        if let Some(impulse) = self.store.take_scroll_impulse() {
            if playback != PlaybackState::Ended {
                self.seek(impulse);
            }
        }
        let playback = self.store.playback();

        if self.clock.seeking {
            let residual = self.clock.target - self.clock.current;
            if residual.abs() < self.config.settle_epsilon {
                // Snap exactly, otherwise the residual never reaches zero.
                self.clock.current = self.clock.target;
                self.clock.seeking = false;
            } else {
                let alpha = 1.0 - (-self.config.seek_smoothing * dt).exp();
                self.clock.current += residual * alpha;
            }
        } else if playback == PlaybackState::Playing {
            self.clock.current += dt;
        }

        let duration = self.timeline.duration();
        self.clock.current = self.clock.current.clamp(0.0, duration);
        if !self.clock.seeking {
            // A subsequent seek computes its delta from the true playhead.
            self.clock.target = self.clock.current;
        }

        if self.clock.current >= duration && playback == PlaybackState::Playing {
            self.store.mark_ended();
        }

        self.evaluator.set_time(self.clock.current);

        while let Some(task) = self.tasks.pop_due(self.wall) {
            self.run_task(task);
        }

        self.check_drift();

        let opacity = if self.refading {
            0.0
        } else {
            self.overlay.driver_value()
        };
        self.overlay.set_opacity(opacity);
    }

    /// Zeroes the clock, cancels all pending work and silences the
    /// phase-locked group. Idempotent.
    pub fn reset(&mut self) {
        self.clock = VirtualClock::default();
        self.refading = false;
        self.restart_on_resume = false;
        self.tasks.clear();
        self.last_drift_check = self.wall;
        self.audio.stop_group(TrackGroup::PhaseLocked);
        self.evaluator.set_time(0.0);
    }

    fn on_playback(&mut self, change: &StateChange) {
        use PlaybackState::*;
        match (change.prev.playback, change.next.playback) {
            (Stopped, Playing) => {
                self.reset();
                self.begin_playback();
            }
            (_, Stopped) => {
                self.reset();
                self.audio.stop_group(TrackGroup::Ambience);
            }
            (Playing, Paused) => self.pause_audio(),
            (Paused, Playing) => self.resume_audio(),
            // Ended leaves audio running; an explicit stop silences it.
            _ => {}
        }
    }

    /// A pause interrupting the fade/restart pipeline cannot simply freeze
    /// it: a half-finished fade must not keep draining against halted
    /// tracks. The pipeline is cancelled and the resume owes the group a
    /// fresh restart at the playhead.
    fn pause_audio(&mut self) {
        if self.refading
            || self.tasks.has_pending(TaskKey::Fade)
            || self.tasks.has_pending(TaskKey::Restart)
        {
            self.tasks.cancel(TaskKey::Fade);
            self.tasks.cancel(TaskKey::Restart);
            self.restart_on_resume = true;
        }
        self.audio.pause_phase_locked();
    }

    fn resume_audio(&mut self) {
        if self.clock.seeking || self.tasks.has_pending(TaskKey::Restart) {
            // A seek initiated this resume; its debounced restart owns the
            // audio start.
            self.restart_on_resume = false;
            return;
        }
        if self.restart_on_resume {
            self.restart_on_resume = false;
            self.start_phase_locked(self.clock.current);
            return;
        }
        self.audio.resume_phase_locked();
    }

    /// Entry into `Playing` from the top: phase-locked tracks start at offset
    /// zero and ramp from silence to nominal volume, ambience loops start.
    fn begin_playback(&mut self) {
        self.audio.restart_phase_locked_at(0.0);
        self.fade(0.0, self.config.nominal_volume, FadePurpose::RampIn);
        self.audio.start_ambience();
    }

    fn fade_out_for_seek(&mut self) {
        if !self.audio.any_phase_locked_playing() {
            return;
        }
        let from = self
            .audio
            .current_phase_locked_volume()
            .unwrap_or(self.config.nominal_volume);
        self.refading = true;
        self.fade(from, 0.0, FadePurpose::SeekOut);
    }

    /// Discretizes a volume ramp into `fade_steps` scheduled steps across
    /// `fade_duration`. A new fade cancels any in-flight one: at most one
    /// fade per group.
    fn fade(&mut self, from: f32, to: f32, purpose: FadePurpose) {
        self.tasks.cancel(TaskKey::Fade);
        let steps = self.config.fade_steps.max(1);
        let step_duration = self.config.fade_duration / steps as f64;
        for step in 1..=steps {
            self.tasks.schedule(
                TaskKey::Fade,
                self.wall + step_duration * step as f64,
                Task::FadeStep {
                    step,
                    steps,
                    from,
                    to,
                    purpose,
                },
            );
        }
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::FadeStep {
                step,
                steps,
                from,
                to,
                purpose,
            } => {
                let progress = step as f32 / steps as f32;
                let volume = from + (to - from) * self.config.fade_curve.eval(progress);
                self.audio.set_group_volume(TrackGroup::PhaseLocked, volume);
                if step == steps {
                    match purpose {
                        FadePurpose::SeekOut => {
                            self.audio.stop_group(TrackGroup::PhaseLocked);
                        }
                        FadePurpose::RampIn => {
                            self.refading = false;
                        }
                    }
                }
            }
            Task::Restart => {
                if self.store.playback() == PlaybackState::Paused {
                    // Superseded by a pause; the resume owes the group a
                    // restart at the playhead.
                    self.restart_on_resume = true;
                    return;
                }
                if self.clock.seeking
                    || (self.refading && self.tasks.has_pending(TaskKey::Fade))
                {
                    // Target not settled or the fade-out is still draining;
                    // try again rather than leave the film silent.
                    self.tasks.schedule(
                        TaskKey::Restart,
                        self.wall + self.config.restart_debounce,
                        Task::Restart,
                    );
                    return;
                }
                self.start_phase_locked(self.clock.current);
            }
        }
    }

    /// Restarts the whole phase-locked group at `offset`, silenced, then
    /// ramps back to nominal volume.
    fn start_phase_locked(&mut self, offset: f64) {
        self.audio.restart_phase_locked_at(offset);
        self.fade(0.0, self.config.nominal_volume, FadePurpose::RampIn);
    }

    /// Throttled resynchronization backstop.
    ///
    /// Drift is self-healing, not an error: if any playing phase-locked
    /// track's estimated position deviates from the clock beyond the
    /// threshold, the whole group is restarted at the clock — never a single
    /// track, so relative phase between tracks survives.
    fn check_drift(&mut self) {
        // Quiet only while a seek or a fade/restart is actually in flight;
        // a flag alone must never disable the backstop.
        if self.clock.seeking
            || self.tasks.has_pending(TaskKey::Fade)
            || self.tasks.has_pending(TaskKey::Restart)
        {
            return;
        }
        if self.store.playback() != PlaybackState::Playing {
            return;
        }
        if self.wall - self.last_drift_check < self.config.drift_check_interval {
            return;
        }
        self.last_drift_check = self.wall;

        let clock = self.clock.current;
        let threshold = self.config.drift_threshold;
        let desynced = self.audio.phase_locked().iter().any(|track| {
            track.is_playing()
                && track
                    .position()
                    .is_some_and(|pos| (pos - clock).abs() > threshold)
        });

        if desynced {
            debug!(clock, "audio drift beyond threshold; resyncing group");
            self.start_phase_locked(clock);
        }
    }
}

impl Drop for TransportEngine {
    fn drop(&mut self) {
        // Timers and listeners go first so nothing fires against a
        // half-destroyed engine; the audio handles are released after.
        self.tasks.clear();
        self.subscriptions.clear();
        self.audio.stop_group(TrackGroup::PhaseLocked);
        self.audio.stop_group(TrackGroup::Ambience);
    }
}
