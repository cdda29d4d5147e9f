//! # Audio Capability Interfaces
//!
//! The scene collaborator owns the audio buffers and playback nodes; the
//! transport engine only drives them. This module defines the narrow
//! capability the engine needs (`AudioTransport`) and the `AudioBus`, which
//! groups the handles the way the transport treats them:
//!
//! - **Phase-locked tracks** (soundtrack, positional narrative cues): their
//!   playback offset must track the virtual clock. Always restarted as a
//!   group so inter-track phase survives a resync.
//! - **Ambience loops**: play continuously while the film runs, never seeked.

use tracing::debug;

/// Transport primitives of one audio source.
///
/// Implemented by an adapter over whatever the scene collaborator provides.
pub trait AudioTransport {
    fn play(&mut self);
    /// Halts playback keeping the current offset for resume.
    fn pause(&mut self);
    /// Halts playback and discards the playhead.
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn set_volume(&mut self, gain: f32);
    fn volume(&self) -> f32;
    /// Sets the buffer offset, in seconds, used by the next `play`.
    fn set_offset(&mut self, seconds: f64);
    /// Estimated current playback position against the source's own clock,
    /// or `None` if the source cannot say.
    fn position(&self) -> Option<f64>;
}

/// Which group of the bus an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackGroup {
    PhaseLocked,
    Ambience,
}

/// All audio handles of the loaded scene, grouped by sync policy.
#[derive(Default)]
pub struct AudioBus {
    phase_locked: Vec<Box<dyn AudioTransport>>,
    ambience: Vec<Box<dyn AudioTransport>>,
}

impl AudioBus {
    pub fn new(
        phase_locked: Vec<Box<dyn AudioTransport>>,
        ambience: Vec<Box<dyn AudioTransport>>,
    ) -> Self {
        Self {
            phase_locked,
            ambience,
        }
    }

    pub fn phase_locked(&self) -> &[Box<dyn AudioTransport>] {
        &self.phase_locked
    }

    /// Sets the volume of every phase-locked track.
    pub fn set_group_volume(&mut self, group: TrackGroup, gain: f32) {
        for track in self.group_mut(group) {
            track.set_volume(gain);
        }
    }

    /// Stops every playing track of the group.
    pub fn stop_group(&mut self, group: TrackGroup) {
        for track in self.group_mut(group) {
            if track.is_playing() {
                track.stop();
            }
        }
    }

    /// Pauses every playing phase-locked track, preserving offsets.
    pub fn pause_phase_locked(&mut self) {
        for track in &mut self.phase_locked {
            if track.is_playing() {
                track.pause();
            }
        }
    }

    /// Resumes every halted phase-locked track at its preserved offset.
    pub fn resume_phase_locked(&mut self) {
        for track in &mut self.phase_locked {
            if !track.is_playing() {
                track.play();
            }
        }
    }

    /// Restarts the whole phase-locked group at `offset`, silenced; the
    /// caller ramps volume back up. Always the whole group, never a single
    /// track, so relative timing is preserved.
    pub fn restart_phase_locked_at(&mut self, offset: f64) {
        debug!(offset, "restarting phase-locked group");
        for track in &mut self.phase_locked {
            if track.is_playing() {
                track.stop();
            }
            track.set_offset(offset);
            track.play();
            track.set_volume(0.0);
        }
    }

    /// Starts the ambience loops that are not already running.
    pub fn start_ambience(&mut self) {
        for track in &mut self.ambience {
            if !track.is_playing() {
                track.play();
            }
        }
    }

    /// True if any phase-locked track is currently playing.
    pub fn any_phase_locked_playing(&self) -> bool {
        self.phase_locked.iter().any(|t| t.is_playing())
    }

    /// Volume of the first playing phase-locked track, used as the group's
    /// current level when starting a fade-out.
    pub fn current_phase_locked_volume(&self) -> Option<f32> {
        self.phase_locked
            .iter()
            .find(|t| t.is_playing())
            .map(|t| t.volume())
    }

    fn group_mut(&mut self, group: TrackGroup) -> &mut Vec<Box<dyn AudioTransport>> {
        match group {
            TrackGroup::PhaseLocked => &mut self.phase_locked,
            TrackGroup::Ambience => &mut self.ambience,
        }
    }
}
