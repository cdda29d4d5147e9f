//! Animation-side collaborator seams: easing curves, clip classification and
//! the narrow interfaces the engine drives on the external evaluator.

use keyframe::EasingFunction;
use serde::{Deserialize, Serialize};

/// Supported easing functions for volume ramps and glides.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl EasingFunction for EasingType {
    fn y(&self, x: f64) -> f64 {
        match self {
            EasingType::Linear => keyframe::functions::Linear.y(x),
            EasingType::EaseIn => keyframe::functions::EaseIn.y(x),
            EasingType::EaseOut => keyframe::functions::EaseOut.y(x),
            EasingType::EaseInOut => keyframe::functions::EaseInOut.y(x),
        }
    }
}

impl EasingType {
    /// Evaluates the easing curve at a specific point `x` (0.0 to 1.0).
    pub fn eval(&self, x: f32) -> f32 {
        self.y(x as f64) as f32
    }
}

/// How a clip repeats once its local time passes its duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopMode {
    /// Plays once and clamps on its final pose.
    Once,
    Repeat,
    PingPong,
}

impl LoopMode {
    /// Classifies a clip by its authored name. `Loop` and `PingPong` win over
    /// the default; everything else is a clamped one-shot.
    pub fn from_name(name: &str) -> LoopMode {
        if name.contains("Loop") {
            LoopMode::Repeat
        } else if name.contains("PingPong") {
            LoopMode::PingPong
        } else {
            LoopMode::Once
        }
    }

    /// One-shot clips hold their last pose when finished.
    pub fn clamp_when_finished(self) -> bool {
        matches!(self, LoopMode::Once)
    }
}

/// Per-load facts about one authored clip.
#[derive(Clone, Debug)]
pub struct ClipInfo {
    pub name: String,
    pub duration: f64,
}

impl ClipInfo {
    pub fn new(name: impl Into<String>, duration: f64) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }

    /// Whether this clip is gated on the transport clock rather than
    /// free-running.
    pub fn is_clock_gated(&self) -> bool {
        self.name.contains("Once")
    }

    pub fn loop_mode(&self) -> LoopMode {
        LoopMode::from_name(&self.name)
    }
}

/// Name of the clip whose duration defines the film, when present.
pub const PRIMARY_CLIP_NAME: &str = "CameraRigAction_Once";

/// Selects the clip that defines the film's duration: the camera rig's
/// one-shot if authored, otherwise the first clock-gated clip.
pub fn primary_once_clip(clips: &[ClipInfo]) -> Option<&ClipInfo> {
    clips
        .iter()
        .find(|c| c.name == PRIMARY_CLIP_NAME)
        .or_else(|| clips.iter().find(|c| c.is_clock_gated()))
}

/// The external animation evaluator: a single "set time" entry point that
/// poses the whole scripted scene at an absolute clip time.
pub trait PoseEvaluator {
    fn set_time(&mut self, seconds: f64);
}

/// A startable scripted action owned by the animation collaborator
/// (e.g. the camera rig's one-shot flythrough).
pub trait ScriptedAction {
    fn name(&self) -> &str;
    fn play(&mut self);
    fn stop(&mut self);
}
