//! # Engine Configuration
//!
//! All tuned constants of the transport, sampler and camera live here as
//! serde-deserializable structs so a deployment can override them from a
//! JSON document without recompiling. Every field has a default matching the
//! shipped experience.

use crate::animation::EasingType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tuning for the transport engine's clock, seek and audio-sync behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Seconds of timeline motion per unit of scroll impulse.
    pub scroll_gain: f64,
    /// Exponential rate (1/s) at which the clock closes on the seek target.
    pub seek_smoothing: f64,
    /// Residual (seconds) below which a seek snaps to its target.
    pub settle_epsilon: f64,
    /// Total duration of an audio fade, in seconds.
    pub fade_duration: f64,
    /// Number of discrete volume steps per fade.
    pub fade_steps: u32,
    /// Shape of the volume ramp across a fade.
    pub fade_curve: EasingType,
    /// Delay before restarting audio after the last seek, in seconds.
    pub restart_debounce: f64,
    /// Allowed divergence between a track and the clock, in seconds.
    pub drift_threshold: f64,
    /// Minimum interval between drift checks, in seconds.
    pub drift_check_interval: f64,
    /// Steady-state volume of the phase-locked tracks.
    pub nominal_volume: f32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            scroll_gain: 5.0 / 1000.0,
            seek_smoothing: 40.0,
            settle_epsilon: 0.001,
            fade_duration: 0.3,
            fade_steps: 10,
            fade_curve: EasingType::Linear,
            restart_debounce: 0.2,
            drift_threshold: 0.05,
            drift_check_interval: 1.0,
            nominal_volume: 1.0,
        }
    }
}

/// Tuning for the scroll intent sampler.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Minimum interval between emitted impulses, in seconds.
    pub throttle: f64,
    /// Wheel deltas below this magnitude are treated as jitter.
    pub min_magnitude: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            throttle: 0.016,
            min_magnitude: 10.0,
        }
    }
}

/// Tuning for the free-look camera controller.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Radians of rotation per pixel of drag.
    pub sensitivity: f32,
    /// Pitch clamp, short of the pole to avoid gimbal flip.
    pub max_pitch: f32,
    /// Exponential rate (1/s) of the return-to-center glide.
    pub recenter_rate: f32,
    /// Angle below which the recenter glide snaps to zero.
    pub settle_epsilon: f32,
    /// Pointer travel (pixels) beyond which a press counts as a drag.
    pub drag_threshold: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.002,
            max_pitch: std::f32::consts::FRAC_PI_2 - 0.1,
            recenter_rate: 1.2,
            settle_epsilon: 1e-4,
            drag_threshold: 2.0,
        }
    }
}

/// Umbrella configuration for the whole engine.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub transport: TransportConfig,
    pub sampler: SamplerConfig,
    pub camera: CameraConfig,
}

impl EngineConfig {
    /// Parses a configuration document. Missing fields keep their defaults,
    /// so a document may override a single constant.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse engine configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_tuning() {
        let cfg = TransportConfig::default();
        assert!((cfg.scroll_gain - 0.005).abs() < 1e-12);
        assert!((cfg.fade_duration - 0.3).abs() < 1e-12);
        assert_eq!(cfg.fade_steps, 10);
        assert!((cfg.drift_threshold - 0.05).abs() < 1e-12);
    }

    #[test]
    fn partial_json_overrides_single_field() {
        let cfg = EngineConfig::from_json_str(r#"{"transport": {"drift_threshold": 0.1}}"#)
            .expect("valid document");
        assert!((cfg.transport.drift_threshold - 0.1).abs() < 1e-12);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.transport.fade_steps, 10);
        assert!((cfg.sampler.throttle - 0.016).abs() < 1e-12);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EngineConfig::from_json_str("{not json").is_err());
    }
}
