//! # Film Engine
//!
//! `film-engine` is the timeline transport and synchronization core of a
//! scroll-driven interactive film: a pre-authored animation/audio clip the
//! viewer scrubs with scroll gestures or lets auto-advance.
//!
//! The engine owns a virtual clock over the fixed-duration clip, maps
//! discrete scroll impulses into smoothed clock motion, poses an external
//! animation evaluator at the clock value, and keeps the phase-locked audio
//! tracks within tolerance of the playhead — detecting drift, re-seeking,
//! and cross-fading instead of hard-cutting.
//!
//! ## Core Features
//!
//! *   **Transport state machine**: `Stopped / Playing / Paused / Ended`
//!     with enforced transitions, held in a reactive shared store.
//! *   **Scroll seeking**: throttled, magnitude-filtered impulses resolved
//!     through critically damped interpolation, never an instant jump.
//! *   **Audio phase lock**: stepped fades, debounced group restarts and a
//!     throttled drift backstop keep every synced track on the clock.
//! *   **Free-look camera**: drag-to-look with auto-recenter, tap to pause.
//! *   **Immersive sessions**: head-mounted takeover with graceful fallback
//!     to the on-screen transport.
//!
//! Rendering, asset loading and the session device itself are external
//! collaborators reached through narrow traits ([`AudioTransport`],
//! [`PoseEvaluator`], [`SceneOverlay`], [`SessionDevice`], [`ViewerRig`]).
//!
//! ## Usage
//!
//! The entry point is [`FilmRuntime`], which wires the components and is
//! driven with one [`FilmRuntime::frame`] call per rendered frame.
//!
//! [`AudioTransport`]: audio::AudioTransport
//! [`PoseEvaluator`]: animation::PoseEvaluator
//! [`SceneOverlay`]: transport::SceneOverlay
//! [`SessionDevice`]: session::SessionDevice
//! [`ViewerRig`]: session::ViewerRig

/// The reactive shared state and its field-level subscriptions.
pub mod store;

/// Raw wheel input → throttled discrete impulses.
pub mod scroll;

/// The transport engine: virtual clock, seek, audio sync, end detection.
pub mod transport;

/// Easing curves, clip classification and animation collaborator traits.
pub mod animation;

/// Audio capability traits and the grouped track bus.
pub mod audio;

/// Cancellable keyed task scheduling.
pub mod sched;

/// Drag-to-look camera override.
pub mod camera;

/// Immersive (head-mounted) session lifecycle.
pub mod session;

/// Tuned constants as overridable configuration.
pub mod config;

pub mod errors;

/// Wiring and the per-frame driver contract.
pub mod runtime;

pub use config::EngineConfig;
pub use errors::EngineError;
pub use runtime::FilmRuntime;
pub use store::{AppStore, PlaybackState};
pub use transport::{ClipTimeline, TransportEngine};
