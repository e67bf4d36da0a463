//! Alternative-input front-ends for AEGIS.
//!
//! Four front-ends turn continuous, noisy sensor streams into the
//! discrete activations players who cannot use a mouse/keyboard need:
//!
//! 1. **Gaze** - smoothed gaze samples, dwell detection, blink debounce,
//!    and target-grid calibration with accuracy scoring
//! 2. **Head** - face-landmark pose derivation, neutral calibration, and
//!    oscillation/tilt gesture matching with cooldown
//! 3. **Switch** - interactive-element grouping, a timer-driven scan
//!    cursor, and tap/hold discrimination for physical switches
//! 4. **Voice** - layered phrase tables with exact-then-fuzzy command
//!    resolution over finalized transcripts
//!
//! # Architecture
//!
//! ```text
//! gaze stream   ─► GazeDwellDetector ──┐     ┌► CalibrationEngine
//! landmarks     ─► HeadPoseTracker ────┤     │      (certifies gaze)
//!                    └► GestureRecognizer    │
//! switch edges  ─► ScanEngine ─────────┼─────┘
//! transcripts   ─► VoiceCommandResolver┤
//!                                      ▼
//!                InputHub ──► Activation ──► aegis_core::ActionDispatcher
//! ```
//!
//! Everything is driven by explicit `now_ms` timestamps and the host's
//! `tick`; tests run entire interactions on virtual time.

mod calibration;
mod config;
mod error;
mod gaze;
mod gesture;
mod head;
mod hub;
mod raw;
mod scan;
pub mod similarity;
pub mod smoothing;
mod voice;

pub use calibration::{CalibrationEngine, CalibrationOutcome, CalibrationPoint, CalibrationStats};
pub use config::{
    default_global_commands, CalibrationConfig, GazeConfig, HeadConfig, ScanConfig, ScanPattern,
    VoiceConfig,
};
pub use error::InputError;
pub use gaze::{GazeDwellDetector, GazeSample, GazeStats};
pub use gesture::{
    default_bindings, default_gestures, GestureAction, GestureEvent, GestureName, GesturePattern,
    GestureRecognizer, GestureSpec,
};
pub use head::{derive_pose, HeadPoseTracker, HeadStats};
pub use hub::{Capabilities, HubConfig, InputHub, ModalityStatus};
pub use raw::{Edge, HidDecoder, LandmarkFrame, RawSample, SwitchEdge, Utterance};
pub use scan::{ScanEngine, ScanStats};
pub use voice::{
    default_contextual_commands, RecognitionErrorKind, RecognizedUtterance, VoiceCommandResolver,
    VoiceContext, VoiceStats,
};

/// Gaze dwell duration before an activation fires (ms).
pub const DEFAULT_DWELL_TIME_MS: u64 = 800;

/// Per-axis gaze tolerance box half-width (px).
pub const DEFAULT_GAZE_TOLERANCE: f32 = 50.0;

/// Gaze smoothing factor (weight of the previous sample).
pub const DEFAULT_SMOOTHING_FACTOR: f32 = 0.3;

/// Minimum gap between accepted blinks (ms).
pub const DEFAULT_BLINK_THRESHOLD_MS: u64 = 200;

/// Rolling gaze history capacity.
pub const GAZE_HISTORY_LIMIT: usize = 100;

/// Qualifying samples required before a dwell can accumulate.
pub const DWELL_SAMPLE_THRESHOLD: usize = 10;

/// Head pose sensitivity gain.
pub const DEFAULT_SENSITIVITY: f32 = 1.0;

/// Head pose dead-zone.
pub const DEFAULT_DEAD_ZONE: f32 = 0.1;

/// Head pose smoothing factor.
pub const DEFAULT_POSE_SMOOTHING: f32 = 0.5;

/// Neutral-pose capture window (ms).
pub const DEFAULT_NEUTRAL_WINDOW_MS: u64 = 3000;

/// Rolling gesture buffer span (ms).
pub const GESTURE_BUFFER_MS: u64 = 2000;

/// Minimum samples in a gesture window.
pub const MIN_GESTURE_SAMPLES: usize = 5;

/// Minimum samples for oscillation detection.
pub const MIN_OSCILLATION_SAMPLES: usize = 10;

/// Peaks and valleys each required for an oscillation.
pub const OSCILLATION_MIN_PEAKS: usize = 2;

/// Per-name gesture cooldown (ms).
pub const GESTURE_COOLDOWN_MS: u64 = 1000;

/// Fired-gesture history capacity.
pub const GESTURE_HISTORY_LIMIT: usize = 20;

/// Scan cursor advance interval (ms).
pub const DEFAULT_SCAN_SPEED_MS: u64 = 2000;

/// Switch presses shorter than this are noise (ms).
pub const DEFAULT_ACTIVATION_TIME_MS: u64 = 100;

/// Switch presses still down at this boundary are holds (ms).
pub const DEFAULT_SWITCH_DWELL_MS: u64 = 1000;

/// Minimum recognizer confidence for an utterance to be considered.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Fuzzy phrase similarity must strictly exceed this.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Finalized-utterance history capacity.
pub const UTTERANCE_HISTORY_LIMIT: usize = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::assertions_on_constants)]
    fn constants_are_reasonable() {
        assert!(DEFAULT_ACTIVATION_TIME_MS < DEFAULT_SWITCH_DWELL_MS);
        assert!(DWELL_SAMPLE_THRESHOLD <= GAZE_HISTORY_LIMIT);
        assert!(MIN_GESTURE_SAMPLES <= MIN_OSCILLATION_SAMPLES);
        assert!(DEFAULT_SIMILARITY_THRESHOLD > 0.0 && DEFAULT_SIMILARITY_THRESHOLD < 1.0);
        assert!(GESTURE_COOLDOWN_MS <= GESTURE_BUFFER_MS);
    }
}
