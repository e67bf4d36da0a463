//! The feedback contract - uniform, fire-and-forget notification fan-out.
//!
//! Every front-end broadcasts the same `Feedback` type through one
//! `FeedbackHub`, which fans out to whatever visual/audio/haptic sinks the
//! host registered. Sinks must not block; a sink that cares about only a
//! few kinds simply ignores the rest.

use crate::activation::{CommandAction, InputSource, SwitchActionKind};
use crate::types::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One feedback event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Feedback {
    // =========================================================================
    // GAZE
    // =========================================================================
    /// Dwell progress changed; `progress` in [0, 1).
    DwellProgress { pos: Vec2, progress: f32 },

    /// Dwell completed and an activation was requested at the point.
    DwellActivated { pos: Vec2 },

    /// A debounced blink was accepted.
    BlinkDetected,

    /// Second accepted blink in sequence.
    DoubleBlink,

    CalibrationStarted,
    CalibrationCompleted { accuracy: f64 },

    // =========================================================================
    // HEAD
    // =========================================================================
    /// A gesture pattern matched.
    GestureRecognized { name: String },

    HeadClick { pos: Vec2 },
    HeadCancel,
    HeadNavigation { direction: NavDirection },

    // =========================================================================
    // SWITCH / SCANNING
    // =========================================================================
    SwitchActivated { action: SwitchActionKind },
    ScanningStarted,
    ScanningStopped,
    /// Scan cursor moved; highlight should be repositioned to `rect`.
    ScanHighlight { rect: Rect },
    GroupChanged,
    ContextMenuRequested,
    AlternateMenuRequested,
    NavigationPopRequested,

    // =========================================================================
    // VOICE
    // =========================================================================
    ListeningStarted,
    ListeningStopped,
    LowConfidence { confidence: f64 },
    UnknownCommand { transcript: String },
    CommandExecuted { action: CommandAction },
    CommandFailed { action: CommandAction },
    NoHandler { action: CommandAction },
    NoSpeech,
    MicrophoneError,
    PermissionDenied,
    NetworkError,
    RecognitionError,

    // =========================================================================
    // DISPATCH
    // =========================================================================
    /// An element activation committed.
    ElementActivated { source: InputSource },

    /// The activation's target was gone or not activatable at commit time.
    ActivationMissed { source: InputSource },

    /// The surface or a handler rejected the activation.
    ActivationFailed { source: InputSource },

    /// A second modality dispatched in the same tick and lost arbitration.
    SuppressedConflict { source: InputSource },
}

/// Directional navigation payload for head-tilt feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavDirection {
    Left,
    Right,
    Up,
    Down,
}

impl Feedback {
    /// Stable string name, used for logging and haptic pattern lookup.
    pub fn kind(&self) -> &'static str {
        match self {
            Feedback::DwellProgress { .. } => "dwell_progress",
            Feedback::DwellActivated { .. } => "dwell_activated",
            Feedback::BlinkDetected => "blink_detected",
            Feedback::DoubleBlink => "double_blink",
            Feedback::CalibrationStarted => "calibration_started",
            Feedback::CalibrationCompleted { .. } => "calibration_completed",
            Feedback::GestureRecognized { .. } => "gesture_recognized",
            Feedback::HeadClick { .. } => "head_click",
            Feedback::HeadCancel => "head_cancel",
            Feedback::HeadNavigation { .. } => "head_navigation",
            Feedback::SwitchActivated { .. } => "switch_activated",
            Feedback::ScanningStarted => "scanning_started",
            Feedback::ScanningStopped => "scanning_stopped",
            Feedback::ScanHighlight { .. } => "scan_highlight",
            Feedback::GroupChanged => "group_changed",
            Feedback::ContextMenuRequested => "context_menu_requested",
            Feedback::AlternateMenuRequested => "alternate_menu_requested",
            Feedback::NavigationPopRequested => "navigation_pop_requested",
            Feedback::ListeningStarted => "listening_started",
            Feedback::ListeningStopped => "listening_stopped",
            Feedback::LowConfidence { .. } => "low_confidence",
            Feedback::UnknownCommand { .. } => "unknown_command",
            Feedback::CommandExecuted { .. } => "command_executed",
            Feedback::CommandFailed { .. } => "command_failed",
            Feedback::NoHandler { .. } => "no_handler",
            Feedback::NoSpeech => "no_speech",
            Feedback::MicrophoneError => "microphone_error",
            Feedback::PermissionDenied => "permission_denied",
            Feedback::NetworkError => "network_error",
            Feedback::RecognitionError => "recognition_error",
            Feedback::ElementActivated { .. } => "element_activated",
            Feedback::ActivationMissed { .. } => "activation_missed",
            Feedback::ActivationFailed { .. } => "activation_failed",
            Feedback::SuppressedConflict { .. } => "suppressed_conflict",
        }
    }

    /// Vibration pattern (on/off milliseconds) for haptic-capable hosts.
    ///
    /// Only events that benefit from tactile confirmation have one.
    pub fn haptic_pattern(&self) -> Option<&'static [u32]> {
        match self {
            Feedback::SwitchActivated { .. } => Some(&[100]),
            Feedback::ScanningStarted => Some(&[50, 50, 50]),
            Feedback::ScanningStopped => Some(&[100, 50, 100]),
            Feedback::ElementActivated { .. } => Some(&[200]),
            Feedback::ScanHighlight { .. } => Some(&[25]),
            Feedback::GroupChanged => Some(&[50, 25, 50]),
            _ => None,
        }
    }
}

/// A feedback consumer (visual overlay, audio cue player, haptic driver).
pub trait FeedbackSink {
    fn notify(&mut self, feedback: &Feedback);
}

/// Text-to-speech output for spoken confirmations and apologies.
pub trait SpeechSink {
    fn speak(&mut self, text: &str);
}

/// Fans feedback out to all registered sinks, fire-and-forget.
#[derive(Default)]
pub struct FeedbackHub {
    sinks: SmallVec<[Box<dyn FeedbackSink>; 3]>,
    speech: Option<Box<dyn SpeechSink>>,
}

impl FeedbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn FeedbackSink>) {
        self.sinks.push(sink);
    }

    pub fn set_speech(&mut self, sink: Box<dyn SpeechSink>) {
        self.speech = Some(sink);
    }

    /// Broadcast to every sink. Never fails, never blocks the caller.
    pub fn broadcast(&mut self, feedback: &Feedback) {
        tracing::debug!(kind = feedback.kind(), "feedback");
        for sink in &mut self.sinks {
            sink.notify(feedback);
        }
    }

    /// Speak text if a speech sink is registered; silently dropped
    /// otherwise.
    pub fn speak(&mut self, text: &str) {
        if let Some(speech) = &mut self.speech {
            speech.speak(text);
        }
    }
}

impl std::fmt::Debug for FeedbackHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackHub")
            .field("sinks", &self.sinks.len())
            .field("speech", &self.speech.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl FeedbackSink for Recorder {
        fn notify(&mut self, feedback: &Feedback) {
            self.0.borrow_mut().push(feedback.kind().to_string());
        }
    }

    #[test]
    fn broadcast_reaches_all_sinks() {
        let seen_a = Rc::new(RefCell::new(Vec::new()));
        let seen_b = Rc::new(RefCell::new(Vec::new()));

        let mut hub = FeedbackHub::new();
        hub.add_sink(Box::new(Recorder(seen_a.clone())));
        hub.add_sink(Box::new(Recorder(seen_b.clone())));

        hub.broadcast(&Feedback::ScanningStarted);

        assert_eq!(*seen_a.borrow(), vec!["scanning_started"]);
        assert_eq!(*seen_b.borrow(), vec!["scanning_started"]);
    }

    #[test]
    fn speak_without_sink_is_noop() {
        let mut hub = FeedbackHub::new();
        hub.speak("hello"); // must not panic
    }

    #[test]
    fn haptic_patterns_cover_switch_events() {
        assert_eq!(
            Feedback::SwitchActivated {
                action: SwitchActionKind::Primary
            }
            .haptic_pattern(),
            Some(&[100u32][..])
        );
        assert_eq!(Feedback::BlinkDetected.haptic_pattern(), None);
    }
}
