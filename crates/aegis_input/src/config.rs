//! Per-modality configuration.
//!
//! Every front-end takes its config at construction and accepts runtime
//! updates through `set_config`. All structs serialize so the host can
//! persist them in player profiles.

use crate::{
    DEFAULT_ACTIVATION_TIME_MS, DEFAULT_BLINK_THRESHOLD_MS, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_DEAD_ZONE, DEFAULT_DWELL_TIME_MS, DEFAULT_GAZE_TOLERANCE, DEFAULT_NEUTRAL_WINDOW_MS,
    DEFAULT_POSE_SMOOTHING, DEFAULT_SCAN_SPEED_MS, DEFAULT_SENSITIVITY, DEFAULT_SIMILARITY_THRESHOLD,
    DEFAULT_SMOOTHING_FACTOR, DEFAULT_SWITCH_DWELL_MS,
};
use aegis_core::{CommandAction, SwitchActionKind};
use serde::{Deserialize, Serialize};

/// Gaze front-end configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeConfig {
    pub enabled: bool,
    /// How long gaze must hold within tolerance to activate.
    pub dwell_time_ms: u64,
    /// Per-axis tolerance box half-width in pixels.
    pub gaze_tolerance: f32,
    /// EMA weight of the previous smoothed point.
    pub smoothing_factor: f32,
    pub blink_detection: bool,
    /// Minimum gap between accepted blinks.
    pub blink_threshold_ms: u64,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dwell_time_ms: DEFAULT_DWELL_TIME_MS,
            gaze_tolerance: DEFAULT_GAZE_TOLERANCE,
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            blink_detection: true,
            blink_threshold_ms: DEFAULT_BLINK_THRESHOLD_MS,
        }
    }
}

/// Gaze calibration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Grid side length; the default 3 gives the classic 9-point run.
    pub grid_side: u8,
    /// Margin from the viewport edge to the outer targets.
    pub margin_px: f32,
    /// How long each target is displayed for the correspondence phase.
    pub point_display_ms: u64,
    /// Samples collected per target during the accuracy test.
    pub samples_per_point: usize,
    /// Accuracy-test window per target before it counts as timed out.
    pub sample_timeout_ms: u64,
    /// Distance at which a point scores zero.
    pub accuracy_radius_px: f32,
    /// Run accuracy at or above this is "calibrated".
    pub accuracy_threshold: f64,
    /// Timed-out point ratio above which the run is flagged low-confidence.
    pub low_confidence_timeout_ratio: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            grid_side: 3,
            margin_px: 100.0,
            point_display_ms: 2000,
            samples_per_point: 10,
            sample_timeout_ms: 3000,
            accuracy_radius_px: 200.0,
            accuracy_threshold: 0.7,
            low_confidence_timeout_ratio: 0.3,
        }
    }
}

/// Head front-end configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadConfig {
    pub enabled: bool,
    /// Post-smoothing gain on each pose axis.
    pub sensitivity: f32,
    /// Pose magnitudes below this are treated as neutral.
    pub dead_zone: f32,
    /// EMA weight of the previous smoothed pose.
    pub smoothing: f32,
    /// Averaging window for neutral-pose calibration.
    pub neutral_window_ms: u64,
    pub gesture_recognition: bool,
    pub invert_x: bool,
    pub invert_y: bool,
    /// Fraction of the viewport a full-scale pose deflection covers when
    /// projecting to a screen point.
    pub pointer_scale: f32,
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sensitivity: DEFAULT_SENSITIVITY,
            dead_zone: DEFAULT_DEAD_ZONE,
            smoothing: DEFAULT_POSE_SMOOTHING,
            neutral_window_ms: DEFAULT_NEUTRAL_WINDOW_MS,
            gesture_recognition: true,
            invert_x: false,
            invert_y: false,
            pointer_scale: 0.3,
        }
    }
}

/// How interactive elements are partitioned for scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPattern {
    /// One group, document order.
    Linear,
    /// Three bands by vertical screen position (empty bands dropped).
    Group,
    /// By role: game elements, buttons, inputs, everything else.
    Custom,
}

/// Switch / scanning front-end configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub enabled: bool,
    /// Interval between scan cursor advances.
    pub scan_speed_ms: u64,
    pub scan_pattern: ScanPattern,
    /// Presses released before this are noise and ignored.
    pub activation_time_ms: u64,
    /// Presses still down at this boundary become holds.
    pub dwell_time_ms: u64,
    /// Start scanning as soon as groups are built.
    pub auto_start: bool,
    /// Ordered key-code -> switch-role mapping.
    pub switch_mapping: Vec<(String, SwitchActionKind)>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scan_speed_ms: DEFAULT_SCAN_SPEED_MS,
            scan_pattern: ScanPattern::Linear,
            activation_time_ms: DEFAULT_ACTIVATION_TIME_MS,
            dwell_time_ms: DEFAULT_SWITCH_DWELL_MS,
            auto_start: false,
            switch_mapping: vec![
                ("space".to_string(), SwitchActionKind::Primary),
                ("enter".to_string(), SwitchActionKind::Secondary),
                ("escape".to_string(), SwitchActionKind::Cancel),
            ],
        }
    }
}

impl ScanConfig {
    /// Resolve a key code to its switch role.
    pub fn lookup_switch(&self, code: &str) -> Option<SwitchActionKind> {
        self.switch_mapping
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, action)| *action)
    }

    /// Bind a key code (HID ids included) to a switch role.
    pub fn bind_switch(&mut self, code: &str, action: SwitchActionKind) {
        if let Some(entry) = self.switch_mapping.iter_mut().find(|(c, _)| c == code) {
            entry.1 = action;
        } else {
            self.switch_mapping.push((code.to_string(), action));
        }
    }
}

/// Voice front-end configuration.
///
/// The phrase table is ordered: earlier entries win both exact and fuzzy
/// resolution, so put the preferred phrasing of ambiguous commands first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub enabled: bool,
    /// Utterances below this recognizer confidence are ignored.
    pub confidence_threshold: f64,
    /// Fuzzy matches must strictly exceed this similarity.
    pub similarity_threshold: f64,
    /// Global phrase -> command table.
    pub commands: Vec<(String, CommandAction)>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            commands: default_global_commands(),
        }
    }
}

impl VoiceConfig {
    /// Config with an empty phrase table.
    pub fn empty() -> Self {
        Self {
            commands: Vec::new(),
            ..Self::default()
        }
    }

    /// Append or replace a phrase binding.
    pub fn bind_phrase(&mut self, phrase: &str, action: CommandAction) {
        if let Some(entry) = self.commands.iter_mut().find(|(p, _)| p == phrase) {
            entry.1 = action;
        } else {
            self.commands.push((phrase.to_string(), action));
        }
    }

    /// Remove a phrase binding.
    pub fn unbind_phrase(&mut self, phrase: &str) {
        self.commands.retain(|(p, _)| p != phrase);
    }
}

/// Default global phrases, available in every context.
pub fn default_global_commands() -> Vec<(String, CommandAction)> {
    [
        ("click", CommandAction::Click),
        ("pop", CommandAction::Pop),
        ("select", CommandAction::Select),
        ("back", CommandAction::Back),
        ("next", CommandAction::Next),
        ("menu", CommandAction::Menu),
        ("pause", CommandAction::Pause),
        ("resume", CommandAction::Resume),
        ("up", CommandAction::Up),
        ("down", CommandAction::Down),
        ("left", CommandAction::Left),
        ("right", CommandAction::Right),
        ("start", CommandAction::Start),
        ("stop", CommandAction::Stop),
        ("yes", CommandAction::Yes),
        ("no", CommandAction::No),
        ("cancel", CommandAction::Cancel),
        ("help", CommandAction::Help),
    ]
    .into_iter()
    .map(|(p, a)| (p.to_string(), a))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_switch_mapping() {
        let config = ScanConfig::default();
        assert_eq!(
            config.lookup_switch("space"),
            Some(SwitchActionKind::Primary)
        );
        assert_eq!(
            config.lookup_switch("escape"),
            Some(SwitchActionKind::Cancel)
        );
        assert_eq!(config.lookup_switch("tab"), None);
    }

    #[test]
    fn bind_switch_replaces_existing() {
        let mut config = ScanConfig::default();
        config.bind_switch("space", SwitchActionKind::Cancel);
        assert_eq!(
            config.lookup_switch("space"),
            Some(SwitchActionKind::Cancel)
        );
        // No duplicate entry was appended.
        assert_eq!(
            config.switch_mapping.iter().filter(|(c, _)| c == "space").count(),
            1
        );
    }

    #[test]
    fn phrase_binding_preserves_order() {
        let mut config = VoiceConfig::empty();
        config.bind_phrase("pop", CommandAction::Pop);
        config.bind_phrase("stop", CommandAction::Stop);
        assert_eq!(config.commands[0].0, "pop");
        config.bind_phrase("pop", CommandAction::Click);
        assert_eq!(config.commands[0], ("pop".to_string(), CommandAction::Click));
    }

    #[test]
    fn configs_round_trip_through_json() {
        let config = GazeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: GazeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
