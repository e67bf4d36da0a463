//! Head-gesture pattern matching.
//!
//! A rolling 2-second pose buffer is matched against configured patterns:
//! oscillations (nod, shake) need at least two full back-and-forth cycles
//! above the threshold, so ordinary head movement with a single excursion
//! never fires; tilts compare the recent average against the threshold.
//! A gesture with the same name as the most recently fired one is
//! suppressed for the cooldown window.

use crate::{
    GESTURE_BUFFER_MS, GESTURE_COOLDOWN_MS, GESTURE_HISTORY_LIMIT, MIN_GESTURE_SAMPLES,
    MIN_OSCILLATION_SAMPLES, OSCILLATION_MIN_PEAKS,
};
use aegis_core::{Axis, NavDirection, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Movement pattern a gesture matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePattern {
    /// Nod: repeated vertical oscillation.
    YOscillation,
    /// Shake: repeated horizontal oscillation.
    XOscillation,
    /// Sustained roll left.
    ZNegative,
    /// Sustained roll right.
    ZPositive,
    /// Sustained lean forward.
    YPositive,
    /// Sustained lean back.
    YNegative,
}

impl GesturePattern {
    fn axis(self) -> Axis {
        match self {
            GesturePattern::XOscillation => Axis::X,
            GesturePattern::YOscillation | GesturePattern::YPositive | GesturePattern::YNegative => {
                Axis::Y
            }
            GesturePattern::ZNegative | GesturePattern::ZPositive => Axis::Z,
        }
    }
}

/// Built-in gesture names plus host extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureName {
    Nod,
    Shake,
    TiltLeft,
    TiltRight,
    LeanForward,
    LeanBack,
    Custom(String),
}

impl GestureName {
    pub fn as_str(&self) -> &str {
        match self {
            GestureName::Nod => "nod",
            GestureName::Shake => "shake",
            GestureName::TiltLeft => "tilt_left",
            GestureName::TiltRight => "tilt_right",
            GestureName::LeanForward => "lean_forward",
            GestureName::LeanBack => "lean_back",
            GestureName::Custom(name) => name,
        }
    }
}

/// Threshold and window for one gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureSpec {
    pub pattern: GesturePattern,
    pub threshold: f32,
    pub duration_ms: u64,
}

/// A matched gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub name: GestureName,
    pub timestamp_ms: u64,
    pub position: Vec3,
}

/// What a fired gesture does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureAction {
    /// Simulated click at the projected head point.
    Click,
    /// Simulated Escape.
    Cancel,
    /// Simulated arrow key.
    Navigate(NavDirection),
    /// Feedback only; host listens for the gesture event itself.
    None,
}

/// Default spec table: nod/shake oscillations, side tilts, leans.
pub fn default_gestures() -> Vec<(GestureName, GestureSpec)> {
    vec![
        (
            GestureName::Nod,
            GestureSpec {
                pattern: GesturePattern::YOscillation,
                threshold: 0.3,
                duration_ms: 1000,
            },
        ),
        (
            GestureName::Shake,
            GestureSpec {
                pattern: GesturePattern::XOscillation,
                threshold: 0.3,
                duration_ms: 1000,
            },
        ),
        (
            GestureName::TiltLeft,
            GestureSpec {
                pattern: GesturePattern::ZNegative,
                threshold: 0.4,
                duration_ms: 500,
            },
        ),
        (
            GestureName::TiltRight,
            GestureSpec {
                pattern: GesturePattern::ZPositive,
                threshold: 0.4,
                duration_ms: 500,
            },
        ),
        (
            GestureName::LeanForward,
            GestureSpec {
                pattern: GesturePattern::YPositive,
                threshold: 0.5,
                duration_ms: 300,
            },
        ),
        (
            GestureName::LeanBack,
            GestureSpec {
                pattern: GesturePattern::YNegative,
                threshold: 0.5,
                duration_ms: 300,
            },
        ),
    ]
}

/// Default gesture -> action bindings.
pub fn default_bindings() -> Vec<(GestureName, GestureAction)> {
    vec![
        (GestureName::Nod, GestureAction::Click),
        (GestureName::Shake, GestureAction::Cancel),
        (
            GestureName::TiltLeft,
            GestureAction::Navigate(NavDirection::Left),
        ),
        (
            GestureName::TiltRight,
            GestureAction::Navigate(NavDirection::Right),
        ),
        (GestureName::LeanForward, GestureAction::None),
        (GestureName::LeanBack, GestureAction::None),
    ]
}

/// Matches pose history against the configured gesture table.
#[derive(Debug)]
pub struct GestureRecognizer {
    specs: Vec<(GestureName, GestureSpec)>,
    bindings: Vec<(GestureName, GestureAction)>,
    buffer: VecDeque<(Vec3, u64)>,
    history: VecDeque<GestureEvent>,
    last_fired: Option<(GestureName, u64)>,
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self::with_gestures(default_gestures())
    }

    pub fn with_gestures(specs: Vec<(GestureName, GestureSpec)>) -> Self {
        Self {
            specs,
            bindings: default_bindings(),
            buffer: VecDeque::new(),
            history: VecDeque::new(),
            last_fired: None,
        }
    }

    /// Register or replace a gesture spec.
    pub fn add_gesture(&mut self, name: GestureName, spec: GestureSpec) {
        if let Some(entry) = self.specs.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = spec;
        } else {
            self.specs.push((name, spec));
        }
    }

    pub fn remove_gesture(&mut self, name: &GestureName) -> bool {
        let before = self.specs.len();
        self.specs.retain(|(n, _)| n != name);
        before != self.specs.len()
    }

    /// Register or replace a gesture -> action binding.
    pub fn bind(&mut self, name: GestureName, action: GestureAction) {
        if let Some(entry) = self.bindings.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = action;
        } else {
            self.bindings.push((name, action));
        }
    }

    pub fn action_for(&self, name: &GestureName) -> GestureAction {
        self.bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| *a)
            .unwrap_or(GestureAction::None)
    }

    /// Recent fired gestures, oldest first (capped).
    pub fn history(&self) -> impl Iterator<Item = &GestureEvent> {
        self.history.iter()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.last_fired = None;
    }

    /// Feed one smoothed pose; returns every gesture that fired.
    pub fn on_pose(&mut self, pose: Vec3, now_ms: u64) -> Vec<GestureEvent> {
        self.buffer.push_back((pose, now_ms));
        while let Some((_, t)) = self.buffer.front() {
            if now_ms.saturating_sub(*t) >= GESTURE_BUFFER_MS {
                self.buffer.pop_front();
            } else {
                break;
            }
        }

        let mut fired = Vec::new();
        for i in 0..self.specs.len() {
            let (name, spec) = &self.specs[i];
            if !self.matches(spec, now_ms) {
                continue;
            }

            // Cooldown: the most recently fired gesture may not re-fire
            // inside the window.
            if let Some((last_name, last_ms)) = &self.last_fired {
                if last_name == name && now_ms.saturating_sub(*last_ms) < GESTURE_COOLDOWN_MS {
                    continue;
                }
            }

            let event = GestureEvent {
                name: name.clone(),
                timestamp_ms: now_ms,
                position: pose,
            };
            debug!(gesture = event.name.as_str(), "gesture fired");

            self.last_fired = Some((event.name.clone(), now_ms));
            self.history.push_back(event.clone());
            while self.history.len() > GESTURE_HISTORY_LIMIT {
                self.history.pop_front();
            }
            fired.push(event);
        }
        fired
    }

    fn matches(&self, spec: &GestureSpec, now_ms: u64) -> bool {
        let window: Vec<f32> = self
            .buffer
            .iter()
            .filter(|(_, t)| now_ms.saturating_sub(*t) < spec.duration_ms)
            .map(|(pos, _)| pos.axis(spec.pattern.axis()))
            .collect();

        if window.len() < MIN_GESTURE_SAMPLES {
            return false;
        }

        match spec.pattern {
            GesturePattern::YOscillation | GesturePattern::XOscillation => {
                detect_oscillation(&window, spec.threshold)
            }
            GesturePattern::ZPositive | GesturePattern::YPositive => {
                detect_tilt(&window, spec.threshold)
            }
            GesturePattern::ZNegative | GesturePattern::YNegative => {
                detect_tilt(&window, -spec.threshold)
            }
        }
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// At least two peaks above +threshold and two valleys below -threshold,
/// counted as strict local extrema.
fn detect_oscillation(values: &[f32], threshold: f32) -> bool {
    if values.len() < MIN_OSCILLATION_SAMPLES {
        return false;
    }

    let mut peaks = 0usize;
    let mut valleys = 0usize;
    for i in 1..values.len() - 1 {
        let (prev, curr, next) = (values[i - 1], values[i], values[i + 1]);
        if curr > prev && curr > next && curr > threshold {
            peaks += 1;
        }
        if curr < prev && curr < next && curr < -threshold {
            valleys += 1;
        }
    }

    peaks >= OSCILLATION_MIN_PEAKS && valleys >= OSCILLATION_MIN_PEAKS
}

/// Average of the last five samples beyond the (signed) threshold.
fn detect_tilt(values: &[f32], threshold: f32) -> bool {
    let recent = &values[values.len().saturating_sub(5)..];
    if recent.is_empty() {
        return false;
    }
    let average = recent.iter().sum::<f32>() / recent.len() as f32;

    if threshold > 0.0 {
        average > threshold
    } else {
        average < threshold
    }
}
