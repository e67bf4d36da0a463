//! Raw samples from any sensor source.
//!
//! This is the unified inbound type that all sensor callbacks are
//! converted to before processing. Keeping it serializable means input
//! traces can be recorded and replayed against the front-ends in tests.

use aegis_core::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// One raw sample from a sensor stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawSample {
    // =========================================================================
    // GAZE
    // =========================================================================
    /// One gaze prediction, pre-smoothing. `blink` is set when the
    /// upstream eye-feature extractor reports a blink this frame.
    Gaze { pos: Vec2, blink: bool },

    // =========================================================================
    // HEAD
    // =========================================================================
    /// Named 3D face landmarks for one camera frame.
    Head(LandmarkFrame),

    // =========================================================================
    // SWITCH
    // =========================================================================
    /// One key/HID switch edge.
    Switch(SwitchEdge),

    // =========================================================================
    // VOICE
    // =========================================================================
    /// One speech-recognizer result.
    Voice(Utterance),
}

impl RawSample {
    /// Create a gaze sample without a blink.
    pub fn gaze(x: f32, y: f32) -> Self {
        RawSample::Gaze {
            pos: Vec2::new(x, y),
            blink: false,
        }
    }

    /// Create a switch down edge.
    pub fn switch_down(code: &str) -> Self {
        RawSample::Switch(SwitchEdge {
            code: code.to_string(),
            edge: Edge::Down,
        })
    }

    /// Create a switch up edge.
    pub fn switch_up(code: &str) -> Self {
        RawSample::Switch(SwitchEdge {
            code: code.to_string(),
            edge: Edge::Up,
        })
    }

    /// Create a finalized utterance.
    pub fn utterance(transcript: &str, confidence: f64) -> Self {
        RawSample::Voice(Utterance {
            transcript: transcript.to_string(),
            confidence,
            is_final: true,
        })
    }

    pub fn is_gaze(&self) -> bool {
        matches!(self, RawSample::Gaze { .. })
    }

    pub fn is_head(&self) -> bool {
        matches!(self, RawSample::Head(_))
    }

    pub fn is_switch(&self) -> bool {
        matches!(self, RawSample::Switch(_))
    }

    pub fn is_voice(&self) -> bool {
        matches!(self, RawSample::Voice(_))
    }
}

/// The four named landmarks head-pose derivation needs.
///
/// Coordinates are in the landmark extractor's normalized space; the pose
/// tracker only uses relative geometry, so the absolute scale is
/// irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub nose_tip: Vec3,
    pub left_eye: Vec3,
    pub right_eye: Vec3,
    pub chin: Vec3,
}

/// A physical switch transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchEdge {
    /// Lower-cased key code ("space", "enter") or synthetic HID id
    /// ("hid_switch_0").
    pub code: String,
    pub edge: Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Down,
    Up,
}

/// A speech recognition result. Non-final (interim) results are ignored
/// by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub transcript: String,
    pub confidence: f64,
    pub is_final: bool,
}

/// Decodes raw HID report bytes into switch edges.
///
/// Reports are bit-packed: each bit is one switch's level. The decoder
/// tracks previous levels and emits an edge per transition, with
/// synthetic codes `hid_switch_<n>`.
#[derive(Debug, Default)]
pub struct HidDecoder {
    levels: Vec<bool>,
}

impl HidDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, report: &[u8]) -> Vec<SwitchEdge> {
        let mut edges = Vec::new();
        let mut index = 0usize;

        for byte in report {
            for bit in 0..8 {
                let level = (byte >> bit) & 1 == 1;
                let previous = self.levels.get(index).copied().unwrap_or(false);

                if level != previous {
                    edges.push(SwitchEdge {
                        code: format!("hid_switch_{index}"),
                        edge: if level { Edge::Down } else { Edge::Up },
                    });
                }

                if index < self.levels.len() {
                    self.levels[index] = level;
                } else {
                    self.levels.push(level);
                }
                index += 1;
            }
        }

        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_sample_categories() {
        assert!(RawSample::gaze(1.0, 2.0).is_gaze());
        assert!(!RawSample::gaze(1.0, 2.0).is_switch());
        assert!(RawSample::switch_down("space").is_switch());
        assert!(RawSample::utterance("pop", 0.9).is_voice());
    }

    #[test]
    fn hid_decoder_emits_edges_only_on_transition() {
        let mut decoder = HidDecoder::new();

        // Bit 1 goes high.
        let edges = decoder.decode(&[0b0000_0010]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].code, "hid_switch_1");
        assert_eq!(edges[0].edge, Edge::Down);

        // Same report: no new edges.
        assert!(decoder.decode(&[0b0000_0010]).is_empty());

        // Bit 1 releases, bit 3 presses.
        let edges = decoder.decode(&[0b0000_1000]);
        assert_eq!(edges.len(), 2);
        assert!(edges
            .iter()
            .any(|e| e.code == "hid_switch_1" && e.edge == Edge::Up));
        assert!(edges
            .iter()
            .any(|e| e.code == "hid_switch_3" && e.edge == Edge::Down));
    }

    #[test]
    fn raw_sample_round_trips_through_json() {
        let sample = RawSample::utterance("new game", 0.85);
        let json = serde_json::to_string(&sample).unwrap();
        let back: RawSample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample, back);
    }
}
