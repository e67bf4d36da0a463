//! Head-pose derivation from face landmarks.
//!
//! Pose axes: x = horizontal turn (nose offset from the eye midpoint),
//! y = vertical nod (nose offset normalized by face height), z = roll in
//! degrees (eye-line angle). The tracker subtracts the calibrated neutral
//! pose, then smooths with dead-zone and sensitivity per axis.

use crate::config::HeadConfig;
use crate::raw::LandmarkFrame;
use crate::smoothing::{PoseSmoother, SmoothingParams};
use aegis_core::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Session counters for the head front-end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadStats {
    pub tracking_frames: u64,
    pub gestures_recognized: u64,
}

/// Derive the raw pose from one landmark frame.
pub fn derive_pose(frame: &LandmarkFrame, invert_x: bool, invert_y: bool) -> Vec3 {
    let center_x = (frame.left_eye.x + frame.right_eye.x) / 2.0;
    let center_y = (frame.left_eye.y + frame.right_eye.y) / 2.0;

    let eye_angle = (frame.right_eye.y - frame.left_eye.y)
        .atan2(frame.right_eye.x - frame.left_eye.x);
    let roll = eye_angle.to_degrees();

    let face_height = (frame.chin.y - center_y).abs().max(f32::EPSILON);
    let vertical = (frame.nose_tip.y - center_y) / face_height;
    let horizontal = (frame.nose_tip.x - center_x) * 2.0;

    Vec3::new(
        horizontal * if invert_x { -1.0 } else { 1.0 },
        vertical * if invert_y { -1.0 } else { 1.0 },
        roll,
    )
}

#[derive(Debug)]
struct NeutralCapture {
    deadline_ms: u64,
    sum: Vec3,
    count: u32,
}

/// Smoothed, neutral-relative head pose over a landmark stream.
#[derive(Debug)]
pub struct HeadPoseTracker {
    config: HeadConfig,
    smoother: PoseSmoother,
    neutral: Option<Vec3>,
    capture: Option<NeutralCapture>,
    current: Vec3,
    last_update_ms: u64,
    stats: HeadStats,
}

impl HeadPoseTracker {
    pub fn new(config: HeadConfig) -> Self {
        let smoother = PoseSmoother::new(SmoothingParams {
            factor: config.smoothing,
            dead_zone: config.dead_zone,
            sensitivity: config.sensitivity,
        });
        Self {
            config,
            smoother,
            neutral: None,
            capture: None,
            current: Vec3::ZERO,
            last_update_ms: 0,
            stats: HeadStats::default(),
        }
    }

    pub fn config(&self) -> &HeadConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: HeadConfig) {
        self.smoother = PoseSmoother::new(SmoothingParams {
            factor: config.smoothing,
            dead_zone: config.dead_zone,
            sensitivity: config.sensitivity,
        });
        self.config = config;
    }

    /// Latest smoothed pose.
    pub fn current_pose(&self) -> Vec3 {
        self.current
    }

    pub fn last_update_ms(&self) -> u64 {
        self.last_update_ms
    }

    pub fn is_calibrated(&self) -> bool {
        self.neutral.is_some()
    }

    pub fn neutral_pose(&self) -> Option<Vec3> {
        self.neutral
    }

    pub fn stats(&self) -> HeadStats {
        self.stats
    }

    pub(crate) fn count_gesture(&mut self) {
        self.stats.gestures_recognized += 1;
    }

    /// Start averaging raw poses for the neutral position. The capture
    /// closes on the first frame at or after the window deadline.
    pub fn begin_neutral_calibration(&mut self, now_ms: u64) {
        info!(window_ms = self.config.neutral_window_ms, "neutral-pose calibration started");
        self.capture = Some(NeutralCapture {
            deadline_ms: now_ms + self.config.neutral_window_ms,
            sum: Vec3::ZERO,
            count: 0,
        });
    }

    pub fn cancel_neutral_calibration(&mut self) {
        self.capture = None;
    }

    pub fn calibrating(&self) -> bool {
        self.capture.is_some()
    }

    /// Process one landmark frame into a smoothed pose.
    pub fn on_landmarks(&mut self, frame: &LandmarkFrame, now_ms: u64) -> Vec3 {
        self.stats.tracking_frames += 1;

        let raw = derive_pose(frame, self.config.invert_x, self.config.invert_y);

        if let Some(capture) = &mut self.capture {
            capture.sum = Vec3::new(
                capture.sum.x + raw.x,
                capture.sum.y + raw.y,
                capture.sum.z + raw.z,
            );
            capture.count += 1;

            if now_ms >= capture.deadline_ms && capture.count > 0 {
                let n = capture.count as f32;
                let neutral = Vec3::new(capture.sum.x / n, capture.sum.y / n, capture.sum.z / n);
                debug!(?neutral, "neutral pose captured");
                self.neutral = Some(neutral);
                self.capture = None;
                self.smoother.reset();
            }
        }

        let relative = match self.neutral {
            Some(neutral) => Vec3::new(raw.x - neutral.x, raw.y - neutral.y, raw.z - neutral.z),
            None => raw,
        };

        self.current = self.smoother.update(relative);
        self.last_update_ms = now_ms;
        self.current
    }

    /// Project the current pose to a screen point: viewport center plus
    /// the x/y deflection scaled by `pointer_scale`.
    pub fn project(&self, viewport: Vec2) -> Vec2 {
        Vec2::new(
            viewport.x / 2.0 + self.current.x * viewport.x * self.config.pointer_scale,
            viewport.y / 2.0 + self.current.y * viewport.y * self.config.pointer_scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_frame() -> LandmarkFrame {
        LandmarkFrame {
            nose_tip: Vec3::new(0.5, 0.55, 0.0),
            left_eye: Vec3::new(0.4, 0.5, 0.0),
            right_eye: Vec3::new(0.6, 0.5, 0.0),
            chin: Vec3::new(0.5, 0.7, 0.0),
        }
    }

    #[test]
    fn level_head_has_zero_roll() {
        let pose = derive_pose(&level_frame(), false, false);
        assert!(pose.z.abs() < 1e-3);
        assert!(pose.x.abs() < 1e-3);
        // Nose below eye line: positive vertical component.
        assert!(pose.y > 0.0);
    }

    #[test]
    fn turned_head_yields_horizontal_offset() {
        let mut frame = level_frame();
        frame.nose_tip.x = 0.56;
        let pose = derive_pose(&frame, false, false);
        assert!((pose.x - 0.12).abs() < 1e-3);

        let inverted = derive_pose(&frame, true, false);
        assert!((inverted.x + 0.12).abs() < 1e-3);
    }

    #[test]
    fn rolled_head_yields_eye_line_angle() {
        let mut frame = level_frame();
        frame.right_eye.y = 0.6; // right eye dips: positive angle
        let pose = derive_pose(&frame, false, false);
        assert!(pose.z > 20.0);
    }

    #[test]
    fn neutral_calibration_recenters_pose() {
        let mut tracker = HeadPoseTracker::new(HeadConfig {
            enabled: true,
            smoothing: 0.0,
            dead_zone: 0.0,
            ..HeadConfig::default()
        });

        // Hold a slightly-tilted resting pose through the capture window.
        let mut frame = level_frame();
        frame.nose_tip.x = 0.54;

        tracker.begin_neutral_calibration(0);
        for i in 0..31 {
            tracker.on_landmarks(&frame, i * 100);
        }
        assert!(tracker.is_calibrated());

        // The same resting pose now reads as (near) zero.
        let pose = tracker.on_landmarks(&frame, 3200);
        assert!(pose.x.abs() < 1e-3);
    }

    #[test]
    fn projection_centers_on_viewport() {
        let tracker = HeadPoseTracker::new(HeadConfig::default());
        let projected = tracker.project(Vec2::new(800.0, 600.0));
        assert_eq!(projected, Vec2::new(400.0, 300.0));
    }
}
