//! Exponential smoothing with dead-zone and sensitivity scaling.
//!
//! Raw sensor and landmark coordinates jitter frame to frame. A
//! single-pole IIR filter trades a little latency for stability cheaply,
//! and the dead-zone suppresses micro-tremor without needing a full
//! Kalman filter.

use aegis_core::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Blend one raw value against the previous filtered value.
///
/// `factor` is the weight of the *previous* value: 0 passes raw through,
/// values approaching 1 respond more slowly. Out-of-range factors are
/// clamped.
pub fn smooth(raw: f32, previous: f32, factor: f32) -> f32 {
    let factor = factor.clamp(0.0, 1.0);
    previous * factor + raw * (1.0 - factor)
}

/// Zero out values inside the dead-zone, before blending.
pub fn apply_dead_zone(value: f32, dead_zone: f32) -> f32 {
    if value.abs() < dead_zone {
        0.0
    } else {
        value
    }
}

/// Per-axis smoothing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    /// Weight of the previous value, in [0, 1].
    pub factor: f32,
    /// Raw values with magnitude below this are treated as 0.
    pub dead_zone: f32,
    /// Post-blend multiplier.
    pub sensitivity: f32,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            factor: 0.5,
            dead_zone: 0.0,
            sensitivity: 1.0,
        }
    }
}

impl SmoothingParams {
    /// Plain blend with no dead-zone or sensitivity adjustment.
    pub fn factor_only(factor: f32) -> Self {
        Self {
            factor,
            ..Self::default()
        }
    }

    fn step(&self, raw: f32, previous: f32) -> f32 {
        smooth(apply_dead_zone(raw, self.dead_zone), previous, self.factor) * self.sensitivity
    }
}

/// Stateful smoother for a 2D point stream (gaze).
///
/// The first sample seeds the filter unchanged, so there is no startup
/// transient pulling early output toward the origin.
#[derive(Debug, Clone)]
pub struct PointSmoother {
    params: SmoothingParams,
    previous: Option<Vec2>,
}

impl PointSmoother {
    pub fn new(params: SmoothingParams) -> Self {
        Self {
            params,
            previous: None,
        }
    }

    pub fn update(&mut self, raw: Vec2) -> Vec2 {
        let out = match self.previous {
            None => raw,
            Some(prev) => Vec2::new(
                self.params.step(raw.x, prev.x),
                self.params.step(raw.y, prev.y),
            ),
        };
        self.previous = Some(out);
        out
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// Stateful smoother for a 3-axis pose stream (head).
#[derive(Debug, Clone)]
pub struct PoseSmoother {
    params: SmoothingParams,
    previous: Option<Vec3>,
}

impl PoseSmoother {
    pub fn new(params: SmoothingParams) -> Self {
        Self {
            params,
            previous: None,
        }
    }

    pub fn update(&mut self, raw: Vec3) -> Vec3 {
        let out = match self.previous {
            None => Vec3::new(
                apply_dead_zone(raw.x, self.params.dead_zone) * self.params.sensitivity,
                apply_dead_zone(raw.y, self.params.dead_zone) * self.params.sensitivity,
                apply_dead_zone(raw.z, self.params.dead_zone) * self.params.sensitivity,
            ),
            Some(prev) => Vec3::new(
                self.params.step(raw.x, prev.x),
                self.params.step(raw.y, prev.y),
                self.params.step(raw.z, prev.z),
            ),
        };
        self.previous = Some(out);
        out
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}
