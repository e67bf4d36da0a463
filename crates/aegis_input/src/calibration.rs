//! Gaze calibration: target sequence plus accuracy scoring.
//!
//! A run walks a 3x3 target grid twice: first a display pass (one target
//! at a time, so the upstream tracker can record correspondences), then an
//! accuracy pass that samples the live smoothed stream against each
//! target. Both passes are deadline-driven state transitions, so tests run
//! the whole sequence on virtual time.
//!
//! A timed-out point signals instrumentation failure, not poor accuracy:
//! it is excluded from the accuracy mean rather than scored zero. Runs
//! where too many points time out are flagged low-confidence instead.

use crate::config::CalibrationConfig;
use aegis_core::{Feedback, FeedbackHub, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

/// One fixed on-screen target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub pos: Vec2,
    pub row: u8,
    pub col: u8,
}

/// Result of a completed (or failed) run. Frozen once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub success: bool,
    /// Mean per-point score over points that produced any samples.
    pub accuracy: f64,
    /// Whether the run walked every point (false when the sensor was
    /// unavailable at start).
    pub completed: bool,
    /// Points whose sampling window produced nothing.
    pub timed_out_points: usize,
    /// Set when more than the configured ratio of points timed out.
    pub low_confidence: bool,
}

impl CalibrationOutcome {
    fn unavailable() -> Self {
        Self {
            success: false,
            accuracy: 0.0,
            completed: false,
            timed_out_points: 0,
            low_confidence: false,
        }
    }
}

#[derive(Debug)]
enum Phase {
    Idle,
    /// Display pass: target `index` is on screen until the deadline.
    Showing { index: usize, until_ms: u64 },
    /// Accuracy pass: sampling the live stream against target `index`.
    Measuring {
        index: usize,
        deadline_ms: u64,
        samples: SmallVec<[Vec2; 10]>,
    },
}

/// Session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationStats {
    pub attempts: u64,
}

/// Deadline-driven calibration state machine.
#[derive(Debug)]
pub struct CalibrationEngine {
    config: CalibrationConfig,
    points: Vec<CalibrationPoint>,
    scores: Vec<Option<f64>>,
    phase: Phase,
    outcome: Option<CalibrationOutcome>,
    stats: CalibrationStats,
}

impl CalibrationEngine {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            points: Vec::new(),
            scores: Vec::new(),
            phase: Phase::Idle,
            outcome: None,
            stats: CalibrationStats::default(),
        }
    }

    /// Generate the target grid for a viewport.
    pub fn grid_points(config: &CalibrationConfig, viewport: Vec2) -> Vec<CalibrationPoint> {
        let side = config.grid_side.max(2) as u32;
        let margin = config.margin_px;
        let width = viewport.x - margin * 2.0;
        let height = viewport.y - margin * 2.0;
        let steps = (side - 1) as f32;

        let mut points = Vec::with_capacity((side * side) as usize);
        for row in 0..side {
            for col in 0..side {
                points.push(CalibrationPoint {
                    pos: Vec2::new(
                        margin + width * col as f32 / steps,
                        margin + height * row as f32 / steps,
                    ),
                    row: row as u8,
                    col: col as u8,
                });
            }
        }
        points
    }

    /// Begin a run. Replaces any previous run; its outcome is discarded.
    ///
    /// A degenerate viewport means the display/sensor stack is not up;
    /// the run completes immediately as a failure rather than erroring.
    pub fn start(&mut self, viewport: Vec2, now_ms: u64, hub: &mut FeedbackHub) {
        self.stats.attempts += 1;

        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            warn!("calibration started without a usable viewport");
            self.phase = Phase::Idle;
            self.outcome = Some(CalibrationOutcome::unavailable());
            return;
        }

        // The previous outcome stays visible until this run completes and
        // replaces it.
        self.points = Self::grid_points(&self.config, viewport);
        self.scores = vec![None; self.points.len()];
        self.phase = Phase::Showing {
            index: 0,
            until_ms: now_ms + self.config.point_display_ms,
        };

        info!(points = self.points.len(), "calibration started");
        hub.broadcast(&Feedback::CalibrationStarted);
    }

    /// Abort the run in progress. The previous outcome, if any, stays.
    pub fn cancel(&mut self) {
        if !matches!(self.phase, Phase::Idle) {
            debug!("calibration cancelled");
        }
        self.phase = Phase::Idle;
    }

    pub fn in_progress(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Target the UI should currently display, if any.
    pub fn current_target(&self) -> Option<&CalibrationPoint> {
        match self.phase {
            Phase::Showing { index, .. } | Phase::Measuring { index, .. } => {
                self.points.get(index)
            }
            Phase::Idle => None,
        }
    }

    /// Outcome of the last finished run.
    pub fn outcome(&self) -> Option<&CalibrationOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_calibrated(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| o.success)
    }

    pub fn stats(&self) -> CalibrationStats {
        self.stats
    }

    /// Feed one live smoothed gaze sample. Only consumed while measuring.
    pub fn push_sample(&mut self, pos: Vec2, now_ms: u64, hub: &mut FeedbackHub) {
        if let Phase::Measuring { index, samples, .. } = &mut self.phase {
            samples.push(pos);
            if samples.len() >= self.config.samples_per_point {
                let index = *index;
                let samples = std::mem::take(samples);
                self.finish_point(index, samples, now_ms, hub);
            }
        }
    }

    /// Advance deadlines. Call from the host frame loop.
    pub fn tick(&mut self, now_ms: u64, hub: &mut FeedbackHub) {
        match &mut self.phase {
            Phase::Idle => {}
            Phase::Showing { index, until_ms } => {
                if now_ms >= *until_ms {
                    let next = *index + 1;
                    if next < self.points.len() {
                        self.phase = Phase::Showing {
                            index: next,
                            until_ms: now_ms + self.config.point_display_ms,
                        };
                    } else {
                        // Display pass done; start the accuracy pass.
                        self.phase = Phase::Measuring {
                            index: 0,
                            deadline_ms: now_ms + self.config.sample_timeout_ms,
                            samples: SmallVec::new(),
                        };
                    }
                }
            }
            Phase::Measuring {
                index,
                deadline_ms,
                samples,
            } => {
                if now_ms >= *deadline_ms {
                    let index = *index;
                    let samples = std::mem::take(samples);
                    self.finish_point(index, samples, now_ms, hub);
                }
            }
        }
    }

    fn finish_point(
        &mut self,
        index: usize,
        samples: SmallVec<[Vec2; 10]>,
        now_ms: u64,
        hub: &mut FeedbackHub,
    ) {
        self.scores[index] = self.score_point(index, &samples);

        let next = index + 1;
        if next < self.points.len() {
            self.phase = Phase::Measuring {
                index: next,
                deadline_ms: now_ms + self.config.sample_timeout_ms,
                samples: SmallVec::new(),
            };
        } else {
            self.complete(hub);
        }
    }

    fn score_point(&self, index: usize, samples: &[Vec2]) -> Option<f64> {
        if samples.is_empty() {
            debug!(index, "calibration point timed out");
            return None;
        }

        let n = samples.len() as f32;
        let mean = Vec2::new(
            samples.iter().map(|p| p.x).sum::<f32>() / n,
            samples.iter().map(|p| p.y).sum::<f32>() / n,
        );
        let distance = mean.distance(self.points[index].pos);
        let score = (1.0 - f64::from(distance) / f64::from(self.config.accuracy_radius_px)).max(0.0);
        debug!(index, distance, score, "calibration point scored");
        Some(score)
    }

    fn complete(&mut self, hub: &mut FeedbackHub) {
        let scored: Vec<f64> = self.scores.iter().flatten().copied().collect();
        let timed_out = self.scores.iter().filter(|s| s.is_none()).count();

        let accuracy = if scored.is_empty() {
            0.0
        } else {
            scored.iter().sum::<f64>() / scored.len() as f64
        };
        let timeout_ratio = timed_out as f64 / self.scores.len().max(1) as f64;

        let outcome = CalibrationOutcome {
            success: accuracy >= self.config.accuracy_threshold,
            accuracy,
            completed: true,
            timed_out_points: timed_out,
            low_confidence: timeout_ratio > self.config.low_confidence_timeout_ratio,
        };

        info!(
            accuracy,
            success = outcome.success,
            timed_out,
            "calibration completed"
        );
        hub.broadcast(&Feedback::CalibrationCompleted { accuracy });

        self.outcome = Some(outcome);
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CalibrationConfig {
        CalibrationConfig::default()
    }

    fn engine() -> CalibrationEngine {
        CalibrationEngine::new(config())
    }

    const VIEWPORT: Vec2 = Vec2::new(1000.0, 800.0);

    /// Run the display pass to completion, returning the time at which
    /// the accuracy pass begins.
    fn run_display_pass(engine: &mut CalibrationEngine, hub: &mut FeedbackHub) -> u64 {
        let mut now = 0;
        engine.start(VIEWPORT, now, hub);
        for _ in 0..9 {
            now += 2000;
            engine.tick(now, hub);
        }
        now
    }

    #[test]
    fn grid_is_three_by_three_with_margin() {
        let points = CalibrationEngine::grid_points(&config(), VIEWPORT);
        assert_eq!(points.len(), 9);
        assert_eq!(points[0].pos, Vec2::new(100.0, 100.0));
        assert_eq!(points[4].pos, Vec2::new(500.0, 400.0));
        assert_eq!(points[8].pos, Vec2::new(900.0, 700.0));
    }

    #[test]
    fn perfect_samples_score_full_accuracy() {
        let mut engine = engine();
        let mut hub = FeedbackHub::new();
        let mut now = run_display_pass(&mut engine, &mut hub);

        // Feed 10 on-target samples per point.
        for _ in 0..9 {
            let target = engine.current_target().expect("target").pos;
            for _ in 0..10 {
                now += 10;
                engine.push_sample(target, now, &mut hub);
            }
        }

        let outcome = engine.outcome().expect("outcome");
        assert!(outcome.success);
        assert!(outcome.completed);
        assert!((outcome.accuracy - 1.0).abs() < 1e-6);
        assert_eq!(outcome.timed_out_points, 0);
        assert!(!outcome.low_confidence);
        assert!(engine.is_calibrated());
    }

    #[test]
    fn hundred_px_error_scores_half() {
        let mut engine = engine();
        let mut hub = FeedbackHub::new();
        let mut now = run_display_pass(&mut engine, &mut hub);

        for _ in 0..9 {
            let target = engine.current_target().expect("target").pos;
            for _ in 0..10 {
                now += 10;
                engine.push_sample(Vec2::new(target.x + 100.0, target.y), now, &mut hub);
            }
        }

        let outcome = engine.outcome().expect("outcome");
        assert!((outcome.accuracy - 0.5).abs() < 1e-3);
        assert!(!outcome.success);
    }

    #[test]
    fn timed_out_points_are_excluded_not_zeroed() {
        let mut engine = engine();
        let mut hub = FeedbackHub::new();
        let mut now = run_display_pass(&mut engine, &mut hub);

        // First point: no samples, let it time out.
        now += 3000;
        engine.tick(now, &mut hub);

        // Remaining 8 points: perfect samples.
        for _ in 0..8 {
            let target = engine.current_target().expect("target").pos;
            for _ in 0..10 {
                now += 10;
                engine.push_sample(target, now, &mut hub);
            }
        }

        let outcome = engine.outcome().expect("outcome");
        // One excluded point must not drag the mean down.
        assert!((outcome.accuracy - 1.0).abs() < 1e-6);
        assert_eq!(outcome.timed_out_points, 1);
        // 1/9 ≈ 11% timed out: below the 30% low-confidence bar.
        assert!(!outcome.low_confidence);
    }

    #[test]
    fn mostly_timed_out_run_is_low_confidence() {
        let mut engine = engine();
        let mut hub = FeedbackHub::new();
        let mut now = run_display_pass(&mut engine, &mut hub);

        // 4 of 9 points time out (44% > 30%).
        for i in 0..9 {
            if i < 4 {
                now += 3000;
                engine.tick(now, &mut hub);
            } else {
                let target = engine.current_target().expect("target").pos;
                for _ in 0..10 {
                    now += 10;
                    engine.push_sample(target, now, &mut hub);
                }
            }
        }

        let outcome = engine.outcome().expect("outcome");
        assert!(outcome.low_confidence);
        assert_eq!(outcome.timed_out_points, 4);
    }

    #[test]
    fn unusable_viewport_fails_without_panicking() {
        let mut engine = engine();
        let mut hub = FeedbackHub::new();

        engine.start(Vec2::ZERO, 0, &mut hub);

        let outcome = engine.outcome().expect("outcome");
        assert!(!outcome.success);
        assert_eq!(outcome.accuracy, 0.0);
        assert!(!outcome.completed);
        assert!(!engine.in_progress());
    }

    #[test]
    fn cancel_keeps_previous_outcome() {
        let mut engine = engine();
        let mut hub = FeedbackHub::new();
        let mut now = run_display_pass(&mut engine, &mut hub);

        for _ in 0..9 {
            let target = engine.current_target().expect("target").pos;
            for _ in 0..10 {
                now += 10;
                engine.push_sample(target, now, &mut hub);
            }
        }
        assert!(engine.is_calibrated());

        // New run, cancelled mid-way: stale ticks no-op, old outcome kept.
        engine.start(VIEWPORT, now, &mut hub);
        engine.cancel();
        engine.tick(now + 10_000, &mut hub);
        assert!(!engine.in_progress());
        assert!(engine.outcome().is_some());
    }

    #[test]
    fn samples_during_display_pass_are_ignored() {
        let mut engine = engine();
        let mut hub = FeedbackHub::new();
        engine.start(VIEWPORT, 0, &mut hub);

        engine.push_sample(Vec2::new(100.0, 100.0), 10, &mut hub);
        // Still in the display pass for point 0.
        assert!(engine.in_progress());
        assert!(engine.outcome().is_none());
    }
}
