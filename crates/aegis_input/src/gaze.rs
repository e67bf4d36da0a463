//! Gaze dwell detection and blink debouncing.
//!
//! Per smoothed sample the detector filters its rolling history down to
//! entries that are both recent (within `dwell_time_ms`) and near the
//! current point (per-axis box test). Ten or more qualifying samples whose
//! span reaches the dwell time fire an activation at the current point;
//! fewer than ten means the gaze left the region and no progress is shown.

use crate::config::GazeConfig;
use crate::smoothing::{PointSmoother, SmoothingParams};
use crate::{DWELL_SAMPLE_THRESHOLD, GAZE_HISTORY_LIMIT};
use aegis_core::{Activation, Feedback, FeedbackHub, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// One smoothed gaze observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub pos: Vec2,
    pub timestamp_ms: u64,
}

/// Session counters for the gaze front-end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazeStats {
    pub gaze_events: u64,
    pub dwell_activations: u64,
    pub blink_events: u64,
    pub double_blinks: u64,
}

/// Dwell + blink state machine over a smoothed gaze stream.
#[derive(Debug)]
pub struct GazeDwellDetector {
    config: GazeConfig,
    smoother: PointSmoother,
    history: VecDeque<GazeSample>,
    current: Option<Vec2>,
    /// Progress of the dwell in flight, if any.
    progress: Option<f32>,
    last_blink_ms: Option<u64>,
    accepted_blinks: u64,
    stats: GazeStats,
}

impl GazeDwellDetector {
    pub fn new(config: GazeConfig) -> Self {
        let smoother = PointSmoother::new(SmoothingParams::factor_only(config.smoothing_factor));
        Self {
            config,
            smoother,
            history: VecDeque::with_capacity(GAZE_HISTORY_LIMIT),
            current: None,
            progress: None,
            last_blink_ms: None,
            accepted_blinks: 0,
            stats: GazeStats::default(),
        }
    }

    pub fn config(&self) -> &GazeConfig {
        &self.config
    }

    /// Replace the configuration. Smoothing state is reset so the new
    /// factor applies cleanly; the dwell history is kept.
    pub fn set_config(&mut self, config: GazeConfig) {
        self.smoother = PointSmoother::new(SmoothingParams::factor_only(config.smoothing_factor));
        self.config = config;
    }

    /// Latest smoothed gaze point.
    pub fn current_gaze(&self) -> Option<Vec2> {
        self.current
    }

    /// Dwell progress in [0, 1), or `None` when no dwell is accumulating
    /// (the progress indicator should be hidden).
    pub fn progress(&self) -> Option<f32> {
        self.progress
    }

    pub fn stats(&self) -> GazeStats {
        self.stats
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Drop all dwell state (e.g. on scene change).
    pub fn clear(&mut self) {
        self.history.clear();
        self.progress = None;
        self.smoother.reset();
    }

    /// Process one raw gaze sample.
    ///
    /// Returns the activation to dispatch when a dwell completes.
    pub fn on_sample(
        &mut self,
        raw: Vec2,
        blink: bool,
        now_ms: u64,
        hub: &mut FeedbackHub,
    ) -> Option<Activation> {
        if !self.config.enabled {
            return None;
        }

        self.stats.gaze_events += 1;

        let pos = self.smoother.update(raw);
        self.current = Some(pos);

        self.history.push_back(GazeSample {
            pos,
            timestamp_ms: now_ms,
        });
        while self.history.len() > GAZE_HISTORY_LIMIT {
            self.history.pop_front();
        }

        if blink {
            self.on_blink(now_ms, hub);
        }

        self.detect_dwell(pos, now_ms, hub)
    }

    fn detect_dwell(&mut self, pos: Vec2, now_ms: u64, hub: &mut FeedbackHub) -> Option<Activation> {
        let tolerance = self.config.gaze_tolerance;
        let dwell_time = self.config.dwell_time_ms;

        // Recent samples near the current point, per-axis box test. A
        // sample exactly dwell_time old still counts, so a fixation
        // spanning exactly the dwell time fires.
        let earliest = self
            .history
            .iter()
            .filter(|s| now_ms.saturating_sub(s.timestamp_ms) <= dwell_time)
            .filter(|s| {
                (s.pos.x - pos.x).abs() < tolerance && (s.pos.y - pos.y).abs() < tolerance
            })
            .fold((0usize, u64::MAX), |(count, min_ts), s| {
                (count + 1, min_ts.min(s.timestamp_ms))
            });
        let (qualifying, earliest_ts) = earliest;

        if qualifying < DWELL_SAMPLE_THRESHOLD {
            // Gaze left the region; hide the indicator.
            self.progress = None;
            return None;
        }

        let elapsed = now_ms.saturating_sub(earliest_ts);
        if elapsed >= dwell_time {
            self.stats.dwell_activations += 1;
            self.progress = None;
            // Consume the dwell so it cannot re-fire from the same samples.
            self.history.clear();

            debug!(x = pos.x, y = pos.y, "dwell complete");
            hub.broadcast(&Feedback::DwellActivated { pos });
            Some(Activation::Point { pos })
        } else {
            let progress = elapsed as f32 / dwell_time as f32;
            self.progress = Some(progress);
            hub.broadcast(&Feedback::DwellProgress { pos, progress });
            None
        }
    }

    fn on_blink(&mut self, now_ms: u64, hub: &mut FeedbackHub) {
        if !self.config.blink_detection {
            return;
        }

        let since_last = self
            .last_blink_ms
            .map(|t| now_ms.saturating_sub(t))
            .unwrap_or(u64::MAX);
        if since_last <= self.config.blink_threshold_ms {
            return;
        }

        self.last_blink_ms = Some(now_ms);
        self.accepted_blinks += 1;
        self.stats.blink_events += 1;
        hub.broadcast(&Feedback::BlinkDetected);

        if self.accepted_blinks % 2 == 0 {
            self.stats.double_blinks += 1;
            debug!("double blink");
            hub.broadcast(&Feedback::DoubleBlink);
        }
    }
}
