//! The input hub: owns the four front-ends, routes raw samples, and
//! carries per-modality availability.
//!
//! Initialization failures are isolated: a missing camera disables gaze
//! and head tracking but leaves switch and voice running. After
//! initialization nothing here errors; runtime problems are feedback.

use crate::calibration::{CalibrationEngine, CalibrationOutcome};
use crate::config::{CalibrationConfig, GazeConfig, HeadConfig, ScanConfig, VoiceConfig};
use crate::error::InputError;
use crate::gaze::GazeDwellDetector;
use crate::gesture::{GestureAction, GestureRecognizer};
use crate::head::HeadPoseTracker;
use crate::raw::RawSample;
use crate::scan::ScanEngine;
use crate::voice::VoiceCommandResolver;
use aegis_core::{
    ActionDispatcher, Activation, DispatchConfig, DispatchOutcome, Feedback, FeedbackHub,
    InputSource, NavDirection, NavKey, UiSurface,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Host-reported hardware availability, probed before initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub camera: bool,
    pub microphone: bool,
    pub switches: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            camera: true,
            microphone: true,
            switches: true,
        }
    }
}

/// Lifecycle state of one modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModalityStatus {
    /// Disabled by configuration.
    Off,
    /// Initialized and processing samples.
    Ready,
    /// Capability missing at initialization; permanently disabled.
    Unavailable,
}

/// Aggregate configuration for the hub.
#[derive(Debug, Clone, Default)]
pub struct HubConfig {
    pub gaze: GazeConfig,
    pub calibration: CalibrationConfig,
    pub head: HeadConfig,
    pub scan: ScanConfig,
    pub voice: VoiceConfig,
    pub dispatch: DispatchConfig,
}

/// Owns the front-ends and the shared dispatcher.
pub struct InputHub {
    gaze: GazeDwellDetector,
    calibration: CalibrationEngine,
    head: HeadPoseTracker,
    gestures: GestureRecognizer,
    scan: ScanEngine,
    voice: VoiceCommandResolver,
    dispatcher: ActionDispatcher,
    statuses: [ModalityStatus; 4],
    initialized: bool,
}

fn status_index(source: InputSource) -> usize {
    match source {
        InputSource::Gaze => 0,
        InputSource::Head => 1,
        InputSource::Switch => 2,
        InputSource::Voice => 3,
    }
}

impl InputHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            gaze: GazeDwellDetector::new(config.gaze),
            calibration: CalibrationEngine::new(config.calibration),
            head: HeadPoseTracker::new(config.head),
            gestures: GestureRecognizer::new(),
            scan: ScanEngine::new(config.scan),
            voice: VoiceCommandResolver::new(config.voice),
            dispatcher: ActionDispatcher::new(config.dispatch),
            statuses: [ModalityStatus::Off; 4],
            initialized: false,
        }
    }

    /// Initialize every enabled modality against the probed capabilities.
    ///
    /// Returns the failures; each failed modality is left permanently
    /// disabled while the others keep working. Safe to call once.
    pub fn initialize(
        &mut self,
        caps: &Capabilities,
        surface: &dyn UiSurface,
        now_ms: u64,
        hub: &mut FeedbackHub,
    ) -> Vec<InputError> {
        let mut failures = Vec::new();

        let mut init = |enabled: bool, available: bool, source: InputSource| -> ModalityStatus {
            if !enabled {
                return ModalityStatus::Off;
            }
            if available {
                info!(modality = source.as_str(), "input modality ready");
                ModalityStatus::Ready
            } else {
                warn!(modality = source.as_str(), "capability unavailable");
                failures.push(InputError::CapabilityUnavailable { source });
                ModalityStatus::Unavailable
            }
        };

        self.statuses[status_index(InputSource::Gaze)] =
            init(self.gaze.config().enabled, caps.camera, InputSource::Gaze);
        self.statuses[status_index(InputSource::Head)] =
            init(self.head.config().enabled, caps.camera, InputSource::Head);
        self.statuses[status_index(InputSource::Switch)] = init(
            self.scan.config().enabled,
            caps.switches,
            InputSource::Switch,
        );
        self.statuses[status_index(InputSource::Voice)] = init(
            self.voice.config().enabled,
            caps.microphone,
            InputSource::Voice,
        );

        if self.status(InputSource::Switch) == ModalityStatus::Ready {
            self.scan.rebuild_groups(surface);
            if self.scan.config().auto_start {
                self.scan.start_scanning(now_ms, hub);
            }
        }
        if self.status(InputSource::Voice) == ModalityStatus::Ready {
            self.voice.start_listening(hub);
        }

        self.initialized = true;
        failures
    }

    pub fn status(&self, source: InputSource) -> ModalityStatus {
        self.statuses[status_index(source)]
    }

    fn ready(&self, source: InputSource) -> bool {
        self.status(source) == ModalityStatus::Ready
    }

    /// Route one raw sample to its front-end, dispatching any resulting
    /// activation. Returns what the dispatcher did with it, if anything.
    pub fn process(
        &mut self,
        sample: RawSample,
        now_ms: u64,
        surface: &mut dyn UiSurface,
        hub: &mut FeedbackHub,
    ) -> Option<DispatchOutcome> {
        match sample {
            RawSample::Gaze { pos, blink } => {
                if !self.ready(InputSource::Gaze) {
                    return None;
                }
                let activation = self.gaze.on_sample(pos, blink, now_ms, hub);

                if self.calibration.in_progress() {
                    if let Some(current) = self.gaze.current_gaze() {
                        self.calibration.push_sample(current, now_ms, hub);
                    }
                    // Dwell decisions made mid-calibration are discarded.
                    return None;
                }

                let activation = activation?;
                if !self.gaze_certified() {
                    debug!("dwell activation dropped: gaze stream not calibrated");
                    return None;
                }
                Some(self.dispatcher.dispatch(activation, InputSource::Gaze, now_ms, surface, hub))
            }
            RawSample::Head(frame) => {
                if !self.ready(InputSource::Head) {
                    return None;
                }
                let pose = self.head.on_landmarks(&frame, now_ms);
                if !self.head.config().gesture_recognition || self.head.calibrating() {
                    return None;
                }

                let mut outcome = None;
                for event in self.gestures.on_pose(pose, now_ms) {
                    self.head.count_gesture();
                    hub.broadcast(&Feedback::GestureRecognized {
                        name: event.name.as_str().to_string(),
                    });

                    let activation = match self.gestures.action_for(&event.name) {
                        GestureAction::Click => {
                            let pos = self.head.project(surface.viewport());
                            hub.broadcast(&Feedback::HeadClick { pos });
                            Some(Activation::Point { pos })
                        }
                        GestureAction::Cancel => {
                            hub.broadcast(&Feedback::HeadCancel);
                            Some(Activation::Key {
                                key: NavKey::Escape,
                            })
                        }
                        GestureAction::Navigate(direction) => {
                            hub.broadcast(&Feedback::HeadNavigation { direction });
                            Some(Activation::Key {
                                key: nav_key(direction),
                            })
                        }
                        GestureAction::None => None,
                    };

                    if let Some(activation) = activation {
                        outcome = Some(self.dispatcher.dispatch(
                            activation,
                            InputSource::Head,
                            now_ms,
                            surface,
                            hub,
                        ));
                    }
                }
                outcome
            }
            RawSample::Switch(edge) => {
                if !self.ready(InputSource::Switch) {
                    return None;
                }
                let activation = self.scan.on_switch_edge(&edge.code, edge.edge, now_ms, hub)?;
                Some(self.dispatcher.dispatch(
                    activation,
                    InputSource::Switch,
                    now_ms,
                    surface,
                    hub,
                ))
            }
            RawSample::Voice(utterance) => {
                if !self.ready(InputSource::Voice) {
                    return None;
                }
                let activation = self.voice.on_utterance(&utterance, now_ms, hub)?;
                Some(self.dispatcher.dispatch(
                    activation,
                    InputSource::Voice,
                    now_ms,
                    surface,
                    hub,
                ))
            }
        }
    }

    /// Advance every deadline-driven machine. Call from the frame loop.
    pub fn tick(&mut self, now_ms: u64, surface: &mut dyn UiSurface, hub: &mut FeedbackHub) {
        self.dispatcher.tick(now_ms, surface, hub);
        self.scan.tick(now_ms, hub);
        self.calibration.tick(now_ms, hub);
    }

    /// Begin a gaze calibration run over the surface's viewport.
    pub fn start_gaze_calibration(
        &mut self,
        now_ms: u64,
        surface: &dyn UiSurface,
        hub: &mut FeedbackHub,
    ) {
        if !self.ready(InputSource::Gaze) {
            warn!("gaze calibration requested but gaze is not available");
            self.calibration.start(aegis_core::Vec2::ZERO, now_ms, hub);
            return;
        }
        self.calibration.start(surface.viewport(), now_ms, hub);
    }

    /// Whether dwell activations may be dispatched: no run attempted yet
    /// (permissive), or the last run succeeded.
    fn gaze_certified(&self) -> bool {
        match self.calibration.outcome() {
            None => true,
            Some(CalibrationOutcome { success, .. }) => *success,
        }
    }

    /// Stop timed work and drop pending activations (e.g. scene change).
    pub fn suspend(&mut self, hub: &mut FeedbackHub) {
        self.dispatcher.cancel_pending();
        self.scan.stop_scanning(hub);
        self.calibration.cancel();
        self.gaze.clear();
        self.gestures.clear();
    }

    // Front-end accessors for host configuration and inspection.

    pub fn gaze(&self) -> &GazeDwellDetector {
        &self.gaze
    }

    pub fn gaze_mut(&mut self) -> &mut GazeDwellDetector {
        &mut self.gaze
    }

    pub fn calibration(&self) -> &CalibrationEngine {
        &self.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut CalibrationEngine {
        &mut self.calibration
    }

    pub fn head(&self) -> &HeadPoseTracker {
        &self.head
    }

    pub fn head_mut(&mut self) -> &mut HeadPoseTracker {
        &mut self.head
    }

    pub fn gestures(&self) -> &GestureRecognizer {
        &self.gestures
    }

    pub fn gestures_mut(&mut self) -> &mut GestureRecognizer {
        &mut self.gestures
    }

    pub fn scan(&self) -> &ScanEngine {
        &self.scan
    }

    pub fn scan_mut(&mut self) -> &mut ScanEngine {
        &mut self.scan
    }

    pub fn voice(&self) -> &VoiceCommandResolver {
        &self.voice
    }

    pub fn voice_mut(&mut self) -> &mut VoiceCommandResolver {
        &mut self.voice
    }

    pub fn dispatcher_mut(&mut self) -> &mut ActionDispatcher {
        &mut self.dispatcher
    }
}

impl std::fmt::Debug for InputHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputHub")
            .field("statuses", &self.statuses)
            .field("initialized", &self.initialized)
            .finish()
    }
}

fn nav_key(direction: NavDirection) -> NavKey {
    match direction {
        NavDirection::Left => NavKey::ArrowLeft,
        NavDirection::Right => NavKey::ArrowRight,
        NavDirection::Up => NavKey::ArrowUp,
        NavDirection::Down => NavKey::ArrowDown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::{
        ElementFlags, ElementId, ElementKind, Rect, SurfaceError, UiElement, Vec2,
    };

    #[derive(Default)]
    struct TestSurface {
        elements: Vec<UiElement>,
        clicks: Vec<ElementId>,
        keys: Vec<NavKey>,
    }

    impl UiSurface for TestSurface {
        fn viewport(&self) -> Vec2 {
            Vec2::new(800.0, 600.0)
        }

        fn interactive_elements(&self) -> Vec<UiElement> {
            self.elements.clone()
        }

        fn hit_test(&self, point: Vec2) -> Option<UiElement> {
            self.elements
                .iter()
                .rev()
                .find(|el| el.rect.contains(point))
                .cloned()
        }

        fn simulate_click(&mut self, id: ElementId) -> Result<(), SurfaceError> {
            self.clicks.push(id);
            Ok(())
        }

        fn simulate_focus(&mut self, _id: ElementId) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn simulate_key(&mut self, key: NavKey) -> Result<(), SurfaceError> {
            self.keys.push(key);
            Ok(())
        }
    }

    fn all_enabled_config() -> HubConfig {
        let mut config = HubConfig::default();
        config.gaze.enabled = true;
        config.head.enabled = true;
        config.scan.enabled = true;
        config.voice.enabled = true;
        config
    }

    #[test]
    fn missing_camera_disables_gaze_and_head_only() {
        let mut hub = InputHub::new(all_enabled_config());
        let surface = TestSurface::default();
        let mut feedback = FeedbackHub::new();

        let failures = hub.initialize(
            &Capabilities {
                camera: false,
                ..Capabilities::default()
            },
            &surface,
            0,
            &mut feedback,
        );

        assert_eq!(failures.len(), 2);
        assert_eq!(hub.status(InputSource::Gaze), ModalityStatus::Unavailable);
        assert_eq!(hub.status(InputSource::Head), ModalityStatus::Unavailable);
        assert_eq!(hub.status(InputSource::Switch), ModalityStatus::Ready);
        assert_eq!(hub.status(InputSource::Voice), ModalityStatus::Ready);
    }

    #[test]
    fn disabled_modalities_report_off() {
        let mut hub = InputHub::new(HubConfig::default());
        let surface = TestSurface::default();
        let mut feedback = FeedbackHub::new();

        let failures = hub.initialize(&Capabilities::default(), &surface, 0, &mut feedback);

        assert!(failures.is_empty());
        assert_eq!(hub.status(InputSource::Gaze), ModalityStatus::Off);
    }

    #[test]
    fn samples_for_unavailable_modalities_are_dropped() {
        let mut hub = InputHub::new(all_enabled_config());
        let mut surface = TestSurface::default();
        let mut feedback = FeedbackHub::new();
        hub.initialize(
            &Capabilities {
                camera: false,
                ..Capabilities::default()
            },
            &surface,
            0,
            &mut feedback,
        );

        let outcome = hub.process(
            crate::raw::RawSample::gaze(100.0, 100.0),
            0,
            &mut surface,
            &mut feedback,
        );
        assert!(outcome.is_none());
        assert_eq!(hub.gaze().stats().gaze_events, 0);
    }

    #[test]
    fn voice_command_reaches_key_handler() {
        let mut hub = InputHub::new(all_enabled_config());
        let mut surface = TestSurface::default();
        let mut feedback = FeedbackHub::new();
        hub.initialize(&Capabilities::default(), &surface, 0, &mut feedback);

        hub.dispatcher_mut().bind_command(
            aegis_core::CommandAction::Up,
            Box::new(|surface| surface.simulate_key(NavKey::ArrowUp)),
        );

        let outcome = hub.process(
            crate::raw::RawSample::utterance("up", 0.9),
            100,
            &mut surface,
            &mut feedback,
        );

        assert_eq!(outcome, Some(DispatchOutcome::Committed));
        assert_eq!(surface.keys, vec![NavKey::ArrowUp]);
    }

    #[test]
    fn failed_calibration_gates_dwell_dispatch() {
        let mut hub = InputHub::new(all_enabled_config());
        let mut surface = TestSurface::default();
        surface.elements.push(UiElement {
            id: 1,
            kind: ElementKind::Button,
            rect: Rect::from_xywh(80.0, 80.0, 40.0, 40.0),
            flags: ElementFlags::CLICKABLE,
        });
        let mut feedback = FeedbackHub::new();
        hub.initialize(&Capabilities::default(), &surface, 0, &mut feedback);

        // A calibration run where every accuracy sample lands far off
        // target: completes with success = false.
        hub.start_gaze_calibration(0, &surface, &mut feedback);
        let mut now = 0;
        for _ in 0..9 {
            now += 2000;
            hub.tick(now, &mut surface, &mut feedback);
        }
        for _ in 0..9 {
            for _ in 0..10 {
                now += 10;
                hub.process(
                    crate::raw::RawSample::gaze(9999.0, 9999.0),
                    now,
                    &mut surface,
                    &mut feedback,
                );
            }
        }
        assert!(hub.calibration().outcome().is_some());
        assert!(!hub.calibration().is_calibrated());

        // A clean dwell on the button is detected but not dispatched.
        for i in 0..25 {
            hub.process(
                crate::raw::RawSample::gaze(100.0, 100.0),
                now + i * 50,
                &mut surface,
                &mut feedback,
            );
        }
        hub.tick(now + 2000, &mut surface, &mut feedback);
        assert!(hub.gaze().stats().dwell_activations > 0);
        assert!(surface.clicks.is_empty());
    }
}
