//! Switch-scanning: element grouping, the timer-driven cursor, and
//! press/hold discrimination.
//!
//! Two independent machines. Grouping partitions the document's
//! interactive elements into ordered groups; scanning walks a
//! `(group, element)` cursor through them on a repeating deadline. Switch
//! semantics are decoupled from the timer: taps and holds act on whatever
//! the cursor currently highlights.

use crate::config::{ScanConfig, ScanPattern};
use crate::raw::Edge;
use aegis_core::{
    Activation, ElementKind, Feedback, FeedbackHub, Scheduler, SwitchActionKind, Token, UiElement,
    UiSurface,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Session counters for the switch front-end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub switch_activations: u64,
    pub scanning_cycles: u64,
    pub successful_selections: u64,
}

#[derive(Debug)]
struct PressState {
    action: SwitchActionKind,
    pressed_at_ms: u64,
    hold_token: Token,
    hold_fired: bool,
}

/// Timer-driven scanning over grouped interactive elements.
#[derive(Debug)]
pub struct ScanEngine {
    config: ScanConfig,
    groups: Vec<Vec<UiElement>>,
    scanning: bool,
    group_index: usize,
    element_index: usize,
    sched: Scheduler,
    advance_token: Option<Token>,
    press: Option<PressState>,
    stats: ScanStats,
}

impl ScanEngine {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            groups: Vec::new(),
            scanning: false,
            group_index: 0,
            element_index: 0,
            sched: Scheduler::new(),
            advance_token: None,
            press: None,
            stats: ScanStats::default(),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ScanConfig) {
        self.config = config;
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.group_index, self.element_index)
    }

    pub fn group_sizes(&self) -> Vec<usize> {
        self.groups.iter().map(|g| g.len()).collect()
    }

    /// Element the cursor currently highlights.
    pub fn current_element(&self) -> Option<&UiElement> {
        self.groups.get(self.group_index)?.get(self.element_index)
    }

    /// Re-collect interactive elements and rebuild groups. The cursor
    /// resets; elements are snapshots, so call this when the scene
    /// changes.
    pub fn rebuild_groups(&mut self, surface: &dyn UiSurface) {
        let elements: Vec<UiElement> = surface
            .interactive_elements()
            .into_iter()
            .filter(|el| el.is_activatable())
            .collect();

        self.groups = match self.config.scan_pattern {
            ScanPattern::Linear => {
                if elements.is_empty() {
                    Vec::new()
                } else {
                    vec![elements]
                }
            }
            ScanPattern::Group => group_by_band(elements, surface.viewport().y),
            ScanPattern::Custom => group_by_role(elements),
        };
        self.group_index = 0;
        self.element_index = 0;

        debug!(
            groups = self.groups.len(),
            elements = self.group_sizes().iter().sum::<usize>(),
            "scan groups rebuilt"
        );
    }

    /// Start the scanning timer and highlight the first element.
    pub fn start_scanning(&mut self, now_ms: u64, hub: &mut FeedbackHub) {
        if self.scanning || self.groups.is_empty() {
            return;
        }

        self.scanning = true;
        self.group_index = 0;
        self.element_index = 0;
        self.stats.scanning_cycles += 1;

        self.highlight(hub);
        self.advance_token = Some(self.sched.schedule_after(now_ms, self.config.scan_speed_ms));

        info!("scanning started");
        hub.broadcast(&Feedback::ScanningStarted);
    }

    /// Stop the timer and drop the highlight.
    pub fn stop_scanning(&mut self, hub: &mut FeedbackHub) {
        if !self.scanning {
            return;
        }

        self.scanning = false;
        if let Some(token) = self.advance_token.take() {
            self.sched.cancel(token);
        }

        info!("scanning stopped");
        hub.broadcast(&Feedback::ScanningStopped);
    }

    pub fn toggle_scanning(&mut self, now_ms: u64, hub: &mut FeedbackHub) {
        if self.scanning {
            self.stop_scanning(hub);
        } else {
            self.start_scanning(now_ms, hub);
        }
    }

    /// Advance deadlines: the scan cursor and any pending hold check.
    pub fn tick(&mut self, now_ms: u64, hub: &mut FeedbackHub) {
        for token in self.sched.due(now_ms) {
            if self.advance_token == Some(token) {
                self.advance(hub);
                self.advance_token =
                    Some(self.sched.schedule_after(now_ms, self.config.scan_speed_ms));
                continue;
            }

            let hold_action = match &mut self.press {
                Some(press) if press.hold_token == token && !press.hold_fired => {
                    press.hold_fired = true;
                    Some(press.action)
                }
                _ => None,
            };
            if let Some(action) = hold_action {
                self.fire_hold(action, now_ms, hub);
            }
        }
    }

    /// Process one switch edge. Returns the element activation when a
    /// primary tap selects the highlighted element.
    pub fn on_switch_edge(
        &mut self,
        code: &str,
        edge: Edge,
        now_ms: u64,
        hub: &mut FeedbackHub,
    ) -> Option<Activation> {
        if !self.config.enabled {
            return None;
        }
        let action = self.config.lookup_switch(code)?;

        match edge {
            Edge::Down => {
                // One press at a time; chords are not a thing here.
                if self.press.is_none() {
                    let hold_token = self.sched.schedule_after(now_ms, self.config.dwell_time_ms);
                    self.press = Some(PressState {
                        action,
                        pressed_at_ms: now_ms,
                        hold_token,
                        hold_fired: false,
                    });
                }
                None
            }
            Edge::Up => {
                let press = self.press.take()?;
                if press.action != action {
                    // Release of a switch we were not tracking.
                    self.press = Some(press);
                    return None;
                }
                self.sched.cancel(press.hold_token);

                if press.hold_fired {
                    // The hold action already fired; the release is spent.
                    return None;
                }

                let held_ms = now_ms.saturating_sub(press.pressed_at_ms);
                if held_ms < self.config.activation_time_ms {
                    debug!(held_ms, "switch press below activation time, ignored");
                    return None;
                }

                self.stats.switch_activations += 1;
                hub.broadcast(&Feedback::SwitchActivated { action });
                self.fire_tap(action, now_ms, hub)
            }
        }
    }

    fn fire_tap(
        &mut self,
        action: SwitchActionKind,
        now_ms: u64,
        hub: &mut FeedbackHub,
    ) -> Option<Activation> {
        match action {
            SwitchActionKind::Primary => {
                if self.scanning {
                    self.select_current(hub)
                } else {
                    self.start_scanning(now_ms, hub);
                    None
                }
            }
            SwitchActionKind::Secondary => {
                if self.scanning {
                    self.move_to_next_group(hub);
                } else {
                    hub.broadcast(&Feedback::AlternateMenuRequested);
                }
                None
            }
            SwitchActionKind::Cancel => {
                if self.scanning {
                    self.stop_scanning(hub);
                } else {
                    hub.broadcast(&Feedback::NavigationPopRequested);
                }
                None
            }
        }
    }

    fn fire_hold(&mut self, action: SwitchActionKind, now_ms: u64, hub: &mut FeedbackHub) {
        debug!(?action, "switch hold");
        match action {
            SwitchActionKind::Primary => self.toggle_scanning(now_ms, hub),
            SwitchActionKind::Secondary => hub.broadcast(&Feedback::ContextMenuRequested),
            SwitchActionKind::Cancel => {}
        }
    }

    fn select_current(&mut self, hub: &mut FeedbackHub) -> Option<Activation> {
        let element = self.current_element()?.clone();
        self.stats.successful_selections += 1;
        self.stop_scanning(hub);
        debug!(id = element.id, "scan selection");
        Some(Activation::Element { id: element.id })
    }

    fn advance(&mut self, hub: &mut FeedbackHub) {
        let Some(group) = self.groups.get(self.group_index) else {
            return;
        };
        if group.is_empty() {
            return;
        }

        self.element_index = (self.element_index + 1) % group.len();
        // Wrapping past the end of a group rolls to the next group.
        if self.element_index == 0 && self.groups.len() > 1 {
            self.group_index = (self.group_index + 1) % self.groups.len();
        }

        self.highlight(hub);
    }

    fn move_to_next_group(&mut self, hub: &mut FeedbackHub) {
        if self.groups.len() <= 1 {
            return;
        }
        self.group_index = (self.group_index + 1) % self.groups.len();
        self.element_index = 0;
        self.highlight(hub);
        hub.broadcast(&Feedback::GroupChanged);
    }

    fn highlight(&self, hub: &mut FeedbackHub) {
        if let Some(element) = self.current_element() {
            hub.broadcast(&Feedback::ScanHighlight { rect: element.rect });
        }
    }
}

/// Partition into top/middle/bottom viewport thirds; empty bands dropped.
fn group_by_band(elements: Vec<UiElement>, viewport_height: f32) -> Vec<Vec<UiElement>> {
    let mut top = Vec::new();
    let mut middle = Vec::new();
    let mut bottom = Vec::new();

    for element in elements {
        let center_y = element.rect.center().y;
        if center_y < viewport_height / 3.0 {
            top.push(element);
        } else if center_y < viewport_height * 2.0 / 3.0 {
            middle.push(element);
        } else {
            bottom.push(element);
        }
    }

    [top, middle, bottom]
        .into_iter()
        .filter(|g| !g.is_empty())
        .collect()
}

/// Partition by role: game elements, buttons, inputs, everything else, in
/// that priority order; empty buckets dropped.
fn group_by_role(elements: Vec<UiElement>) -> Vec<Vec<UiElement>> {
    let mut game = Vec::new();
    let mut buttons = Vec::new();
    let mut inputs = Vec::new();
    let mut rest = Vec::new();

    for element in elements {
        match element.kind {
            ElementKind::GameElement => game.push(element),
            ElementKind::Button => buttons.push(element),
            ElementKind::Input => inputs.push(element),
            ElementKind::Link | ElementKind::Generic => rest.push(element),
        }
    }

    [game, buttons, inputs, rest]
        .into_iter()
        .filter(|g| !g.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::{ElementFlags, ElementId, NavKey, Rect, SurfaceError, Vec2};

    struct FixtureSurface {
        elements: Vec<UiElement>,
        viewport: Vec2,
    }

    impl UiSurface for FixtureSurface {
        fn viewport(&self) -> Vec2 {
            self.viewport
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

        fn simulate_click(&mut self, _id: ElementId) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn simulate_focus(&mut self, _id: ElementId) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn simulate_key(&mut self, _key: NavKey) -> Result<(), SurfaceError> {
            Ok(())
        }
    }

    fn element(id: ElementId, kind: ElementKind, y: f32) -> UiElement {
        UiElement {
            id,
            kind,
            rect: Rect::from_xywh(10.0, y, 50.0, 20.0),
            flags: ElementFlags::CLICKABLE,
        }
    }

    /// Three game elements and two buttons: role grouping gives groups of
    /// sizes 3 and 2.
    fn fixture_3_2() -> FixtureSurface {
        FixtureSurface {
            elements: vec![
                element(1, ElementKind::GameElement, 10.0),
                element(2, ElementKind::GameElement, 40.0),
                element(3, ElementKind::GameElement, 70.0),
                element(4, ElementKind::Button, 500.0),
                element(5, ElementKind::Button, 530.0),
            ],
            viewport: Vec2::new(800.0, 600.0),
        }
    }

    fn engine(pattern: ScanPattern) -> ScanEngine {
        ScanEngine::new(ScanConfig {
            enabled: true,
            scan_pattern: pattern,
            auto_start: false,
            ..ScanConfig::default()
        })
    }

    #[test]
    fn scan_wrap_visits_groups_in_order() {
        let surface = fixture_3_2();
        let mut engine = engine(ScanPattern::Custom);
        let mut hub = FeedbackHub::new();
        engine.rebuild_groups(&surface);
        assert_eq!(engine.group_sizes(), vec![3, 2]);

        engine.start_scanning(0, &mut hub);
        assert_eq!(engine.cursor(), (0, 0));

        let mut visited = Vec::new();
        for _ in 0..5 {
            engine.advance(&mut hub);
            visited.push(engine.cursor());
        }
        assert_eq!(visited, vec![(0, 1), (0, 2), (1, 0), (1, 1), (0, 0)]);
    }

    #[test]
    fn timer_drives_the_cursor() {
        let surface = fixture_3_2();
        let mut engine = engine(ScanPattern::Custom);
        let mut hub = FeedbackHub::new();
        engine.rebuild_groups(&surface);

        engine.start_scanning(0, &mut hub);
        engine.tick(1999, &mut hub);
        assert_eq!(engine.cursor(), (0, 0));

        engine.tick(2000, &mut hub);
        assert_eq!(engine.cursor(), (0, 1));

        engine.tick(4000, &mut hub);
        assert_eq!(engine.cursor(), (0, 2));
    }

    #[test]
    fn tap_boundaries() {
        let surface = fixture_3_2();
        let mut engine = engine(ScanPattern::Custom);
        let mut hub = FeedbackHub::new();
        engine.rebuild_groups(&surface);

        // Release 1 ms below the activation time: noise, nothing starts.
        engine.on_switch_edge("space", Edge::Down, 0, &mut hub);
        engine.on_switch_edge("space", Edge::Up, 99, &mut hub);
        assert!(!engine.is_scanning());

        // Release 1 ms past the activation time: scanning starts.
        engine.on_switch_edge("space", Edge::Down, 1000, &mut hub);
        engine.on_switch_edge("space", Edge::Up, 1101, &mut hub);
        assert!(engine.is_scanning());
    }

    #[test]
    fn primary_tap_selects_while_scanning() {
        let surface = fixture_3_2();
        let mut engine = engine(ScanPattern::Custom);
        let mut hub = FeedbackHub::new();
        engine.rebuild_groups(&surface);

        engine.start_scanning(0, &mut hub);
        engine.tick(2000, &mut hub); // cursor at (0, 1) = element 2

        engine.on_switch_edge("space", Edge::Down, 2100, &mut hub);
        let activation = engine.on_switch_edge("space", Edge::Up, 2300, &mut hub);

        assert_eq!(activation, Some(Activation::Element { id: 2 }));
        assert!(!engine.is_scanning());
        assert_eq!(engine.stats().successful_selections, 1);
    }

    #[test]
    fn hold_fires_once_and_suppresses_the_tap() {
        let surface = fixture_3_2();
        let mut engine = engine(ScanPattern::Custom);
        let mut hub = FeedbackHub::new();
        engine.rebuild_groups(&surface);

        // Primary hold from idle: at the dwell boundary scanning toggles
        // on...
        engine.on_switch_edge("space", Edge::Down, 0, &mut hub);
        engine.tick(1000, &mut hub);
        assert!(engine.is_scanning());

        // ...and the release long after does not also fire the tap (which
        // would select-and-stop).
        let activation = engine.on_switch_edge("space", Edge::Up, 1500, &mut hub);
        assert_eq!(activation, None);
        assert!(engine.is_scanning());
        assert_eq!(engine.stats().switch_activations, 0);
    }

    #[test]
    fn secondary_tap_advances_group_while_scanning() {
        let surface = fixture_3_2();
        let mut engine = engine(ScanPattern::Custom);
        let mut hub = FeedbackHub::new();
        engine.rebuild_groups(&surface);
        engine.start_scanning(0, &mut hub);

        engine.on_switch_edge("enter", Edge::Down, 100, &mut hub);
        engine.on_switch_edge("enter", Edge::Up, 300, &mut hub);

        assert_eq!(engine.cursor(), (1, 0));
    }

    #[test]
    fn cancel_tap_stops_scanning() {
        let surface = fixture_3_2();
        let mut engine = engine(ScanPattern::Custom);
        let mut hub = FeedbackHub::new();
        engine.rebuild_groups(&surface);
        engine.start_scanning(0, &mut hub);

        engine.on_switch_edge("escape", Edge::Down, 100, &mut hub);
        engine.on_switch_edge("escape", Edge::Up, 300, &mut hub);

        assert!(!engine.is_scanning());
    }

    #[test]
    fn band_grouping_drops_empty_bands() {
        let surface = FixtureSurface {
            elements: vec![
                element(1, ElementKind::Button, 10.0),   // top third
                element(2, ElementKind::Button, 30.0),   // top third
                element(3, ElementKind::Button, 550.0),  // bottom third
            ],
            viewport: Vec2::new(800.0, 600.0),
        };
        let mut engine = engine(ScanPattern::Group);
        engine.rebuild_groups(&surface);

        // Middle band is empty and dropped.
        assert_eq!(engine.group_sizes(), vec![2, 1]);
    }

    #[test]
    fn linear_grouping_is_one_group_in_document_order() {
        let surface = fixture_3_2();
        let mut engine = engine(ScanPattern::Linear);
        engine.rebuild_groups(&surface);
        assert_eq!(engine.group_sizes(), vec![5]);
    }

    #[test]
    fn disabled_elements_are_skipped() {
        let mut surface = fixture_3_2();
        surface.elements[0].flags |= ElementFlags::DISABLED;
        let mut engine = engine(ScanPattern::Linear);
        engine.rebuild_groups(&surface);
        assert_eq!(engine.group_sizes(), vec![4]);
    }

    #[test]
    fn unmapped_codes_are_ignored() {
        let surface = fixture_3_2();
        let mut engine = engine(ScanPattern::Custom);
        let mut hub = FeedbackHub::new();
        engine.rebuild_groups(&surface);

        engine.on_switch_edge("tab", Edge::Down, 0, &mut hub);
        assert!(engine
            .on_switch_edge("tab", Edge::Up, 200, &mut hub)
            .is_none());
        assert!(!engine.is_scanning());
    }
}
