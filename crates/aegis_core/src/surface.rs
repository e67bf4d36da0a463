//! The UI surface abstraction.
//!
//! The live document is shared with the host and every front-end reads it;
//! this trait is the only window onto it. Front-ends query and hit-test,
//! and only the dispatcher mutates (via `simulate_*`). The core never
//! assumes exclusive ownership of the document.

use crate::activation::NavKey;
use crate::types::{Rect, Vec2};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Opaque identifier for an interactive element in the host document.
pub type ElementId = u64;

/// Broad element role, used for activation routing and role-based scan
/// grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Button or button-like control - activation clicks it.
    Button,
    /// Hyperlink - activation clicks it.
    Link,
    /// Text input / select / textarea - activation focuses it.
    Input,
    /// In-game interactive object (bubble) - activation goes through the
    /// game hook.
    GameElement,
    /// Anything else on the interactive allow-list.
    Generic,
}

bitflags! {
    /// Affordances of an interactive element.
    ///
    /// Flags are additive; the dispatcher checks which are set before
    /// committing an activation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ElementFlags: u8 {
        /// Responds to a simulated click.
        const CLICKABLE = 1 << 0;

        /// Can receive keyboard focus.
        const FOCUSABLE = 1 << 1;

        /// Currently disabled; never activated, skipped by scanning.
        const DISABLED = 1 << 2;

        /// Carries an explicit activation marker (tabindex, onclick,
        /// pointer cursor) rather than an intrinsically interactive tag.
        const MARKED = 1 << 3;
    }
}

impl Default for ElementFlags {
    fn default() -> Self {
        ElementFlags::CLICKABLE
    }
}

/// Snapshot of one interactive element, as returned by the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct UiElement {
    pub id: ElementId,
    pub kind: ElementKind,
    pub rect: Rect,
    pub flags: ElementFlags,
}

impl UiElement {
    /// Whether an activation may be committed against this element.
    pub fn is_activatable(&self) -> bool {
        !self.flags.contains(ElementFlags::DISABLED)
            && (self
                .flags
                .intersects(ElementFlags::CLICKABLE | ElementFlags::FOCUSABLE | ElementFlags::MARKED))
    }
}

/// Error from a surface mutation.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("element {0} no longer exists")]
    ElementGone(ElementId),

    #[error("element {0} is not activatable")]
    NotActivatable(ElementId),

    #[error("surface rejected the action: {0}")]
    Rejected(String),
}

/// Read/query/mutate window onto the host document.
///
/// Enumeration results are snapshots: elements may disappear between a
/// query and a later `simulate_*` call, which then fails with
/// `SurfaceError::ElementGone` rather than acting on stale state.
pub trait UiSurface {
    /// Current viewport size in pixels.
    fn viewport(&self) -> Vec2;

    /// All interactive elements currently in the document, in document
    /// order, per the fixed selector allow-list.
    fn interactive_elements(&self) -> Vec<UiElement>;

    /// Topmost interactive element under the point, if any.
    fn hit_test(&self, point: Vec2) -> Option<UiElement>;

    /// Simulate a primary click on the element.
    fn simulate_click(&mut self, id: ElementId) -> Result<(), SurfaceError>;

    /// Move keyboard focus to the element.
    fn simulate_focus(&mut self, id: ElementId) -> Result<(), SurfaceError>;

    /// Synthesize a key press at the document level.
    fn simulate_key(&mut self, key: NavKey) -> Result<(), SurfaceError>;
}

/// Host hook for game-specific activation (bubble pop etc.).
///
/// Separate from `UiSurface` so the game engine can be plugged in
/// independently of the document binding.
pub trait GameHook {
    fn on_game_element(&mut self, element: &UiElement);
}
