//! The activation contract - the discrete action a front-end requests.
//!
//! Every front-end's positive decision (dwell complete, gesture matched,
//! scan selection, command resolved) reduces to one `Activation` handed to
//! the shared dispatcher. Front-ends never touch the document directly.

use crate::surface::ElementId;
use crate::types::Vec2;
use serde::{Deserialize, Serialize};

/// Which front-end produced an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSource {
    Gaze,
    Head,
    Switch,
    Voice,
}

impl InputSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputSource::Gaze => "gaze",
            InputSource::Head => "head",
            InputSource::Switch => "switch",
            InputSource::Voice => "voice",
        }
    }
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for InputSource {}

/// A discrete activation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Activation {
    /// Activate whatever interactive element is under the point
    /// (gaze dwell, head-gesture click). Hit-tested at commit time.
    Point { pos: Vec2 },

    /// Activate a pre-resolved element (scan selection).
    Element { id: ElementId },

    /// Simulate a key press (gesture shake -> Escape, tilt -> arrows).
    Key { key: NavKey },

    /// Run the handler bound to a resolved voice command.
    Command { action: CommandAction },
}

/// Logical role of a physical switch press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchActionKind {
    Primary,
    Secondary,
    Cancel,
}

/// Keys the subsystem is allowed to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavKey {
    Escape,
    Enter,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

/// Built-in command actions resolvable from voice phrases.
///
/// This is a closed set; hosts extend behavior by binding handlers to
/// actions (and phrases to actions) at startup rather than inventing
/// stringly-typed commands at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Click,
    Pop,
    Select,
    Back,
    Next,
    Menu,
    Pause,
    Resume,
    Up,
    Down,
    Left,
    Right,
    Start,
    Stop,
    Yes,
    No,
    Cancel,
    Help,
    UseItem,
    ShowScore,
    ShowTime,
    ShowSettings,
    NewGame,
    ContinueGame,
    Settings,
    Exit,
    Volume,
    VoiceSettings,
    DisplaySettings,
    SaveSettings,
    ResetSettings,
}

impl CommandAction {
    /// Spoken confirmation for the action, fed to the speech sink on
    /// successful execution.
    pub fn spoken_response(&self) -> &'static str {
        match self {
            CommandAction::Click => "Clicked",
            CommandAction::Pop => "Popped",
            CommandAction::Select => "Selected",
            CommandAction::Back => "Going back",
            CommandAction::Next => "Moving on",
            CommandAction::Menu => "Opening the menu",
            CommandAction::Pause => "Game paused",
            CommandAction::Resume => "Game resumed",
            CommandAction::Up => "Moving up",
            CommandAction::Down => "Moving down",
            CommandAction::Left => "Moving left",
            CommandAction::Right => "Moving right",
            CommandAction::Start => "Started",
            CommandAction::Stop => "Stopped",
            CommandAction::Yes => "Yes",
            CommandAction::No => "No",
            CommandAction::Cancel => "Cancelled",
            CommandAction::Help => "Showing help",
            CommandAction::UseItem => "Item used",
            CommandAction::ShowScore => "Showing the score",
            CommandAction::ShowTime => "Showing the time",
            CommandAction::ShowSettings => "Showing settings",
            CommandAction::NewGame => "Starting a new game",
            CommandAction::ContinueGame => "Continuing the game",
            CommandAction::Settings => "Opening settings",
            CommandAction::Exit => "Exiting the game",
            CommandAction::Volume => "Volume settings",
            CommandAction::VoiceSettings => "Voice settings",
            CommandAction::DisplaySettings => "Display settings",
            CommandAction::SaveSettings => "Settings saved",
            CommandAction::ResetSettings => "Settings reset",
        }
    }
}

impl Activation {
    /// Convenience constructor for a point activation.
    pub fn at(x: f32, y: f32) -> Self {
        Activation::Point {
            pos: Vec2::new(x, y),
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Activation::Point { .. })
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Activation::Element { .. })
    }
}
