//! Activation contract and shared dispatch for AEGIS alternative input.
//!
//! This crate is the contract layer between the modality front-ends
//! (`aegis_input`) and the host application. It defines:
//!
//! 1. **Geometry** - `Vec2`/`Vec3`/`Rect` primitives
//! 2. **Activations** - the discrete actions front-ends request
//! 3. **The surface** - the `UiSurface` trait the host document hides
//!    behind; the core reads and hit-tests, only the dispatcher mutates
//! 4. **Dispatch** - the single shared `ActionDispatcher` sink with
//!    same-tick arbitration and the highlight delay
//! 5. **Feedback** - uniform fire-and-forget fan-out to
//!    visual/audio/haptic/speech sinks
//! 6. **Time** - `Clock` and `Scheduler`, so every timed path can be
//!    driven with virtual time in tests
//!
//! # Architecture
//!
//! ```text
//! Gaze   ─┐
//! Head   ─┼──► Activation ──► ActionDispatcher ──► UiSurface (host doc)
//! Switch ─┤                        │
//! Voice  ─┘                        ▼
//!                             FeedbackHub ──► visual / audio / haptic / speech
//! ```
//!
//! Everything is single-threaded and tick-driven: the host pushes raw
//! samples into the front-ends and calls `tick(now_ms)` from its frame
//! loop. No locks, no async runtime.

mod activation;
mod dispatch;
mod feedback;
mod sched;
mod surface;
mod types;

pub use activation::{Activation, CommandAction, InputSource, NavKey, SwitchActionKind};
pub use dispatch::{ActionDispatcher, CommandHandler, DispatchConfig, DispatchOutcome};
pub use feedback::{Feedback, FeedbackHub, FeedbackSink, NavDirection, SpeechSink};
pub use sched::{Clock, ManualClock, Scheduler, SystemClock, Token};
pub use surface::{
    ElementFlags, ElementId, ElementKind, GameHook, SurfaceError, UiElement, UiSurface,
};
pub use types::{Axis, Rect, Vec2, Vec3};
