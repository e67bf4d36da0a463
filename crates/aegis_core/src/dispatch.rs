//! The shared activation sink.
//!
//! All four front-ends hand their positive decisions to one
//! `ActionDispatcher`, which arbitrates same-tick conflicts, applies the
//! highlight delay, resolves the target element, and performs the actual
//! document mutation through `UiSurface`. Failures stop here: a handler or
//! surface error becomes feedback, never an unwound detector state
//! machine.

use crate::activation::{Activation, CommandAction, InputSource};
use crate::feedback::{Feedback, FeedbackHub};
use crate::sched::{Scheduler, Token};
use crate::surface::{ElementKind, GameHook, SurfaceError, UiElement, UiSurface};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Handler bound to a resolved command action.
pub type CommandHandler = Box<dyn FnMut(&mut dyn UiSurface) -> Result<(), SurfaceError>>;

/// Dispatcher timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Delay between the highlight and the committed activation.
    pub highlight_delay_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            highlight_delay_ms: 100,
        }
    }
}

/// What happened to a dispatch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Committed synchronously (keys, commands).
    Committed,
    /// Parked behind the highlight delay; commits on a later `tick`.
    Scheduled,
    /// Lost same-tick arbitration to an earlier modality.
    Suppressed,
}

struct PendingCommit {
    token: Token,
    activation: Activation,
    source: InputSource,
}

/// Shared sink for all front-end activations.
pub struct ActionDispatcher {
    config: DispatchConfig,
    sched: Scheduler,
    pending: Vec<PendingCommit>,
    last_dispatch_tick: Option<u64>,
    handlers: HashMap<CommandAction, CommandHandler>,
    game_hook: Option<Box<dyn GameHook>>,
}

impl ActionDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            sched: Scheduler::new(),
            pending: Vec::new(),
            last_dispatch_tick: None,
            handlers: HashMap::new(),
            game_hook: None,
        }
    }

    /// Bind a handler to a command action. Rebinding replaces.
    pub fn bind_command(&mut self, action: CommandAction, handler: CommandHandler) {
        self.handlers.insert(action, handler);
    }

    pub fn has_handler(&self, action: CommandAction) -> bool {
        self.handlers.contains_key(&action)
    }

    /// Install the game-element hook.
    pub fn set_game_hook(&mut self, hook: Box<dyn GameHook>) {
        self.game_hook = Some(hook);
    }

    /// Request an activation.
    ///
    /// First-writer-wins within a tick: if another modality already
    /// dispatched at this `now_ms`, the request is dropped and the loser
    /// gets `SuppressedConflict` feedback.
    pub fn dispatch(
        &mut self,
        activation: Activation,
        source: InputSource,
        now_ms: u64,
        surface: &mut dyn UiSurface,
        hub: &mut FeedbackHub,
    ) -> DispatchOutcome {
        if self.last_dispatch_tick == Some(now_ms) {
            warn!(
                source = source.as_str(),
                now_ms, "same-tick activation conflict, suppressing"
            );
            hub.broadcast(&Feedback::SuppressedConflict { source });
            return DispatchOutcome::Suppressed;
        }
        self.last_dispatch_tick = Some(now_ms);

        debug!(source = source.as_str(), ?activation, "dispatch");

        match activation {
            Activation::Key { key } => {
                match surface.simulate_key(key) {
                    Ok(()) => hub.broadcast(&Feedback::ElementActivated { source }),
                    Err(err) => {
                        warn!(%err, "key simulation failed");
                        hub.broadcast(&Feedback::ActivationFailed { source });
                    }
                }
                DispatchOutcome::Committed
            }
            Activation::Command { action } => {
                self.run_command(action, source, surface, hub);
                DispatchOutcome::Committed
            }
            other @ (Activation::Point { .. } | Activation::Element { .. }) => {
                if self.config.highlight_delay_ms == 0 {
                    self.commit(other, source, surface, hub);
                    DispatchOutcome::Committed
                } else {
                    let token = self.sched.schedule_after(now_ms, self.config.highlight_delay_ms);
                    self.pending.push(PendingCommit {
                        token,
                        activation: other,
                        source,
                    });
                    DispatchOutcome::Scheduled
                }
            }
        }
    }

    /// Commit any pending activations whose highlight delay elapsed.
    pub fn tick(&mut self, now_ms: u64, surface: &mut dyn UiSurface, hub: &mut FeedbackHub) {
        for token in self.sched.due(now_ms) {
            if let Some(idx) = self.pending.iter().position(|p| p.token == token) {
                let commit = self.pending.swap_remove(idx);
                self.commit(commit.activation, commit.source, surface, hub);
            }
        }
    }

    /// Drop pending commits (e.g. on front-end shutdown).
    pub fn cancel_pending(&mut self) {
        for commit in self.pending.drain(..) {
            self.sched.cancel(commit.token);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn commit(
        &mut self,
        activation: Activation,
        source: InputSource,
        surface: &mut dyn UiSurface,
        hub: &mut FeedbackHub,
    ) {
        let element = match activation {
            Activation::Point { pos } => surface.hit_test(pos),
            Activation::Element { id } => surface
                .interactive_elements()
                .into_iter()
                .find(|el| el.id == id),
            // Keys and commands never reach the delayed path.
            _ => None,
        };

        let Some(element) = element else {
            debug!(source = source.as_str(), "activation target gone");
            hub.broadcast(&Feedback::ActivationMissed { source });
            return;
        };

        if !element.is_activatable() {
            debug!(
                source = source.as_str(),
                id = element.id,
                "target not activatable"
            );
            hub.broadcast(&Feedback::ActivationMissed { source });
            return;
        }

        match self.activate_element(&element, surface) {
            Ok(()) => hub.broadcast(&Feedback::ElementActivated { source }),
            Err(err) => {
                warn!(%err, id = element.id, "activation failed");
                hub.broadcast(&Feedback::ActivationFailed { source });
            }
        }
    }

    fn activate_element(
        &mut self,
        element: &UiElement,
        surface: &mut dyn UiSurface,
    ) -> Result<(), SurfaceError> {
        match element.kind {
            ElementKind::Input => surface.simulate_focus(element.id),
            ElementKind::GameElement => {
                if let Some(hook) = &mut self.game_hook {
                    hook.on_game_element(element);
                    Ok(())
                } else {
                    surface.simulate_click(element.id)
                }
            }
            ElementKind::Button | ElementKind::Link | ElementKind::Generic => {
                surface.simulate_click(element.id)
            }
        }
    }

    fn run_command(
        &mut self,
        action: CommandAction,
        source: InputSource,
        surface: &mut dyn UiSurface,
        hub: &mut FeedbackHub,
    ) {
        let Some(handler) = self.handlers.get_mut(&action) else {
            warn!(?action, "no handler bound for command");
            hub.broadcast(&Feedback::NoHandler { action });
            return;
        };

        match handler(surface) {
            Ok(()) => {
                debug!(?action, source = source.as_str(), "command executed");
                hub.broadcast(&Feedback::CommandExecuted { action });
                hub.speak(action.spoken_response());
            }
            Err(err) => {
                warn!(%err, ?action, "command handler failed");
                hub.broadcast(&Feedback::CommandFailed { action });
            }
        }
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("pending", &self.pending.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
