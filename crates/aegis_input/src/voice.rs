//! Voice command resolution.
//!
//! Per finalized utterance: gate on recognizer confidence, normalize,
//! try an exact substring match over the ordered phrase tables (global
//! first, then the current context's overlay), then fall back to fuzzy
//! similarity with a strict threshold. Unresolved utterances get feedback
//! and a spoken apology; nothing is dispatched for them.
//!
//! Table order is significant on both match paths: the first matching
//! entry wins, so the preferred phrasing of ambiguous commands belongs
//! earlier in the table.

use crate::config::VoiceConfig;
use crate::raw::Utterance;
use crate::similarity;
use crate::UTTERANCE_HISTORY_LIMIT;
use aegis_core::{Activation, CommandAction, Feedback, FeedbackHub};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

/// UI context scoping contextual phrase overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceContext {
    Default,
    Game,
    Menu,
    Settings,
}

/// A finalized utterance kept in the short history ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedUtterance {
    pub transcript: String,
    pub confidence: f64,
    pub timestamp_ms: u64,
}

/// Upstream recognizer failure, mapped to user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionErrorKind {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    Other,
}

/// Session counters for the voice front-end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceStats {
    pub utterances: u64,
    pub commands_resolved: u64,
    pub average_confidence: f64,
}

/// Layered phrase -> command resolution over finalized utterances.
#[derive(Debug)]
pub struct VoiceCommandResolver {
    config: VoiceConfig,
    contextual: Vec<(VoiceContext, Vec<(String, CommandAction)>)>,
    context: VoiceContext,
    listening: bool,
    history: VecDeque<RecognizedUtterance>,
    last_command: Option<CommandAction>,
    stats: VoiceStats,
}

impl VoiceCommandResolver {
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            config,
            contextual: default_contextual_commands(),
            context: VoiceContext::Default,
            listening: false,
            history: VecDeque::with_capacity(UTTERANCE_HISTORY_LIMIT),
            last_command: None,
            stats: VoiceStats::default(),
        }
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: VoiceConfig) {
        self.config = config;
    }

    /// Switch the contextual overlay. Global phrases stay available.
    pub fn set_context(&mut self, context: VoiceContext) {
        debug!(?context, "voice context changed");
        self.context = context;
    }

    pub fn context(&self) -> VoiceContext {
        self.context
    }

    /// Append or replace a phrase in a context overlay.
    pub fn bind_context_phrase(
        &mut self,
        context: VoiceContext,
        phrase: &str,
        action: CommandAction,
    ) {
        let idx = match self.contextual.iter().position(|(c, _)| *c == context) {
            Some(idx) => idx,
            None => {
                self.contextual.push((context, Vec::new()));
                self.contextual.len() - 1
            }
        };
        let overlay = &mut self.contextual[idx].1;
        if let Some(entry) = overlay.iter_mut().find(|(p, _)| p == phrase) {
            entry.1 = action;
        } else {
            overlay.push((phrase.to_string(), action));
        }
    }

    pub fn start_listening(&mut self, hub: &mut FeedbackHub) {
        if !self.listening {
            self.listening = true;
            hub.broadcast(&Feedback::ListeningStarted);
        }
    }

    pub fn stop_listening(&mut self, hub: &mut FeedbackHub) {
        if self.listening {
            self.listening = false;
            hub.broadcast(&Feedback::ListeningStopped);
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn last_command(&self) -> Option<CommandAction> {
        self.last_command
    }

    /// Recent finalized utterances, oldest first (capped at 5).
    pub fn history(&self) -> impl Iterator<Item = &RecognizedUtterance> {
        self.history.iter()
    }

    pub fn stats(&self) -> VoiceStats {
        self.stats
    }

    /// Map an upstream recognizer failure to feedback. Never fatal.
    pub fn on_recognition_error(&mut self, kind: RecognitionErrorKind, hub: &mut FeedbackHub) {
        warn!(?kind, "speech recognition error");
        hub.broadcast(&match kind {
            RecognitionErrorKind::NoSpeech => Feedback::NoSpeech,
            RecognitionErrorKind::AudioCapture => Feedback::MicrophoneError,
            RecognitionErrorKind::NotAllowed => Feedback::PermissionDenied,
            RecognitionErrorKind::Network => Feedback::NetworkError,
            RecognitionErrorKind::Other => Feedback::RecognitionError,
        });
    }

    /// Resolve one recognizer result. Interim results are ignored.
    ///
    /// Returns the command activation to dispatch on resolution.
    pub fn on_utterance(
        &mut self,
        utterance: &Utterance,
        now_ms: u64,
        hub: &mut FeedbackHub,
    ) -> Option<Activation> {
        if !self.config.enabled || !utterance.is_final {
            return None;
        }

        self.stats.utterances += 1;
        let n = self.stats.utterances as f64;
        self.stats.average_confidence =
            self.stats.average_confidence + (utterance.confidence - self.stats.average_confidence) / n;

        self.history.push_back(RecognizedUtterance {
            transcript: utterance.transcript.clone(),
            confidence: utterance.confidence,
            timestamp_ms: now_ms,
        });
        while self.history.len() > UTTERANCE_HISTORY_LIMIT {
            self.history.pop_front();
        }

        if utterance.confidence < self.config.confidence_threshold {
            debug!(
                confidence = utterance.confidence,
                "utterance below confidence threshold"
            );
            hub.broadcast(&Feedback::LowConfidence {
                confidence: utterance.confidence,
            });
            return None;
        }

        let transcript = normalize(&utterance.transcript);

        let resolved = self
            .exact_match(&transcript)
            .or_else(|| self.fuzzy_match(&transcript));

        match resolved {
            Some(action) => {
                debug!(?action, %transcript, "command resolved");
                self.stats.commands_resolved += 1;
                self.last_command = Some(action);
                Some(Activation::Command { action })
            }
            None => {
                debug!(%transcript, "unknown command");
                hub.broadcast(&Feedback::UnknownCommand {
                    transcript: transcript.clone(),
                });
                hub.speak(&format!("Sorry, I didn't recognize \"{transcript}\"."));
                None
            }
        }
    }

    /// First phrase table entry contained in the transcript, global
    /// entries before contextual ones.
    fn exact_match(&self, transcript: &str) -> Option<CommandAction> {
        self.phrase_entries()
            .find(|(phrase, _)| transcript.contains(phrase.to_lowercase().as_str()))
            .map(|(_, action)| action)
    }

    /// First phrase whose similarity to the transcript strictly exceeds
    /// the threshold.
    fn fuzzy_match(&self, transcript: &str) -> Option<CommandAction> {
        let threshold = self.config.similarity_threshold;
        self.phrase_entries()
            .find(|(phrase, _)| similarity::exceeds(transcript, &phrase.to_lowercase(), threshold))
            .map(|(_, action)| action)
    }

    fn phrase_entries(&self) -> impl Iterator<Item = (&String, CommandAction)> {
        let overlay = self
            .contextual
            .iter()
            .find(|(c, _)| *c == self.context)
            .map(|(_, overlay)| overlay.as_slice())
            .unwrap_or(&[]);

        self.config
            .commands
            .iter()
            .chain(overlay.iter())
            .map(|(phrase, action)| (phrase, *action))
    }
}

/// NFKC-normalize, trim, and lower-case a transcript.
fn normalize(transcript: &str) -> String {
    transcript.nfkc().collect::<String>().trim().to_lowercase()
}

/// Built-in contextual overlays.
pub fn default_contextual_commands() -> Vec<(VoiceContext, Vec<(String, CommandAction)>)> {
    let entries = |pairs: &[(&str, CommandAction)]| {
        pairs
            .iter()
            .map(|(p, a)| (p.to_string(), *a))
            .collect::<Vec<_>>()
    };

    vec![
        (VoiceContext::Default, Vec::new()),
        (
            VoiceContext::Game,
            entries(&[
                ("use item", CommandAction::UseItem),
                ("item", CommandAction::UseItem),
                ("score", CommandAction::ShowScore),
                ("time", CommandAction::ShowTime),
                ("settings", CommandAction::ShowSettings),
            ]),
        ),
        (
            VoiceContext::Menu,
            entries(&[
                ("new game", CommandAction::NewGame),
                ("continue", CommandAction::ContinueGame),
                ("settings", CommandAction::Settings),
                ("help", CommandAction::Help),
                ("exit", CommandAction::Exit),
            ]),
        ),
        (
            VoiceContext::Settings,
            entries(&[
                ("volume", CommandAction::Volume),
                ("voice settings", CommandAction::VoiceSettings),
                ("display settings", CommandAction::DisplaySettings),
                ("save", CommandAction::SaveSettings),
                ("reset", CommandAction::ResetSettings),
            ]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> VoiceCommandResolver {
        VoiceCommandResolver::new(VoiceConfig {
            enabled: true,
            ..VoiceConfig::default()
        })
    }

    fn resolve(
        resolver: &mut VoiceCommandResolver,
        transcript: &str,
        confidence: f64,
    ) -> Option<CommandAction> {
        let utterance = Utterance {
            transcript: transcript.to_string(),
            confidence,
            is_final: true,
        };
        let mut hub = FeedbackHub::new();
        match resolver.on_utterance(&utterance, 0, &mut hub) {
            Some(Activation::Command { action }) => Some(action),
            Some(_) => panic!("voice resolution must yield command activations"),
            None => None,
        }
    }

    #[test]
    fn exact_substring_match() {
        let mut r = resolver();
        assert_eq!(resolve(&mut r, "pop", 0.9), Some(CommandAction::Pop));
        assert_eq!(
            resolve(&mut r, "please pop that one", 0.9),
            Some(CommandAction::Pop)
        );
    }

    #[test]
    fn normalization_handles_case_and_whitespace() {
        let mut r = resolver();
        assert_eq!(resolve(&mut r, "  PAUSE  ", 0.9), Some(CommandAction::Pause));
    }

    #[test]
    fn interim_results_are_ignored() {
        let mut r = resolver();
        let utterance = Utterance {
            transcript: "pop".into(),
            confidence: 0.9,
            is_final: false,
        };
        let mut hub = FeedbackHub::new();
        assert!(r.on_utterance(&utterance, 0, &mut hub).is_none());
        assert_eq!(r.stats().utterances, 0);
    }

    #[test]
    fn low_confidence_is_rejected_before_resolution() {
        let mut r = resolver();
        assert_eq!(resolve(&mut r, "pop", 0.69), None);
        assert_eq!(resolve(&mut r, "pop", 0.7), Some(CommandAction::Pop));
    }

    #[test]
    fn global_listed_first_beats_contextual() {
        let mut r = resolver();
        r.set_context(VoiceContext::Menu);
        // "help" is both a global phrase (-> Help) and a menu phrase
        // (-> Help); make them differ to pin the order.
        r.bind_context_phrase(VoiceContext::Menu, "help", CommandAction::Menu);

        // Global table is scanned first, so the global binding wins.
        assert_eq!(resolve(&mut r, "help", 0.9), Some(CommandAction::Help));
    }

    #[test]
    fn contextual_phrases_only_apply_in_their_context() {
        let mut r = resolver();
        assert_eq!(resolve(&mut r, "new game", 0.9), None);

        r.set_context(VoiceContext::Menu);
        assert_eq!(resolve(&mut r, "new game", 0.9), Some(CommandAction::NewGame));

        // Switching away removes the overlay but keeps globals.
        r.set_context(VoiceContext::Game);
        assert_eq!(resolve(&mut r, "new game", 0.9), None);
        assert_eq!(resolve(&mut r, "pause", 0.9), Some(CommandAction::Pause));
    }

    #[test]
    fn fuzzy_threshold_is_strict() {
        let mut r = VoiceCommandResolver::new(VoiceConfig::empty());
        let mut config = r.config().clone();
        config.enabled = true;
        // 10-char phrase: 3 edits gives similarity exactly 0.7, 2 edits
        // gives 0.8.
        config.bind_phrase("abcdefghij", CommandAction::Click);
        r.set_config(config);

        assert_eq!(resolve(&mut r, "abcdefgxyz", 0.9), None);
        assert_eq!(resolve(&mut r, "abcdefghyz", 0.9), Some(CommandAction::Click));
    }

    #[test]
    fn fuzzy_takes_first_entry_above_threshold_not_best() {
        let mut r = VoiceCommandResolver::new(VoiceConfig::empty());
        let mut config = r.config().clone();
        config.enabled = true;
        config.bind_phrase("continue game", CommandAction::ContinueGame);
        config.bind_phrase("continue gaming", CommandAction::Resume);
        r.set_config(config);

        // "continue gamin" is closer to the second entry, but the first
        // entry already exceeds the threshold and iteration order wins.
        assert_eq!(
            resolve(&mut r, "continue gamin", 0.9),
            Some(CommandAction::ContinueGame)
        );
    }

    #[test]
    fn unknown_command_apologizes_without_dispatch() {
        struct Speech(std::rc::Rc<std::cell::RefCell<Vec<String>>>);
        impl aegis_core::SpeechSink for Speech {
            fn speak(&mut self, text: &str) {
                self.0.borrow_mut().push(text.to_string());
            }
        }

        let mut r = resolver();
        let spoken = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut hub = FeedbackHub::new();
        hub.set_speech(Box::new(Speech(spoken.clone())));

        let utterance = Utterance {
            transcript: "flibbertigibbet".into(),
            confidence: 0.95,
            is_final: true,
        };
        assert!(r.on_utterance(&utterance, 0, &mut hub).is_none());
        assert_eq!(spoken.borrow().len(), 1);
        assert!(spoken.borrow()[0].contains("flibbertigibbet"));
    }

    #[test]
    fn history_is_capped_at_five() {
        let mut r = resolver();
        for i in 0..8 {
            resolve(&mut r, &format!("utterance {i}"), 0.9);
        }
        assert_eq!(r.history().count(), 5);
        // Oldest entries were evicted.
        assert!(r.history().all(|u| !u.transcript.contains("utterance 0")));
    }

    #[test]
    fn average_confidence_is_a_running_mean() {
        let mut r = resolver();
        resolve(&mut r, "pop", 0.8);
        resolve(&mut r, "pop", 0.6);
        assert!((r.stats().average_confidence - 0.7).abs() < 1e-9);
    }
}
