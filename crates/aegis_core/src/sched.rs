//! Virtual-time primitives: clock trait and a cancellable deadline queue.
//!
//! Nothing in the core reads the wall clock directly. Components take an
//! explicit `now_ms` and park timed work on a `Scheduler`; the host drives
//! both from its frame loop. Tests substitute `ManualClock` and step time
//! deterministically instead of sleeping.

use std::cell::Cell;

/// Millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time, measured from construction.
pub struct SystemClock {
    origin: instant::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: instant::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Test clock advanced by hand.
#[derive(Default)]
pub struct ManualClock {
    ms: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(ms: u64) -> Self {
        let clock = Self::default();
        clock.ms.set(ms);
        clock
    }

    pub fn advance(&self, delta_ms: u64) {
        self.ms.set(self.ms.get() + delta_ms);
    }

    pub fn set(&self, ms: u64) {
        self.ms.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.get()
    }
}

/// Handle to a scheduled deadline. Cancelled or fired tokens are dead;
/// a stale token no-ops on cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u64);

/// Cancellable deadline queue.
///
/// Deliberately polled rather than callback-driven: owners call
/// `due(now)` from their `tick` and react to fired tokens, which keeps
/// every timed path single-threaded and testable with virtual time.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_token: u64,
    entries: Vec<(u64, Token)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a deadline `delay_ms` from `now_ms`.
    pub fn schedule_after(&mut self, now_ms: u64, delay_ms: u64) -> Token {
        self.next_token += 1;
        let token = Token(self.next_token);
        self.entries.push((now_ms.saturating_add(delay_ms), token));
        token
    }

    /// Cancel a pending deadline. Unknown/fired tokens are ignored.
    pub fn cancel(&mut self, token: Token) {
        self.entries.retain(|(_, t)| *t != token);
    }

    /// Whether the token is still pending.
    pub fn is_pending(&self, token: Token) -> bool {
        self.entries.iter().any(|(_, t)| *t == token)
    }

    /// Remove and return all tokens whose deadline has passed, in
    /// deadline order.
    pub fn due(&mut self, now_ms: u64) -> Vec<Token> {
        let mut fired: Vec<(u64, Token)> = Vec::new();
        self.entries.retain(|entry| {
            if entry.0 <= now_ms {
                fired.push(*entry);
                false
            } else {
                true
            }
        });
        fired.sort_by_key(|(deadline, _)| *deadline);
        fired.into_iter().map(|(_, t)| t).collect()
    }

    /// Drop every pending deadline.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }
}
