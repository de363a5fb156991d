//! Polled one-shot timer.
//!
//! Time-driven components (event timers, Morse encoder, button sampler,
//! colour rotation) each own one or more of these and are polled with the
//! current [`Instant`] from the worker tick.  Taking `now` as an argument
//! keeps every component deterministic under test.

use embassy_time::{Duration, Instant};

/// Source of the current time.  Production uses [`system_clock`]; tests
/// substitute a stepped clock.
pub type Clock = fn() -> Instant;

pub fn system_clock() -> Instant {
    Instant::now()
}

/// A deadline that fires at most once per arming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneShotTimer {
    deadline: Option<Instant>,
}

impl OneShotTimer {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm for `deadline`, replacing any pending deadline.
    pub fn invoke_at(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Arm for `now + delay`, replacing any pending deadline.
    pub fn invoke_after(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now.checked_add(delay).unwrap_or(Instant::MAX));
    }

    /// Disarm.  A no-op if the timer already fired or was never armed.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` exactly once when `now` has reached the deadline,
    /// disarming the timer.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
