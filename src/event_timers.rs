//! Token-addressed one-shot timers layered on the bus.
//!
//! ```text
//!   StateManager ──TimerRequest{token, timeout_s}──▶ bus ──▶ EventTimers
//!                                                             │ poll(now)
//!   StateManager ◀──────TimerExpired{token}──────── bus ◀─────┘
//! ```
//!
//! Each token is registered once at startup and owns one deadline.  A new
//! request for a token replaces its pending deadline (last request wins),
//! so there is never more than one pending fire per token.

use std::sync::Arc;

use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::{debug, warn};
use parking_lot::Mutex;

use crate::error::{BusError, TimerError};
use crate::events::{EventBus, TimerExpired, TimerRequest, TimerToken};
use crate::pubsub::SubscribeToken;
use crate::timer::{Clock, OneShotTimer};

#[derive(Debug)]
struct EventTimer {
    token: TimerToken,
    timer: OneShotTimer,
}

/// Registry of up to `N` event timers.
pub struct EventTimers<const N: usize> {
    bus: Arc<EventBus>,
    timers: Vec<EventTimer, N>,
}

impl<const N: usize> EventTimers<N> {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            timers: Vec::new(),
        }
    }

    /// Register `token`.  Registering the same token twice is a static
    /// configuration mistake and is reported as [`TimerError::AlreadyExists`].
    pub fn add_event_timer(&mut self, token: TimerToken) -> Result<(), TimerError> {
        if self.timers.iter().any(|t| t.token == token) {
            return Err(TimerError::AlreadyExists(token.0));
        }
        self.timers
            .push(EventTimer {
                token,
                timer: OneShotTimer::new(),
            })
            .map_err(|_| TimerError::RegistryFull)
    }

    /// (Re)schedule the timer for `request.token` at `now + timeout_s`.
    /// Unknown tokens are logged and ignored.
    pub fn on_timer_request(&mut self, request: TimerRequest, now: Instant) {
        let Some(entry) = self.timers.iter_mut().find(|t| t.token == request.token) else {
            warn!("EventTimers: no timer found for token {}", request.token);
            return;
        };
        entry
            .timer
            .invoke_after(now, Duration::from_secs(u64::from(request.timeout_s)));
        debug!(
            "EventTimers: token {} fires in {}s",
            request.token, request.timeout_s
        );
    }

    /// Disarm `token`.  Returns `false` only for an unknown token; cancelling
    /// an idle timer is a no-op.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        match self.timers.iter_mut().find(|t| t.token == token) {
            Some(entry) => {
                entry.timer.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.timers
            .iter()
            .any(|t| t.token == token && t.timer.is_pending())
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().filter_map(|t| t.timer.deadline()).min()
    }

    /// Publish `TimerExpired` for every timer whose deadline has passed.
    /// Returns how many fired.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        for entry in &mut self.timers {
            if entry.timer.poll(now) {
                fired += 1;
                if !self.bus.publish(TimerExpired { token: entry.token }) {
                    warn!("EventTimers: dropped expiry for token {}", entry.token);
                }
            }
        }
        fired
    }
}

/// Route `TimerRequest` events from the bus into `timers`, stamping each
/// with `clock()`.
pub fn install<const N: usize>(
    timers: &Arc<Mutex<EventTimers<N>>>,
    clock: Clock,
) -> Result<SubscribeToken, BusError> {
    let bus = Arc::clone(&timers.lock().bus);
    let timers = Arc::clone(timers);
    bus.subscribe_to::<TimerRequest, _>(move |request| {
        timers.lock().on_timer_request(request, clock());
    })
    .ok_or(BusError::SubscribersFull)
}
