//! Bounded publish/subscribe bus drained by a single worker.
//!
//! ```text
//!  producer threads ──publish()──────────────┐
//!  interrupt context ─publish_from_interrupt()┤
//!                                             ▼
//!                                ┌────────────────────────┐
//!                                │ ingress: Deque<E, N>   │  (own lock)
//!                                └───────────┬────────────┘
//!                                            │ one event per drain
//!                                            ▼
//!                                ┌────────────────────────┐
//!                                │ worker: drain_one()    │──▶ reschedule
//!                                └───────────┬────────────┘    if more queued
//!                                            ▼
//!                                ┌────────────────────────┐
//!                                │ slots[0..S] in order   │  (own lock, held
//!                                │ callback(copy of E)    │   for lookup only)
//!                                └────────────────────────┘
//! ```
//!
//! ## Contract
//!
//! - Delivery is FIFO in enqueue order; within one event, subscribers run
//!   in slot order.
//! - A full queue rejects the newest event (`publish` returns `false`).
//!   Producers never block on a slow consumer and never overwrite an
//!   already-queued event.
//! - [`PubSub::publish_from_interrupt`] never blocks: if the ingress lock is
//!   held it drops the event and returns `false`.  This try-lock-or-drop
//!   behaviour is part of the contract, not a limitation.
//! - Callbacks run with neither lock held, so a callback may publish,
//!   subscribe or unsubscribe.  A callback that unsubscribes another slot it
//!   has already passed is unaffected for the current event.
//! - Each drain delivers exactly one event and then yields the worker.
//! - If the worker refuses the drain job, `publish` still returns `true`:
//!   the event is queued but stalled until the next publish or a call to
//!   [`PubSub::resume_drain`].  The host ticker calls `resume_drain` every
//!   tick.

use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use heapless::Deque;
use log::warn;
use parking_lot::Mutex;

use crate::worker::Worker;

/// Boxed subscriber callback.
pub type Callback<E> = Box<dyn FnMut(E) + Send + 'static>;

/// Handle for a live subscription.  Never zero and never shared by two
/// live subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscribeToken(NonZeroU32);

impl SubscribeToken {
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// A payload type that can be pulled out of the bus event type `E`.
///
/// Implemented for every variant payload so subscribers can filter with
/// [`PubSub::subscribe_to`].
pub trait EventVariant<E>: Sized {
    fn extract(event: &E) -> Option<Self>;
}

struct Slot<E> {
    token: Option<SubscribeToken>,
    /// `None` while the callback is executing on the worker.
    callback: Option<Callback<E>>,
}

impl<E> Slot<E> {
    const fn free() -> Self {
        Self {
            token: None,
            callback: None,
        }
    }
}

struct Ingress<E, const N: usize> {
    events: Deque<E, N>,
    drain_pending: bool,
}

pub struct PubSub<E, const EVENTS: usize, const SUBSCRIBERS: usize> {
    worker: Arc<dyn Worker>,
    this: Weak<Self>,
    ingress: Mutex<Ingress<E, EVENTS>>,
    slots: Mutex<[Slot<E>; SUBSCRIBERS]>,
    next_token: AtomicU32,
}

impl<E, const EVENTS: usize, const SUBSCRIBERS: usize> PubSub<E, EVENTS, SUBSCRIBERS>
where
    E: Copy + Send + 'static,
{
    /// Create a bus that drains on `worker`.
    pub fn new(worker: Arc<dyn Worker>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            worker,
            this: this.clone(),
            ingress: Mutex::new(Ingress {
                events: Deque::new(),
                drain_pending: false,
            }),
            slots: Mutex::new(core::array::from_fn(|_| Slot::free())),
            next_token: AtomicU32::new(1),
        })
    }

    // ── Producers ─────────────────────────────────────────────

    /// Enqueue `event` for delivery.  Returns `false` (event dropped) if
    /// the queue is full.
    pub fn publish(&self, event: impl Into<E>) -> bool {
        let event = event.into();
        let mut ingress = self.ingress.lock();
        self.enqueue(&mut ingress, event)
    }

    /// Like [`publish`](Self::publish) but never waits for the ingress
    /// lock; a contended lock drops the event.
    pub fn publish_from_interrupt(&self, event: impl Into<E>) -> bool {
        let event = event.into();
        let Some(mut ingress) = self.ingress.try_lock() else {
            return false;
        };
        self.enqueue(&mut ingress, event)
    }

    fn enqueue(&self, ingress: &mut Ingress<E, EVENTS>, event: E) -> bool {
        if ingress.events.push_back(event).is_err() {
            return false;
        }
        if !ingress.drain_pending {
            // A failed schedule leaves the event queued; the next publish
            // retries.
            ingress.drain_pending = self.schedule_drain();
        }
        true
    }

    /// Schedule a drain if events are queued and none is pending.  Returns
    /// `true` if a drain is pending afterwards or nothing is queued.
    pub fn resume_drain(&self) -> bool {
        let mut ingress = self.ingress.lock();
        if ingress.drain_pending || ingress.events.is_empty() {
            return true;
        }
        ingress.drain_pending = self.schedule_drain();
        ingress.drain_pending
    }

    /// Number of events waiting for delivery.
    pub fn queued(&self) -> usize {
        self.ingress.lock().events.len()
    }

    // ── Subscribers ───────────────────────────────────────────

    /// Register `callback` for every event.  Returns `None` if the
    /// subscriber table is full.
    pub fn subscribe<F>(&self, callback: F) -> Option<SubscribeToken>
    where
        F: FnMut(E) + Send + 'static,
    {
        let callback: Callback<E> = Box::new(callback);
        let mut slots = self.slots.lock();
        let index = slots.iter().position(|slot| slot.token.is_none())?;
        let token = self.allocate_token(&slots[..]);
        slots[index] = Slot {
            token: Some(token),
            callback: Some(callback),
        };
        Some(token)
    }

    /// Register `callback` for events whose payload is `V` only.
    pub fn subscribe_to<V, F>(&self, mut callback: F) -> Option<SubscribeToken>
    where
        V: EventVariant<E> + 'static,
        F: FnMut(V) + Send + 'static,
    {
        self.subscribe(move |event: E| {
            if let Some(value) = V::extract(&event) {
                callback(value);
            }
        })
    }

    /// Free the slot owned by `token`.  Returns `false` for an unknown
    /// token.
    pub fn unsubscribe(&self, token: SubscribeToken) -> bool {
        let removed = {
            let mut slots = self.slots.lock();
            let Some(slot) = slots.iter_mut().find(|slot| slot.token == Some(token)) else {
                return false;
            };
            slot.token = None;
            slot.callback.take()
        };
        // Dropped outside the lock; the closure may own bus handles.
        drop(removed);
        true
    }

    /// Number of occupied subscriber slots.
    pub fn subscriber_count(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.token.is_some()).count()
    }

    fn allocate_token(&self, live: &[Slot<E>]) -> SubscribeToken {
        loop {
            let raw = self.next_token.fetch_add(1, Ordering::Relaxed);
            let Some(raw) = NonZeroU32::new(raw) else {
                continue;
            };
            let token = SubscribeToken(raw);
            if live.iter().all(|slot| slot.token != Some(token)) {
                return token;
            }
        }
    }

    // ── Worker side ───────────────────────────────────────────

    fn schedule_drain(&self) -> bool {
        let Some(bus) = self.this.upgrade() else {
            return false;
        };
        match self.worker.run_once(Box::new(move || bus.drain_one())) {
            Ok(()) => true,
            Err(e) => {
                warn!("PubSub: could not schedule drain: {}", e);
                false
            }
        }
    }

    fn drain_one(&self) {
        let event = {
            let mut ingress = self.ingress.lock();
            match ingress.events.pop_front() {
                Some(event) => event,
                None => {
                    ingress.drain_pending = false;
                    return;
                }
            }
        };

        self.deliver(event);

        let mut ingress = self.ingress.lock();
        ingress.drain_pending = !ingress.events.is_empty() && self.schedule_drain();
    }

    fn deliver(&self, event: E) {
        for index in 0..SUBSCRIBERS {
            let taken = {
                let mut slots = self.slots.lock();
                let slot = &mut slots[index];
                match slot.token {
                    Some(token) => slot.callback.take().map(|callback| (token, callback)),
                    None => None,
                }
            };
            let Some((token, mut callback)) = taken else {
                continue;
            };

            callback(event);

            let stale = {
                let mut slots = self.slots.lock();
                let slot = &mut slots[index];
                if slot.token == Some(token) {
                    slot.callback = Some(callback);
                    None
                } else {
                    // Unsubscribed while running.
                    Some(callback)
                }
            };
            drop(stale);
        }
    }
}
