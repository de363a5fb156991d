//! Latest device state, for anything that wants to read it outside the bus.
//!
//! The state manager broadcasts a `SenseState` after every mode or alarm
//! change; [`StatusMonitor`] keeps the most recent one.

use std::sync::Arc;

use log::info;
use parking_lot::Mutex;

use crate::error::BusError;
use crate::events::{EventBus, SenseState};
use crate::pubsub::SubscribeToken;

#[derive(Clone, Default)]
pub struct StatusMonitor {
    latest: Arc<Mutex<Option<SenseState>>>,
}

impl StatusMonitor {
    /// Subscribe to `SenseState` broadcasts.
    pub fn install(bus: &Arc<EventBus>) -> Result<(Self, SubscribeToken), BusError> {
        let monitor = Self::default();
        let latest = Arc::clone(&monitor.latest);
        let token = bus
            .subscribe_to::<SenseState, _>(move |state| {
                let mut slot = latest.lock();
                if (*slot).is_none_or(|prev| prev.mode != state.mode || prev.alarm != state.alarm) {
                    info!(
                        "STATUS | mode={} alarm={} threshold={} aq={:?}",
                        state.mode, state.alarm, state.alarm_threshold, state.air_quality
                    );
                }
                *slot = Some(state);
            })
            .ok_or(BusError::SubscribersFull)?;
        Ok((monitor, token))
    }

    /// `None` until the first broadcast.
    pub fn current(&self) -> Option<SenseState> {
        *self.latest.lock()
    }
}
