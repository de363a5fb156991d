//! Near/far detection from raw proximity samples.
//!
//! A hysteresis detector over `ProximitySample` events: rising through the
//! near threshold publishes `ProximityStateChange { proximity: true }`,
//! falling through the far threshold publishes `false`.

use std::sync::Arc;

use crate::config::HubConfig;
use crate::edge_detector::{install_bus_detector, Edge, EdgeSource};
use crate::error::BusError;
use crate::events::{Event, EventBus, ProximitySample, ProximityStateChange};
use crate::pubsub::SubscribeToken;

pub struct ProximityManager;

impl EdgeSource for ProximityManager {
    type Sample = u16;
    type SampleEvent = ProximitySample;

    fn sample(event: ProximitySample) -> u16 {
        event.sample
    }

    fn edge_event(edge: Edge) -> Event {
        ProximityStateChange {
            proximity: edge == Edge::Rising,
        }
        .into()
    }
}

impl ProximityManager {
    /// Subscribe the detector with the configured far/near thresholds.
    pub fn install(bus: &Arc<EventBus>, config: &HubConfig) -> Result<SubscribeToken, BusError> {
        install_bus_detector::<Self>(
            bus,
            config.proximity_far_threshold,
            config.proximity_near_threshold,
        )
    }
}
