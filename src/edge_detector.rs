//! Hysteresis edge detection for noisy scalar streams.
//!
//! Two thresholds (`low <= high`) split the sample range into three
//! bands.  Only a move from the low band to the high band (or back)
//! produces an edge, so a signal hovering around either threshold cannot
//! chatter.
//!
//! ```text
//!           high ─ ─ ─ ─ ─ ─ ┌──────── Rising here
//!                            │
//!   (no edge in between)     │
//!                            │
//!           low  ─ ─ ─ ─ ─ ─ ┘  ◀──── Falling back here
//! ```
//!
//! A sample equal to both thresholds (when `low == high`) counts as low:
//! the low check runs first.

use core::fmt::Debug;
use std::sync::Arc;

use log::warn;

use crate::error::BusError;
use crate::events::{Event, EventBus};
use crate::pubsub::{EventVariant, SubscribeToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Rising,
    Falling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Initial,
    Low,
    High,
}

#[derive(Debug, Clone)]
pub struct HysteresisEdgeDetector<S> {
    low: S,
    high: S,
    band: Band,
}

impl<S: PartialOrd + Copy + Debug> HysteresisEdgeDetector<S> {
    /// Panics if `low > high`.
    pub fn new(low: S, high: S) -> Self {
        assert!(low <= high, "low threshold {low:?} above high threshold {high:?}");
        Self {
            low,
            high,
            band: Band::Initial,
        }
    }

    pub fn low_threshold(&self) -> S {
        self.low
    }

    pub fn high_threshold(&self) -> S {
        self.high
    }

    /// Replace both thresholds and forget the previous band, so the next
    /// sample cannot itself produce an edge.  Panics if `low > high`.
    pub fn set_low_and_high_thresholds(&mut self, low: S, high: S) {
        assert!(low <= high, "low threshold {low:?} above high threshold {high:?}");
        self.low = low;
        self.high = high;
        self.band = Band::Initial;
    }

    pub fn update(&mut self, sample: S) -> Edge {
        let observed = if sample <= self.low {
            Band::Low
        } else if sample >= self.high {
            Band::High
        } else {
            return Edge::None;
        };

        let edge = match (self.band, observed) {
            (Band::Low, Band::High) => Edge::Rising,
            (Band::High, Band::Low) => Edge::Falling,
            _ => Edge::None,
        };
        self.band = observed;
        edge
    }
}

// ───────────────────────────────────────────────────────────────
// Bus bridge
// ───────────────────────────────────────────────────────────────

/// Describes how a sample stream on the bus maps to edge events.
pub trait EdgeSource: Send + 'static {
    type Sample: PartialOrd + Copy + Debug + Send + 'static;
    type SampleEvent: EventVariant<Event>;

    fn sample(event: Self::SampleEvent) -> Self::Sample;

    /// Event to publish for a non-`None` edge.
    fn edge_event(edge: Edge) -> Event;
}

/// Subscribe a hysteresis detector to `Src::SampleEvent` and publish
/// `Src::edge_event` on every edge.
pub fn install_bus_detector<Src: EdgeSource>(
    bus: &Arc<EventBus>,
    low: Src::Sample,
    high: Src::Sample,
) -> Result<SubscribeToken, BusError> {
    let mut detector = HysteresisEdgeDetector::new(low, high);
    let publisher = Arc::clone(bus);
    bus.subscribe_to::<Src::SampleEvent, _>(move |event| {
        let edge = detector.update(Src::sample(event));
        if edge != Edge::None && !publisher.publish(Src::edge_event(edge)) {
            warn!("Edge detector: dropped {:?} edge", edge);
        }
    })
    .ok_or(BusError::SubscribersFull)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_never_fires() {
        let mut d = HysteresisEdgeDetector::new(10u16, 20);
        assert_eq!(d.update(25), Edge::None);
        let mut d = HysteresisEdgeDetector::new(10u16, 20);
        assert_eq!(d.update(5), Edge::None);
    }

    #[test]
    fn rising_then_falling() {
        let mut d = HysteresisEdgeDetector::new(10u16, 20);
        assert_eq!(d.update(5), Edge::None);
        assert_eq!(d.update(15), Edge::None);
        assert_eq!(d.update(20), Edge::Rising);
        assert_eq!(d.update(30), Edge::None);
        assert_eq!(d.update(11), Edge::None);
        assert_eq!(d.update(10), Edge::Falling);
        assert_eq!(d.update(0), Edge::None);
    }

    #[test]
    fn chatter_inside_band_is_ignored() {
        let mut d = HysteresisEdgeDetector::new(10u16, 20);
        d.update(0);
        for s in [11, 19, 12, 18, 15] {
            assert_eq!(d.update(s), Edge::None);
        }
    }

    #[test]
    fn equal_thresholds_classify_tie_as_low() {
        let mut d = HysteresisEdgeDetector::new(50u16, 50);
        assert_eq!(d.update(40), Edge::None);
        assert_eq!(d.update(50), Edge::None, "tie counts as low");
        assert_eq!(d.update(51), Edge::Rising);
        assert_eq!(d.update(50), Edge::Falling);
    }

    #[test]
    fn changing_thresholds_resets_history() {
        let mut d = HysteresisEdgeDetector::new(10u16, 20);
        d.update(0);
        d.set_low_and_high_thresholds(100, 200);
        assert_eq!(d.update(300), Edge::None, "no edge right after a reset");
        assert_eq!(d.update(50), Edge::Falling);
        assert_eq!(d.low_threshold(), 100);
        assert_eq!(d.high_threshold(), 200);
    }

    #[test]
    fn works_with_floats() {
        let mut d = HysteresisEdgeDetector::new(0.25f32, 0.75);
        d.update(0.0);
        assert_eq!(d.update(0.8), Edge::Rising);
    }

    #[test]
    #[should_panic(expected = "above high threshold")]
    fn inverted_thresholds_panic() {
        let _ = HysteresisEdgeDetector::new(20u16, 10);
    }

    #[test]
    #[should_panic(expected = "above high threshold")]
    fn inverted_thresholds_panic_on_set() {
        let mut d = HysteresisEdgeDetector::new(10u16, 20);
        d.set_low_and_high_thresholds(30, 5);
    }
}
