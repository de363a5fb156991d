//! Polled button pipeline: debounce, then level-to-edge conversion.
//!
//! ## Per line
//!
//! ```text
//!   InputPin ──raw──▶ Debouncer ──stable level──▶ EdgeDetector ──▶ Activate/Deactivate
//! ```
//!
//! The [`ButtonManager`] samples all four lines every
//! `button_sample_interval_ms` (10 ms on the device) and publishes a typed
//! `ButtonA/B/X/Y { pressed }` event only when an edge comes out of the
//! pipeline.
//!
//! ## Debounce rule
//!
//! | Raw input vs. last raw   | Stable for >= interval | Output           |
//! |--------------------------|------------------------|------------------|
//! | changed                  | (timer restarts)       | unchanged        |
//! | same                     | no                     | unchanged        |
//! | same                     | yes                    | follows raw      |

use std::sync::Arc;

use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;
use log::warn;

use crate::config::HubConfig;
use crate::events::{ButtonA, ButtonB, ButtonX, ButtonY, Event, EventBus};
use crate::timer::OneShotTimer;

/// Default debounce interval.
pub const DEBOUNCE_MS: u64 = 30;

/// Logical level of an input line after polarity is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Inactive,
    Active,
}

impl From<bool> for InputState {
    fn from(active: bool) -> Self {
        if active { Self::Active } else { Self::Inactive }
    }
}

/// Output of the digital edge detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    None,
    Activate,
    Deactivate,
}

// ═══════════════════════════════════════════════════════════════
//  Debouncer
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    last_input: InputState,
    last_change: Instant,
    output: InputState,
}

impl Debouncer {
    pub fn new(interval: Duration, initial: InputState) -> Self {
        Self {
            interval,
            last_input: initial,
            last_change: Instant::MIN,
            output: initial,
        }
    }

    pub fn with_default_interval(initial: InputState) -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_MS), initial)
    }

    /// Feed one raw sample taken at `now`; returns the debounced level.
    pub fn update(&mut self, now: Instant, input: InputState) -> InputState {
        if input != self.last_input {
            self.last_input = input;
            self.last_change = now;
        } else if now.saturating_duration_since(self.last_change) >= self.interval {
            self.output = input;
        }
        self.output
    }

    pub fn output(&self) -> InputState {
        self.output
    }
}

// ═══════════════════════════════════════════════════════════════
//  Digital edge detector
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct EdgeDetector {
    previous: InputState,
}

impl EdgeDetector {
    pub fn new(initial: InputState) -> Self {
        Self { previous: initial }
    }

    pub fn update(&mut self, state: InputState) -> StateChange {
        let change = match (self.previous, state) {
            (InputState::Inactive, InputState::Active) => StateChange::Activate,
            (InputState::Active, InputState::Inactive) => StateChange::Deactivate,
            _ => StateChange::None,
        };
        self.previous = state;
        change
    }
}

// ═══════════════════════════════════════════════════════════════
//  Buttons
// ═══════════════════════════════════════════════════════════════

/// Electrical level that means "pressed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    /// Pulled up, switch to ground.
    ActiveLow,
}

/// The four front-panel buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    A,
    B,
    X,
    Y,
}

impl ButtonId {
    pub const ALL: [Self; 4] = [Self::A, Self::B, Self::X, Self::Y];

    pub fn event(self, pressed: bool) -> Event {
        match self {
            Self::A => ButtonA::new(pressed).into(),
            Self::B => ButtonB::new(pressed).into(),
            Self::X => ButtonX::new(pressed).into(),
            Self::Y => ButtonY::new(pressed).into(),
        }
    }
}

/// One input line with its debounce/edge pipeline.
pub struct Button<P> {
    pin: P,
    polarity: Polarity,
    debouncer: Debouncer,
    edges: EdgeDetector,
}

impl<P: InputPin> Button<P> {
    pub fn new(pin: P, polarity: Polarity, debounce: Duration) -> Self {
        Self {
            pin,
            polarity,
            debouncer: Debouncer::new(debounce, InputState::Inactive),
            edges: EdgeDetector::new(InputState::Inactive),
        }
    }

    /// Read the line once and run it through the pipeline.
    pub fn sample(&mut self, now: Instant) -> Result<StateChange, P::Error> {
        let high = self.pin.is_high()?;
        let active = match self.polarity {
            Polarity::ActiveHigh => high,
            Polarity::ActiveLow => !high,
        };
        let level = self.debouncer.update(now, InputState::from(active));
        Ok(self.edges.update(level))
    }

    pub fn is_pressed(&self) -> bool {
        self.debouncer.output() == InputState::Active
    }
}

/// Samples the four buttons on a fixed interval and publishes edges.
pub struct ButtonManager<P> {
    bus: Arc<EventBus>,
    buttons: [(ButtonId, Button<P>); 4],
    interval: Duration,
    timer: OneShotTimer,
}

impl<P: InputPin> ButtonManager<P> {
    /// `pins` are in A, B, X, Y order.
    pub fn new(bus: Arc<EventBus>, pins: [P; 4], polarity: Polarity, config: &HubConfig) -> Self {
        let debounce = Duration::from_millis(u64::from(config.debounce_interval_ms));
        let [a, b, x, y] = pins;
        Self {
            bus,
            buttons: [
                (ButtonId::A, Button::new(a, polarity, debounce)),
                (ButtonId::B, Button::new(b, polarity, debounce)),
                (ButtonId::X, Button::new(x, polarity, debounce)),
                (ButtonId::Y, Button::new(y, polarity, debounce)),
            ],
            interval: Duration::from_millis(u64::from(config.button_sample_interval_ms)),
            timer: OneShotTimer::new(),
        }
    }

    /// Begin periodic sampling; the first sample is taken at `now`.
    pub fn start(&mut self, now: Instant) {
        self.timer.invoke_at(now);
    }

    pub fn stop(&mut self) {
        self.timer.cancel();
    }

    /// Sample if the interval has elapsed, then rearm.
    pub fn poll(&mut self, now: Instant) {
        let Some(due) = self.timer.deadline() else {
            return;
        };
        if !self.timer.poll(now) {
            return;
        }
        self.sample_all(now);
        // Keep the cadence anchored to the schedule, not to poll jitter.
        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.timer.invoke_at(next);
    }

    /// Sample every line once.  A read error skips the remaining lines
    /// for this cycle.
    pub fn sample_all(&mut self, now: Instant) {
        for (id, button) in &mut self.buttons {
            let change = match button.sample(now) {
                Ok(change) => change,
                Err(e) => {
                    warn!("Buttons: failed to read {:?}: {:?}", id, e);
                    return;
                }
            };
            let pressed = match change {
                StateChange::None => continue,
                StateChange::Activate => true,
                StateChange::Deactivate => false,
            };
            if !self.bus.publish(id.event(pressed)) {
                warn!("Buttons: dropped {:?} pressed={}", id, pressed);
            }
        }
    }

    pub fn is_pressed(&self, id: ButtonId) -> bool {
        self.buttons
            .iter()
            .any(|(button_id, button)| *button_id == id && button.is_pressed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::ManualWorker;
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorKind, ErrorType};
    use parking_lot::Mutex;

    fn ms(n: u64) -> Instant {
        Instant::from_millis(n)
    }

    // ── Debouncer ─────────────────────────────────────────────

    #[test]
    fn stable_input_propagates_after_interval() {
        let mut d = Debouncer::with_default_interval(InputState::Inactive);
        assert_eq!(d.update(ms(0), InputState::Active), InputState::Inactive);
        assert_eq!(d.update(ms(29), InputState::Active), InputState::Inactive);
        assert_eq!(d.update(ms(30), InputState::Active), InputState::Active);
    }

    #[test]
    fn flicker_restarts_interval() {
        let mut d = Debouncer::with_default_interval(InputState::Inactive);
        d.update(ms(0), InputState::Active);
        d.update(ms(20), InputState::Inactive);
        d.update(ms(25), InputState::Active);
        assert_eq!(d.update(ms(50), InputState::Active), InputState::Inactive);
        assert_eq!(d.update(ms(55), InputState::Active), InputState::Active);
    }

    #[test]
    fn fast_toggling_never_changes_output() {
        let mut d = Debouncer::with_default_interval(InputState::Inactive);
        let mut changes = 0;
        let mut last = d.output();
        for t in 0..10u64 {
            let input = InputState::from(t % 2 == 0);
            let out = d.update(ms(t), input);
            if out != last {
                changes += 1;
                last = out;
            }
        }
        assert_eq!(changes, 0);
    }

    // ── Edge detector ─────────────────────────────────────────

    #[test]
    fn edge_detector_reports_transitions_only() {
        let mut e = EdgeDetector::new(InputState::Inactive);
        assert_eq!(e.update(InputState::Inactive), StateChange::None);
        assert_eq!(e.update(InputState::Active), StateChange::Activate);
        assert_eq!(e.update(InputState::Active), StateChange::None);
        assert_eq!(e.update(InputState::Inactive), StateChange::Deactivate);
    }

    // ── Button manager ────────────────────────────────────────

    #[derive(Clone)]
    struct FakePin(Arc<Mutex<Result<bool, ErrorKind>>>);

    impl FakePin {
        fn new(high: bool) -> Self {
            Self(Arc::new(Mutex::new(Ok(high))))
        }
        fn set(&self, high: bool) {
            *self.0.lock() = Ok(high);
        }
        fn fail(&self) {
            *self.0.lock() = Err(ErrorKind::Other);
        }
    }

    impl ErrorType for FakePin {
        type Error = ErrorKind;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, ErrorKind> {
            *self.0.lock()
        }
        fn is_low(&mut self) -> Result<bool, ErrorKind> {
            self.is_high().map(|h| !h)
        }
    }

    struct AlwaysHigh;

    impl ErrorType for AlwaysHigh {
        type Error = Infallible;
    }

    impl InputPin for AlwaysHigh {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(true)
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(false)
        }
    }

    fn setup() -> (Arc<ManualWorker>, Arc<EventBus>, Arc<Mutex<Vec<Event>>>) {
        let worker = Arc::new(ManualWorker::new());
        let bus = EventBus::new(worker.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(move |e| sink.lock().push(e)).unwrap();
        (worker, bus, seen)
    }

    #[test]
    fn press_and_release_publish_typed_events() {
        let (worker, bus, seen) = setup();
        let pins = [FakePin::new(true), FakePin::new(true), FakePin::new(true), FakePin::new(true)];
        let x = pins[2].clone();
        let mut mgr = ButtonManager::new(bus, pins, Polarity::ActiveLow, &HubConfig::default());
        mgr.start(ms(0));

        x.set(false);
        for t in (0..=100).step_by(10) {
            mgr.poll(ms(t));
        }
        assert!(mgr.is_pressed(ButtonId::X));
        x.set(true);
        for t in (110..=200).step_by(10) {
            mgr.poll(ms(t));
        }
        worker.run_until_idle();
        assert_eq!(
            *seen.lock(),
            vec![Event::from(ButtonX::new(true)), Event::from(ButtonX::new(false))]
        );
    }

    #[test]
    fn bounce_shorter_than_debounce_is_silent() {
        let (worker, bus, seen) = setup();
        let pins = [FakePin::new(false), FakePin::new(false), FakePin::new(false), FakePin::new(false)];
        let a = pins[0].clone();
        let mut mgr = ButtonManager::new(bus, pins, Polarity::ActiveHigh, &HubConfig::default());
        mgr.start(ms(0));
        for t in (0..200).step_by(10) {
            a.set((t / 10) % 2 == 0);
            mgr.poll(ms(t));
        }
        worker.run_until_idle();
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn read_error_skips_cycle() {
        let (worker, bus, seen) = setup();
        let pins = [FakePin::new(true), FakePin::new(false), FakePin::new(false), FakePin::new(false)];
        let a = pins[0].clone();
        let mut mgr = ButtonManager::new(bus, pins, Polarity::ActiveHigh, &HubConfig::default());
        a.fail();
        for t in (0..100).step_by(10) {
            mgr.sample_all(ms(t));
        }
        worker.run_until_idle();
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn stopped_manager_does_not_sample() {
        let (worker, bus, seen) = setup();
        let pins = [AlwaysHigh, AlwaysHigh, AlwaysHigh, AlwaysHigh];
        let mut mgr = ButtonManager::new(bus, pins, Polarity::ActiveHigh, &HubConfig::default());
        mgr.start(ms(0));
        mgr.stop();
        for t in (0..100).step_by(10) {
            mgr.poll(ms(t));
        }
        worker.run_until_idle();
        assert!(seen.lock().is_empty());
    }
}
