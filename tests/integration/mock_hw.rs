//! Mock hardware and a fully wired hub for integration tests.
//!
//! [`Hub`] builds the same component graph as the host binary, but on a
//! [`ManualWorker`] and a stepped clock, so a test can advance time in
//! ticks and inspect everything that happened.

use std::cell::Cell;
use std::sync::Arc;

use embassy_time::Instant;
use parking_lot::Mutex;

use sensehub::adapters::sim::{SimEnvironment, SimPin};
use sensehub::app::ports::PolychromeLed;
use sensehub::app::status::StatusMonitor;
use sensehub::color_rotation::{ColorRotationManager, PRODUCTION_STEPS};
use sensehub::config::HubConfig;
use sensehub::drivers::button::{ButtonId, ButtonManager, Polarity};
use sensehub::event_timers::{self, EventTimers};
use sensehub::events::{Event, EventBus, TimerToken};
use sensehub::morse_code::{self, BusOutput, Encoder};
use sensehub::state_manager::StateManager;
use sensehub::worker::ManualWorker;

/// Tick used by [`Hub::advance_ms`].
pub const TICK_MS: u64 = 10;

thread_local! {
    static NOW_MS: Cell<u64> = const { Cell::new(0) };
}

/// Stepped clock.  Per thread, so tests running in parallel do not share
/// time; the manual worker runs everything on the test thread.
pub fn test_clock() -> Instant {
    Instant::from_millis(NOW_MS.with(Cell::get))
}

fn set_now_ms(ms: u64) {
    NOW_MS.with(|now| now.set(ms));
}

// ── LED ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedState {
    pub rgb: (u8, u8, u8),
    pub brightness: u8,
    pub on: bool,
}

/// LED whose state outlives the state manager that owns it.
#[derive(Clone, Default)]
pub struct SharedLed(Arc<Mutex<LedState>>);

#[allow(dead_code)]
impl SharedLed {
    pub fn state(&self) -> LedState {
        *self.0.lock()
    }
}

impl PolychromeLed for SharedLed {
    fn set_color(&mut self, r: u8, g: u8, b: u8) {
        self.0.lock().rgb = (r, g, b);
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.0.lock().brightness = brightness;
    }

    fn set_on_off(&mut self, on: bool) {
        self.0.lock().on = on;
    }
}

// ── Wired hub ─────────────────────────────────────────────────

pub struct Hub {
    pub worker: Arc<ManualWorker>,
    pub bus: Arc<EventBus>,
    pub env: SimEnvironment,
    pub led: SharedLed,
    pub status: StatusMonitor,
    timers: Arc<Mutex<EventTimers<3>>>,
    encoder: Arc<Mutex<Encoder<BusOutput>>>,
    buttons: ButtonManager<SimPin>,
    rotation: ColorRotationManager,
    events: Arc<Mutex<Vec<Event>>>,
    now_ms: u64,
}

#[allow(dead_code)]
impl Hub {
    pub fn new() -> Self {
        Self::with_config(&HubConfig::default())
    }

    pub fn with_config(config: &HubConfig) -> Self {
        set_now_ms(0);
        let worker = Arc::new(ManualWorker::new());
        let bus = EventBus::new(worker.clone());

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        bus.subscribe(move |e| sink.lock().push(e)).unwrap();

        let timers = Arc::new(Mutex::new(EventTimers::<3>::new(bus.clone())));
        for token in [
            TimerToken::REPEAT_ALARM,
            TimerToken::SILENCE_ALARM,
            TimerToken::THRESHOLD_MODE,
        ] {
            timers.lock().add_event_timer(token).unwrap();
        }
        event_timers::install(&timers, test_clock).unwrap();

        let encoder = Arc::new(Mutex::new(Encoder::new(BusOutput(bus.clone()))));
        morse_code::install(&bus, &encoder, test_clock).unwrap();

        let (status, _) = StatusMonitor::install(&bus).unwrap();

        let led = SharedLed::default();
        StateManager::new(bus.clone(), led.clone(), config)
            .install()
            .unwrap();

        let env = SimEnvironment::new();
        let mut buttons =
            ButtonManager::new(bus.clone(), env.button_pins(), Polarity::ActiveLow, config);
        buttons.start(test_clock());

        let mut rotation = ColorRotationManager::new(bus.clone(), &PRODUCTION_STEPS, config);
        if config.demo_mode_secs > 0 {
            rotation.start(test_clock());
        }

        Self {
            worker,
            bus,
            env,
            led,
            status,
            timers,
            encoder,
            buttons,
            rotation,
            events,
            now_ms: 0,
        }
    }

    /// Publish `event` and deliver everything it causes.
    pub fn publish(&mut self, event: impl Into<Event>) {
        assert!(self.bus.publish(event), "bus queue full");
        self.worker.run_until_idle();
    }

    /// Step the clock by `ms`, polling every time-driven component once
    /// per tick.
    pub fn advance_ms(&mut self, ms: u64) {
        let target = self.now_ms + ms;
        while self.now_ms < target {
            self.now_ms = (self.now_ms + TICK_MS).min(target);
            set_now_ms(self.now_ms);
            let now = test_clock();
            self.timers.lock().poll(now);
            self.encoder.lock().poll(now);
            self.buttons.poll(now);
            self.rotation.poll(now);
            self.worker.run_until_idle();
        }
    }

    /// Press and release `id`, holding long enough to debounce both edges.
    pub fn click(&mut self, id: ButtonId) {
        self.env.set_button(id, true);
        self.advance_ms(100);
        self.env.set_button(id, false);
        self.advance_ms(100);
    }

    pub fn morse_idle(&self) -> bool {
        self.encoder.lock().is_idle()
    }

    pub fn timer_pending(&self, token: TimerToken) -> bool {
        self.timers.lock().is_pending(token)
    }

    /// Everything delivered since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        core::mem::take(&mut *self.events.lock())
    }
}

/// Messages of every `MorseEncodeRequest` in `events`.
#[allow(dead_code)]
pub fn morse_requests(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::MorseEncodeRequest(r) => Some(r.message.as_str().to_owned()),
            _ => None,
        })
        .collect()
}

/// Names of `events`, in delivery order.
#[allow(dead_code)]
pub fn names(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(Event::name).collect()
}
