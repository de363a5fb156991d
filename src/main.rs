//! SenseHub host entry point.
//!
//! Builds every component once, wires them through the bus, and runs the
//! device loop against simulated peripherals.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  stdin ──▶ SimEnvironment ──▶ sampling thread ─┐             │
//! │                  │                             ▼             │
//! │                  └──▶ ButtonManager ──▶   EventBus ──▶ worker │
//! │  ticker (10 ms) ──▶ timers · Morse · buttons · rotation ·    │
//! │                     status blinker ──▶ LogStatusLed          │
//! │                                                              │
//! │  worker: StateManager · EventTimers · Morse · Proximity ·    │
//! │          StatusMonitor                     ──▶ LogLed        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stdin commands: `a`/`b`/`x`/`y` click a button (an optional hold time
//! in ms may follow), `lux <n>`, `prox <n>`, `gas <ohms>`, `hum <pct>`
//! change the simulated readings, `blink [count] [ms]` and `toggle` drive
//! the status LED, `status` prints the current state and `q` quits.

use core::sync::atomic::{AtomicBool, Ordering};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use parking_lot::Mutex;

use sensehub::adapters::log_led::{LogLed, LogStatusLed};
use sensehub::adapters::sim::SimEnvironment;
use sensehub::app::status::StatusMonitor;
use sensehub::color_rotation::{ColorRotationManager, PRODUCTION_STEPS};
use sensehub::config::HubConfig;
use sensehub::drivers::blinky::Blinky;
use sensehub::drivers::button::{ButtonId, ButtonManager, Polarity};
use sensehub::error::Error;
use sensehub::event_timers::{self, EventTimers};
use sensehub::events::{EventBus, TimerToken};
use sensehub::morse_code::{self, BusOutput, Encoder};
use sensehub::sensors::proximity::ProximityManager;
use sensehub::sensors::sampling::SamplingLoop;
use sensehub::state_manager::StateManager;
use sensehub::timer::system_clock;
use sensehub::worker::{WorkQueue, Worker};

/// Pending work items the worker can hold.
const WORK_QUEUE_DEPTH: usize = 64;
/// Period of the ticker that polls time-driven components.
const TICK: Duration = Duration::from_millis(10);
/// Default hold time for a simulated button click.
const CLICK_MS: u64 = 100;
/// Status LED blinks once the hub is wired.
const READY_BLINKS: u32 = 3;
const READY_BLINK_MS: u32 = 250;

const TIMER_COUNT: usize = 3;
const TIMER_TOKENS: [TimerToken; TIMER_COUNT] = [
    TimerToken::REPEAT_ALARM,
    TimerToken::SILENCE_ALARM,
    TimerToken::THRESHOLD_MODE,
];

fn load_config() -> Result<HubConfig> {
    let Ok(path) = std::env::var("SENSEHUB_CONFIG") else {
        info!("Config: defaults");
        return Ok(HubConfig::default());
    };
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config file {path}"))?;
    let config = HubConfig::from_json(&json)
        .map_err(Error::from)
        .with_context(|| format!("loading config file {path}"))?;
    info!("Config: loaded from {}", path);
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("SenseHub v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    // ── Worker and bus ────────────────────────────────────────
    let (worker, worker_thread) =
        WorkQueue::<WORK_QUEUE_DEPTH>::spawn("worker").context("spawning worker thread")?;
    let bus = EventBus::new(worker.clone());

    // ── Subscribers ───────────────────────────────────────────
    let timers = Arc::new(Mutex::new(EventTimers::<TIMER_COUNT>::new(bus.clone())));
    for token in TIMER_TOKENS {
        timers.lock().add_event_timer(token).map_err(Error::from)?;
    }
    event_timers::install(&timers, system_clock).map_err(Error::from)?;

    let encoder = Arc::new(Mutex::new(Encoder::new(BusOutput(bus.clone()))));
    morse_code::install(&bus, &encoder, system_clock).map_err(Error::from)?;

    ProximityManager::install(&bus, &config).map_err(Error::from)?;

    let (status, _) = StatusMonitor::install(&bus).map_err(Error::from)?;

    StateManager::new(bus.clone(), LogLed::new(), &config)
        .install()
        .map_err(Error::from)?;

    // ── Time-driven producers ─────────────────────────────────
    let env = SimEnvironment::new();
    let now = system_clock();

    let buttons = Arc::new(Mutex::new(ButtonManager::new(
        bus.clone(),
        env.button_pins(),
        Polarity::ActiveLow,
        &config,
    )));
    buttons.lock().start(now);

    let rotation = Arc::new(Mutex::new(ColorRotationManager::new(
        bus.clone(),
        &PRODUCTION_STEPS,
        &config,
    )));
    if config.demo_mode_secs > 0 {
        rotation.lock().start(now);
    }

    let blinky = Arc::new(Mutex::new(Blinky::new(LogStatusLed::default())));
    blinky.lock().blink(READY_BLINKS, READY_BLINK_MS, now);

    let stop = Arc::new(AtomicBool::new(false));

    let ticker = {
        let stop = stop.clone();
        let worker = worker.clone();
        let bus = bus.clone();
        let blinky = blinky.clone();
        std::thread::Builder::new()
            .name("ticker".into())
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    let timers = timers.clone();
                    let encoder = encoder.clone();
                    let buttons = buttons.clone();
                    let rotation = rotation.clone();
                    let blinky = blinky.clone();
                    let tick = worker.run_once(Box::new(move || {
                        let now = system_clock();
                        timers.lock().poll(now);
                        encoder.lock().poll(now);
                        buttons.lock().poll(now);
                        rotation.lock().poll(now);
                        blinky.lock().poll(now);
                    }));
                    if let Err(e) = tick {
                        warn!("Ticker: {}", e);
                    }
                    if !bus.resume_drain() {
                        warn!("Ticker: bus drain still refused");
                    }
                    std::thread::sleep(TICK);
                }
            })
            .context("spawning ticker thread")?
    };

    let sampler = {
        let stop = stop.clone();
        let mut sampling = SamplingLoop::new(
            bus.clone(),
            env.ambient_light(),
            env.proximity(),
            env.air(),
            &config,
        );
        sampling.start().map_err(Error::from)?;
        std::thread::Builder::new()
            .name("sampling".into())
            .spawn(move || sampling.run(&stop))
            .context("spawning sampling thread")?
    };

    info!(
        "Ready: a/b/x/y [ms], lux <n>, prox <n>, gas <ohms>, hum <pct>, blink [n] [ms], toggle, status, q"
    );
    for line in std::io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        if !run_command(&env, &status, &blinky, line.trim()) {
            break;
        }
    }

    info!("Shutting down");
    stop.store(true, Ordering::Release);
    if ticker.join().is_err() {
        error!("Ticker thread panicked");
    }
    if sampler.join().is_err() {
        error!("Sampling thread panicked");
    }
    worker.request_stop();
    if worker_thread.join().is_err() {
        error!("Worker thread panicked");
    }
    Ok(())
}

/// Apply one stdin command.  Returns `false` on quit.
fn run_command(
    env: &SimEnvironment,
    status: &StatusMonitor,
    blinky: &Mutex<Blinky<LogStatusLed>>,
    line: &str,
) -> bool {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return true;
    };
    let arg = words.next();

    let button = match command {
        "a" => Some(ButtonId::A),
        "b" => Some(ButtonId::B),
        "x" => Some(ButtonId::X),
        "y" => Some(ButtonId::Y),
        _ => None,
    };
    if let Some(id) = button {
        let hold_ms = arg.and_then(|a| a.parse().ok()).unwrap_or(CLICK_MS);
        env.set_button(id, true);
        std::thread::sleep(Duration::from_millis(hold_ms));
        env.set_button(id, false);
        return true;
    }

    match command {
        "blink" => {
            let count = arg.and_then(|a| a.parse().ok()).unwrap_or(0);
            let interval_ms = words.next().and_then(|a| a.parse().ok()).unwrap_or(0);
            blinky.lock().blink(count, interval_ms, system_clock());
            return true;
        }
        "toggle" => {
            blinky.lock().toggle();
            return true;
        }
        _ => {}
    }

    match (command, arg.map(str::parse::<f32>)) {
        ("q" | "quit", _) => return false,
        ("status", _) => match status.current() {
            Some(state) => info!("{:?}", state),
            None => info!("No state broadcast yet"),
        },
        ("lux", Some(Ok(lux))) => env.set_lux(lux),
        ("prox", Some(Ok(sample))) => env.set_proximity(sample.clamp(0.0, 65_535.0) as u16),
        ("gas", Some(Ok(ohms))) => env.set_gas_resistance(ohms),
        ("hum", Some(Ok(pct))) => env.set_humidity(pct),
        _ => warn!("Unknown command: {:?}", line),
    }
    true
}
