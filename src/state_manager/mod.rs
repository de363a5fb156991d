//! Device state machine.
//!
//! The [`StateManager`] owns the active [`Mode`] and every piece of
//! device-level state (alarm flag, alarm threshold, smoothed air quality,
//! LED).  It is driven only by bus events, delivered one at a time on the
//! worker, so nothing in here is locked.
//!
//! ```text
//!                    A/B                        timeout
//!   ┌─────────┐ ─────────────▶ ┌───────────┐ ───────────▶ ┌──────────────┐
//!   │ Monitor │                │ Threshold │              │ MorseReadout │
//!   └─────────┘ ◀───────────── └───────────┘              │    "TTT"     │
//!     │  ▲  ▲        X/Y                                  └──────┬───────┘
//!     │  │  │                                                    │ finished
//!   Y │  │  └──────────────────── reset_mode ◀───────────────────┘
//!     ▼  │ recovered / X
//!   ┌────┴──┐   score below threshold (from any mode)
//!   │ Alarm │ ◀──────────────────────────────────────
//!   └───────┘
//! ```
//!
//! Every transition replaces the mode value, logs `old -> new` and
//! broadcasts a [`SenseState`].

pub mod led;
pub mod modes;

use core::fmt::Write;
use std::sync::Arc;

use log::{info, warn};

pub use led::AmbientLightAdjustedLed;
pub use modes::{Mode, ModeId};

use crate::app::ports::PolychromeLed;
use crate::config::HubConfig;
use crate::drivers::button::ButtonId;
use crate::edge_detector::{Edge, HysteresisEdgeDetector};
use crate::error::BusError;
use crate::events::{
    AlarmStateChange, ControlAction, Event, EventBus, LedValue, MorseCodeValue, MorseEncodeRequest,
    MorseMessage, SenseState, TimerRequest, TimerToken,
};
use crate::pubsub::SubscribeToken;
use crate::sensors::air_quality::{led_value_for_score, AirQualityDescription, MAX_SCORE};

/// Highest alarm threshold the buttons can select.
pub const MAX_THRESHOLD: u16 = 768;

/// Threshold step, and the gap between the alarm and silence thresholds.
pub const THRESHOLD_INCREMENT: u16 = 128;

/// Shown while the threshold editor times out.
const THRESHOLD_TIMEOUT_MESSAGE: &str = "TTT";

/// Timeouts and intervals taken from [`HubConfig`].
#[derive(Debug, Clone, Copy)]
struct Timing {
    threshold_mode_s: u16,
    repeat_alarm_s: u16,
    silence_alarm_s: u16,
    morse_interval_ms: u32,
}

pub struct StateManager<L> {
    bus: Arc<EventBus>,
    led: AmbientLightAdjustedLed<L>,
    mode: Mode,
    alarm: bool,
    alarm_silenced: bool,
    alarm_threshold: u16,
    edge_detector: HysteresisEdgeDetector<u16>,
    /// Exponentially smoothed score; `None` until the first reading.
    air_quality: Option<u16>,
    /// Colour rotation owns the LED colour until the demo ends.
    demo_active: bool,
    /// Bit per [`ButtonId`] currently held down.
    held_buttons: u8,
    timing: Timing,
}

impl<L: PolychromeLed> StateManager<L> {
    pub fn new(bus: Arc<EventBus>, led: L, config: &HubConfig) -> Self {
        // `HubConfig` fields are public, so an unvalidated threshold can
        // reach this point.
        let alarm_threshold = config.alarm_threshold.min(MAX_THRESHOLD);
        let mut edge_detector =
            HysteresisEdgeDetector::new(alarm_threshold, alarm_threshold + THRESHOLD_INCREMENT);
        // Start from "good air" so the first bad reading raises the alarm.
        let _ = edge_detector.update(MAX_SCORE);

        Self {
            bus,
            led: AmbientLightAdjustedLed::new(led),
            mode: Mode::Monitor,
            alarm: false,
            alarm_silenced: false,
            alarm_threshold,
            edge_detector,
            air_quality: None,
            demo_active: config.demo_mode_secs > 0,
            held_buttons: 0,
            timing: Timing {
                threshold_mode_s: config.threshold_mode_timeout_s,
                repeat_alarm_s: config.repeat_alarm_timeout_s,
                silence_alarm_s: config.silence_alarm_timeout_s,
                morse_interval_ms: config.morse_interval_ms,
            },
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn alarm(&self) -> bool {
        self.alarm
    }

    pub fn alarm_silenced(&self) -> bool {
        self.alarm_silenced
    }

    pub fn alarm_threshold(&self) -> u16 {
        self.alarm_threshold
    }

    pub fn air_quality(&self) -> Option<u16> {
        self.air_quality
    }

    pub fn demo_active(&self) -> bool {
        self.demo_active
    }

    pub fn led(&self) -> &AmbientLightAdjustedLed<L> {
        &self.led
    }

    pub fn state(&self) -> SenseState {
        SenseState {
            alarm: self.alarm,
            alarm_threshold: self.alarm_threshold,
            air_quality: self.air_quality,
            description: self.air_quality.map(AirQualityDescription::for_score),
            mode: self.mode.id(),
        }
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Handle one bus event.
    pub fn update(&mut self, event: Event) {
        match event {
            Event::AirQuality(e) => self.update_air_quality(e.score),
            Event::ButtonA(e) => self.on_button(ButtonId::A, e.pressed),
            Event::ButtonB(e) => self.on_button(ButtonId::B, e.pressed),
            Event::ButtonX(e) => self.on_button(ButtonId::X, e.pressed),
            Event::ButtonY(e) => self.on_button(ButtonId::Y, e.pressed),
            Event::TimerExpired(e) => self.on_timer_expired(e.token),
            Event::MorseCodeValue(e) => self.on_morse_code_value(e),
            Event::AmbientLightSample(e) => {
                self.led.update_brightness_from_ambient_light(e.sample_lux);
            }
            Event::ProximitySample(e) => self.led.update_brightness_from_proximity(e.sample),
            Event::StateManagerControl(e) => self.handle_control(e.action),
            Event::AirQualityThreshold(e) => self.set_thresholds_checked(e.alarm, e.silence),
            Event::AlarmSilenceRequest(e) => self.silence_alarms(e.duration_s),
            Event::DemoModeTimerExpired(_) => self.end_demo(),
            Event::LedValueColorRotationMode(v) => {
                if self.demo_active {
                    self.on_led_value(v.0);
                }
            }
            Event::LedValueAirQualityMode(v) => self.on_led_value(v.0),
            Event::LedValueMorseCodeMode(v) => self.on_led_value(v.0),
            Event::LedValueProximityMode(v) => self.on_led_value(v.0),
            Event::ProximityStateChange(_)
            | Event::AlarmStateChange(_)
            | Event::TimerRequest(_)
            | Event::MorseEncodeRequest(_)
            | Event::SenseState(_) => {}
        }
    }

    // ── Per-mode handlers ─────────────────────────────────────

    fn on_button(&mut self, id: ButtonId, pressed: bool) {
        let bit = 1u8 << button_index(id);
        if pressed {
            if self.held_buttons & bit != 0 {
                return;
            }
            let was_idle = self.held_buttons == 0;
            self.held_buttons |= bit;
            if was_idle {
                self.led.set_held(true);
            }
            self.on_button_pressed(id);
        } else {
            if self.held_buttons & bit == 0 {
                return;
            }
            self.held_buttons &= !bit;
            if self.held_buttons == 0 {
                self.led.set_held(false);
            }
        }
    }

    fn on_button_pressed(&mut self, id: ButtonId) {
        match (self.mode.id(), id) {
            (ModeId::Threshold, ButtonId::A) => self.increment_threshold(),
            (ModeId::Threshold, ButtonId::B) => self.decrement_threshold(),
            (ModeId::Threshold, ButtonId::X | ButtonId::Y) => self.reset_mode(),
            (ModeId::Alarm, ButtonId::X) => self.silence_alarms(self.timing.silence_alarm_s),
            (ModeId::Alarm, ButtonId::Y) => {}
            (_, ButtonId::A | ButtonId::B) => self.set_mode(Mode::Threshold),
            (_, ButtonId::X) => self.reset_mode(),
            (_, ButtonId::Y) => self.start_air_quality_readout(),
        }
    }

    fn on_led_value(&mut self, value: LedValue) {
        match self.mode.id() {
            ModeId::Monitor | ModeId::Alarm => self.led.set_color(value),
            ModeId::Threshold | ModeId::MorseReadout => {}
        }
    }

    fn on_morse_code_value(&mut self, value: MorseCodeValue) {
        match self.mode.id() {
            ModeId::Alarm => {
                self.led.set_on_off(value.turn_on);
                if value.message_finished {
                    self.request_timer(TimerToken::REPEAT_ALARM, self.timing.repeat_alarm_s);
                }
            }
            ModeId::MorseReadout => {
                self.led.set_on_off(value.turn_on);
                if value.message_finished {
                    self.reset_mode();
                }
            }
            ModeId::Monitor | ModeId::Threshold => {}
        }
    }

    fn on_timer_expired(&mut self, token: TimerToken) {
        match (self.mode.id(), token) {
            (ModeId::Threshold, TimerToken::THRESHOLD_MODE) => {
                self.set_mode(Mode::MorseReadout {
                    message: MorseMessage::new(THRESHOLD_TIMEOUT_MESSAGE),
                });
            }
            (ModeId::Alarm, TimerToken::REPEAT_ALARM) => self.announce_alarm(),
            (_, TimerToken::SILENCE_ALARM) => {
                info!("Alarm silence period over");
                self.alarm_silenced = false;
                self.broadcast_state();
            }
            _ => {}
        }
    }

    // ── Transitions ───────────────────────────────────────────

    fn set_mode(&mut self, mode: Mode) {
        let old = self.mode.name();
        self.mode = mode;
        info!("StateManager: {} -> {}", old, self.mode.name());
        self.enter_mode();
        self.broadcast_state();
    }

    fn enter_mode(&mut self) {
        match self.mode {
            Mode::Monitor => {
                self.led.set_on_off(true);
                if let Some(score) = self.air_quality.filter(|_| !self.demo_active) {
                    self.led.set_color(led_value_for_score(score));
                }
            }
            Mode::Threshold => {
                self.led.set_on_off(true);
                self.display_threshold();
            }
            Mode::Alarm => {
                self.led.set_on_off(true);
                self.announce_alarm();
            }
            Mode::MorseReadout { message } => {
                self.led.set_on_off(true);
                self.request_morse(message);
            }
        }
    }

    /// Enter Alarm or Monitor according to the alarm flag.
    fn reset_mode(&mut self) {
        if self.alarm {
            self.set_mode(Mode::Alarm);
        } else {
            self.set_mode(Mode::Monitor);
        }
    }

    // ── Air quality and alarms ────────────────────────────────

    fn update_air_quality(&mut self, score: u16) {
        let smoothed = smooth_exponentially(self.air_quality, score);
        self.air_quality = Some(smoothed);
        if !self.demo_active {
            self.on_led_value(led_value_for_score(smoothed));
        }

        if self.alarm_silenced {
            self.broadcast_state();
            return;
        }
        match self.edge_detector.update(smoothed) {
            Edge::Falling => self.set_alarm(true),
            Edge::Rising => self.set_alarm(false),
            Edge::None => return,
        }
        self.reset_mode();
    }

    fn set_alarm(&mut self, alarm: bool) {
        if self.alarm != alarm {
            self.alarm = alarm;
            self.publish(AlarmStateChange { alarm });
        }
    }

    fn announce_alarm(&mut self) {
        let score = self.air_quality.unwrap_or_default();
        let mut message = MorseMessage::empty();
        if write!(message, "{}", score).is_err() {
            warn!("StateManager: alarm message truncated");
        }
        self.request_morse(message);
    }

    fn silence_alarms(&mut self, duration_s: u16) {
        info!("Silencing alarms for {}s", duration_s);
        self.set_alarm(false);
        self.alarm_silenced = true;
        // Re-arm from "good air" so the next bad reading after the silence
        // raises a fresh alarm.
        let _ = self.edge_detector.update(MAX_SCORE);
        self.request_timer(TimerToken::SILENCE_ALARM, duration_s);
        self.reset_mode();
    }

    // ── Threshold editing ─────────────────────────────────────

    fn increment_threshold(&mut self) {
        if self.alarm_threshold < MAX_THRESHOLD {
            let next = (self.alarm_threshold + THRESHOLD_INCREMENT).min(MAX_THRESHOLD);
            self.set_alarm_threshold(next);
        }
        self.display_threshold();
    }

    fn decrement_threshold(&mut self) {
        if self.alarm_threshold > 0 {
            self.set_alarm_threshold(self.alarm_threshold.saturating_sub(THRESHOLD_INCREMENT));
        }
        self.display_threshold();
    }

    fn display_threshold(&mut self) {
        self.led.set_color(led_value_for_score(self.alarm_threshold));
        self.request_timer(TimerToken::THRESHOLD_MODE, self.timing.threshold_mode_s);
    }

    fn set_alarm_threshold(&mut self, alarm_threshold: u16) {
        self.set_thresholds(alarm_threshold, alarm_threshold + THRESHOLD_INCREMENT);
    }

    fn set_thresholds_checked(&mut self, alarm: u16, silence: u16) {
        if alarm > silence || silence > MAX_SCORE {
            warn!(
                "Ignoring air quality thresholds: alarm {} silence {}",
                alarm, silence
            );
            return;
        }
        self.set_thresholds(alarm, silence);
    }

    fn set_thresholds(&mut self, alarm: u16, silence: u16) {
        // Any alarm in progress is cleared by a threshold change.
        self.set_alarm(false);
        self.alarm_threshold = alarm;
        self.edge_detector.set_low_and_high_thresholds(alarm, silence);
        let _ = self.edge_detector.update(MAX_SCORE);
        info!(
            "Air quality thresholds set: alarm at {}, silence at {}",
            alarm, silence
        );
        self.broadcast_state();
    }

    /// Remote controls step the threshold without entering the editor.
    fn handle_control(&mut self, action: ControlAction) {
        match action {
            ControlAction::IncrementThreshold => self.increment_threshold(),
            ControlAction::DecrementThreshold => self.decrement_threshold(),
            ControlAction::SilenceAlarms => self.silence_alarms(self.timing.silence_alarm_s),
        }
    }

    // ── Readout and demo ──────────────────────────────────────

    fn start_air_quality_readout(&mut self) {
        let Some(score) = self.air_quality else {
            info!("No air quality reading yet; readout skipped");
            return;
        };
        let mut message = MorseMessage::empty();
        if write!(message, "AQ {} {}", AirQualityDescription::for_score(score), score).is_err() {
            warn!("StateManager: readout message truncated");
        }
        info!("{}", message);
        self.set_mode(Mode::MorseReadout { message });
    }

    fn end_demo(&mut self) {
        if !self.demo_active {
            return;
        }
        info!("Demo mode over");
        self.demo_active = false;
        if let Some(score) = self.air_quality {
            self.on_led_value(led_value_for_score(score));
        }
    }

    // ── Outputs ───────────────────────────────────────────────

    fn request_timer(&self, token: TimerToken, timeout_s: u16) {
        self.publish(TimerRequest { token, timeout_s });
    }

    fn request_morse(&self, message: MorseMessage) {
        self.publish(MorseEncodeRequest {
            message,
            repeat: 1,
            interval_ms: self.timing.morse_interval_ms,
        });
    }

    fn broadcast_state(&self) {
        self.publish(self.state());
    }

    fn publish(&self, event: impl Into<Event>) {
        let event = event.into();
        if !self.bus.publish(event) {
            warn!("StateManager: dropped {}", event.name());
        }
    }
}

impl<L: PolychromeLed + Send + 'static> StateManager<L> {
    /// Subscribe to every bus event.  The manager moves into the
    /// subscription and from then on is only touched by the worker.
    pub fn install(self) -> Result<SubscribeToken, BusError> {
        let bus = Arc::clone(&self.bus);
        let mut manager = self;
        bus.subscribe(move |event| manager.update(event))
            .ok_or(BusError::SubscribersFull)
    }
}

/// `aggregate += (next - aggregate) / 4`, seeded by the first value.
fn smooth_exponentially(aggregate: Option<u16>, next: u16) -> u16 {
    match aggregate {
        None => next,
        Some(current) => {
            let current = i32::from(current);
            (current + (i32::from(next) - current) / 4) as u16
        }
    }
}

fn button_index(id: ButtonId) -> u8 {
    match id {
        ButtonId::A => 0,
        ButtonId::B => 1,
        ButtonId::X => 2,
        ButtonId::Y => 3,
    }
}
