//! Event catalogue for the hub's publish/subscribe bus.
//!
//! Events are produced by:
//! - the sampling thread (ambient light, proximity, air quality)
//! - the button sampler (debounced edges)
//! - timers (event timers, Morse encoder, colour rotation)
//! - the state manager itself (timer requests, Morse requests, state)
//!
//! Every variant wraps a small plain-data struct.  The bus stores events by
//! value in a fixed-capacity queue and copies them into each subscriber, so
//! the whole enum must stay `Copy + Send + 'static`; that is checked at
//! compile time at the bottom of this file.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Sampling    │────▶│              │     │ StateManager │
//! │ Buttons     │────▶│   PubSub     │────▶│ EventTimers  │
//! │ Timers      │────▶│  (bounded)   │     │ Morse, ...   │
//! │ Subscribers │────▶│              │     │ (on worker)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::fmt;

use crate::pubsub::{EventVariant, PubSub};
use crate::sensors::air_quality::AirQualityDescription;
use crate::state_manager::ModeId;

/// Maximum number of events waiting for delivery.
pub const EVENT_QUEUE_CAP: usize = 32;

/// Maximum number of live subscribers.
pub const MAX_SUBSCRIBERS: usize = 16;

/// The hub's bus, sized for the device.
pub type EventBus = PubSub<Event, EVENT_QUEUE_CAP, MAX_SUBSCRIBERS>;

// ───────────────────────────────────────────────────────────────
// Shared payload types
// ───────────────────────────────────────────────────────────────

/// An RGB colour destined for the polychrome LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedValue {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl LedValue {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: (hex >> 16) as u8,
            g: (hex >> 8) as u8,
            b: hex as u8,
        }
    }

    pub const fn is_off(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }
}

/// Identifies a registered event timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u32);

impl TimerToken {
    /// Re-announces an active alarm.
    pub const REPEAT_ALARM: Self = Self(1);
    /// Ends an alarm silence period.
    pub const SILENCE_ALARM: Self = Self(2);
    /// Leaves threshold editing.
    pub const THRESHOLD_MODE: Self = Self(3);
}

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Longest text a Morse request can carry.
pub const MORSE_MESSAGE_CAP: usize = 32;

/// Fixed-capacity ASCII text carried inline by [`MorseEncodeRequest`].
///
/// Non-ASCII characters are stored as `?`, which is also what the
/// encoder sends for characters it has no pattern for.  Text beyond
/// [`MORSE_MESSAGE_CAP`] bytes is dropped.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MorseMessage {
    bytes: [u8; MORSE_MESSAGE_CAP],
    len: u8,
}

impl MorseMessage {
    pub const fn empty() -> Self {
        Self {
            bytes: [0; MORSE_MESSAGE_CAP],
            len: 0,
        }
    }

    pub fn new(text: &str) -> Self {
        let mut msg = Self::empty();
        msg.push_str(text);
        msg
    }

    /// Append as much of `text` as fits.  Returns `false` if anything was
    /// dropped.
    pub fn push_str(&mut self, text: &str) -> bool {
        for c in text.chars() {
            if usize::from(self.len) == MORSE_MESSAGE_CAP {
                return false;
            }
            self.bytes[usize::from(self.len)] = if c.is_ascii() { c as u8 } else { b'?' };
            self.len += 1;
        }
        true
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII is ever stored.
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when there is nothing to send: empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.as_bytes().iter().all(u8::is_ascii_whitespace)
    }
}

impl Default for MorseMessage {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Write for MorseMessage {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.push_str(s) { Ok(()) } else { Err(fmt::Error) }
    }
}

impl fmt::Debug for MorseMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for MorseMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote control actions for the state manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    IncrementThreshold,
    DecrementThreshold,
    SilenceAlarms,
}

// ───────────────────────────────────────────────────────────────
// Variant payloads
// ───────────────────────────────────────────────────────────────

macro_rules! button_events {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $name {
                pub pressed: bool,
            }

            impl $name {
                pub const fn new(pressed: bool) -> Self {
                    Self { pressed }
                }
            }
        )*
    };
}

button_events!(ButtonA, ButtonB, ButtonX, ButtonY);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityStateChange {
    pub proximity: bool,
}

/// Raw proximity reading, 0 (far) to 65535 (near).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximitySample {
    pub sample: u16,
}

/// Air-quality score, 0 (terrible) to 1023 (excellent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirQuality {
    pub score: u16,
}

/// Sets the alarm edge thresholds directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirQualityThreshold {
    pub alarm: u16,
    pub silence: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmStateChange {
    pub alarm: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmSilenceRequest {
    pub duration_s: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedValueColorRotationMode(pub LedValue);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedValueAirQualityMode(pub LedValue);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedValueMorseCodeMode(pub LedValue);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedValueProximityMode(pub LedValue);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLightSample {
    pub sample_lux: f32,
}

/// Asks the event timers to fire `token` after `timeout_s` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub token: TimerToken,
    pub timeout_s: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerExpired {
    pub token: TimerToken,
}

/// Asks the Morse encoder to send `message` `repeat` times (0 = forever).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MorseEncodeRequest {
    pub message: MorseMessage,
    pub repeat: u32,
    pub interval_ms: u32,
}

/// One output edge from the Morse encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MorseCodeValue {
    pub turn_on: bool,
    pub message_finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoModeTimerExpired;

/// Aggregate device state, broadcast after every mode or alarm change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseState {
    pub alarm: bool,
    pub alarm_threshold: u16,
    pub air_quality: Option<u16>,
    pub description: Option<AirQualityDescription>,
    pub mode: ModeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateManagerControl {
    pub action: ControlAction,
}

// ───────────────────────────────────────────────────────────────
// The Event sum type
// ───────────────────────────────────────────────────────────────

macro_rules! event_enum {
    ($($variant:ident),* $(,)?) => {
        /// Every message kind that crosses the bus.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum Event {
            $($variant($variant),)*
        }

        impl Event {
            /// Variant name, for logs.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => stringify!($variant),)*
                }
            }
        }

        $(
            impl From<$variant> for Event {
                fn from(value: $variant) -> Self {
                    Self::$variant(value)
                }
            }

            impl EventVariant<Event> for $variant {
                fn extract(event: &Event) -> Option<Self> {
                    match event {
                        Event::$variant(value) => Some(*value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

event_enum!(
    ButtonA,
    ButtonB,
    ButtonX,
    ButtonY,
    ProximityStateChange,
    ProximitySample,
    AirQuality,
    AirQualityThreshold,
    AlarmStateChange,
    AlarmSilenceRequest,
    LedValueColorRotationMode,
    LedValueAirQualityMode,
    LedValueMorseCodeMode,
    LedValueProximityMode,
    AmbientLightSample,
    TimerRequest,
    TimerExpired,
    MorseEncodeRequest,
    MorseCodeValue,
    DemoModeTimerExpired,
    SenseState,
    StateManagerControl,
);

const fn assert_plain_data<T: Copy + Send + 'static>() {}
const _: () = assert_plain_data::<Event>();
