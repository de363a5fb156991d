//! Morse code encoder.
//!
//! Turns a [`MorseMessage`] into a timed on/off sequence.  Each letter is
//! pre-encoded into a bit string, least significant bit first, one bit per
//! dit-length interval (`1` = on):
//!
//! ```text
//!   dit  = 1 0          dah = 1 1 1 0
//!   each letter starts with 2 blank bits (3 with the previous trailer)
//!   a word break adds 4 more blank bits (7 in total)
//! ```
//!
//! The encoder is polled from the worker tick.  It emits one output per
//! toggle and, after the last repetition, a final
//! `(turn_on = false, message_finished = true)`.

use std::sync::Arc;

use embassy_time::{Duration, Instant};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::error::BusError;
use crate::events::{EventBus, MorseCodeValue, MorseEncodeRequest, MorseMessage};
use crate::pubsub::SubscribeToken;
use crate::timer::{Clock, OneShotTimer};

/// Dit length used when a request does not specify one.
pub const DEFAULT_INTERVAL_MS: u32 = 60;

/// Blank bits added for a word break.
const WORD_BREAK_BITS: u32 = 4;

/// Receives encoder output edges.
pub trait MorseOutput {
    fn emit(&mut self, turn_on: bool, message_finished: bool);
}

/// Publishes encoder output as `MorseCodeValue` events.
pub struct BusOutput(pub Arc<EventBus>);

impl MorseOutput for BusOutput {
    fn emit(&mut self, turn_on: bool, message_finished: bool) {
        let value = MorseCodeValue {
            turn_on,
            message_finished,
        };
        if !self.0.publish(value) {
            warn!("Morse: dropped output {:?}", value);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Encoding {
    bits: u32,
    num_bits: u32,
}

impl Encoding {
    const fn from_pattern(pattern: &[u8]) -> Self {
        let mut bits = 0u32;
        let mut num_bits = 2u32;
        let mut i = 0;
        while i < pattern.len() {
            if pattern[i] == b'.' {
                bits |= 0b1 << num_bits;
                num_bits += 2;
            } else {
                bits |= 0b111 << num_bits;
                num_bits += 4;
            }
            i += 1;
        }
        Self { bits, num_bits }
    }
}

fn pattern_for(c: u8) -> &'static [u8] {
    match c.to_ascii_uppercase() {
        b'A' => b".-",
        b'B' => b"-...",
        b'C' => b"-.-.",
        b'D' => b"-..",
        b'E' => b".",
        b'F' => b"..-.",
        b'G' => b"--.",
        b'H' => b"....",
        b'I' => b"..",
        b'J' => b".---",
        b'K' => b"-.-",
        b'L' => b".-..",
        b'M' => b"--",
        b'N' => b"-.",
        b'O' => b"---",
        b'P' => b".--.",
        b'Q' => b"--.-",
        b'R' => b".-.",
        b'S' => b"...",
        b'T' => b"-",
        b'U' => b"..-",
        b'V' => b"...-",
        b'W' => b".--",
        b'X' => b"-..-",
        b'Y' => b"-.--",
        b'Z' => b"--..",
        b'0' => b"-----",
        b'1' => b".----",
        b'2' => b"..---",
        b'3' => b"...--",
        b'4' => b"....-",
        b'5' => b".....",
        b'6' => b"-....",
        b'7' => b"--...",
        b'8' => b"---..",
        b'9' => b"----.",
        b'@' => b".--.-.",
        _ => b"..--..",
    }
}

pub struct Encoder<O> {
    output: O,
    message: MorseMessage,
    offset: usize,
    remaining: u32,
    forever: bool,
    interval: Duration,
    bits: u32,
    num_bits: u32,
    is_on: bool,
    active: bool,
    timer: OneShotTimer,
}

impl<O: MorseOutput> Encoder<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            message: MorseMessage::empty(),
            offset: 0,
            remaining: 0,
            forever: false,
            interval: Duration::from_millis(u64::from(DEFAULT_INTERVAL_MS)),
            bits: 0,
            num_bits: 0,
            is_on: false,
            active: false,
            timer: OneShotTimer::new(),
        }
    }

    /// Start sending `message` `repeat` times (0 = until replaced).  Any
    /// message in flight is abandoned.
    pub fn encode(&mut self, message: MorseMessage, repeat: u32, interval_ms: u32, now: Instant) {
        self.timer.cancel();
        let interval_ms = if interval_ms == 0 { DEFAULT_INTERVAL_MS } else { interval_ms };
        debug!("Morse: encoding {:?} x{} @{}ms", message, repeat, interval_ms);

        self.message = message;
        self.offset = 0;
        self.remaining = repeat;
        self.forever = repeat == 0;
        self.interval = Duration::from_millis(u64::from(interval_ms));
        self.bits = 0;
        self.num_bits = 0;
        self.is_on = false;
        self.active = true;

        if message.is_blank() {
            self.finish();
            return;
        }
        self.schedule_update(now);
    }

    pub fn handle_request(&mut self, request: MorseEncodeRequest, now: Instant) {
        self.encode(request.message, request.repeat, request.interval_ms, now);
    }

    /// Abandon the current message without reporting completion.
    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.active = false;
        self.is_on = false;
    }

    pub fn is_idle(&self) -> bool {
        !self.active
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Run every toggle due by `now`.
    pub fn poll(&mut self, now: Instant) {
        while let Some(due) = self.timer.deadline() {
            if !self.timer.poll(now) {
                return;
            }
            self.is_on = !self.is_on;
            self.output.emit(self.is_on, false);
            // Timing is anchored to the deadline so poll jitter does not
            // stretch the symbols.
            self.schedule_update(due);
        }
    }

    /// Consume bits until the output would change, then arm the timer for
    /// that change.
    fn schedule_update(&mut self, from: Instant) {
        let mut delay = Duration::from_ticks(0);
        loop {
            if self.num_bits == 0 && !self.enqueue_next() {
                self.finish();
                return;
            }
            let want_on = self.bits & 1 != 0;
            if want_on != self.is_on {
                break;
            }
            self.bits >>= 1;
            self.num_bits -= 1;
            delay += self.interval;
        }
        self.timer.invoke_after(from, delay);
    }

    /// Load the next letter, wrapping for repetitions.  Returns `false`
    /// once every repetition has been sent.
    fn enqueue_next(&mut self) -> bool {
        let mut gap = 0;
        loop {
            let bytes = self.message.as_bytes();
            if self.offset >= bytes.len() {
                if !self.forever {
                    self.remaining = self.remaining.saturating_sub(1);
                    if self.remaining == 0 {
                        return false;
                    }
                }
                self.offset = 0;
                gap = WORD_BREAK_BITS;
                continue;
            }

            let c = bytes[self.offset];
            self.offset += 1;
            if c.is_ascii_whitespace() {
                gap = WORD_BREAK_BITS;
                continue;
            }

            let encoding = Encoding::from_pattern(pattern_for(c));
            self.bits = encoding.bits << gap;
            self.num_bits = encoding.num_bits + gap;
            return true;
        }
    }

    fn finish(&mut self) {
        self.timer.cancel();
        self.active = false;
        self.is_on = false;
        self.output.emit(false, true);
    }
}

/// Start `encoder` on every `MorseEncodeRequest` from the bus.  The caller
/// keeps polling it from the tick.
pub fn install(
    bus: &Arc<EventBus>,
    encoder: &Arc<Mutex<Encoder<BusOutput>>>,
    clock: Clock,
) -> Result<SubscribeToken, BusError> {
    let encoder = Arc::clone(encoder);
    bus.subscribe_to::<MorseEncodeRequest, _>(move |request| {
        encoder.lock().handle_request(request, clock());
    })
    .ok_or(BusError::SubscribersFull)
}
