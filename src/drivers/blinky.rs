//! Status LED blinker.
//!
//! Blinks a [`MonochromeLed`] a given number of times, or until stopped,
//! by re-arming a [`OneShotTimer`] after every toggle.  Polled from the
//! worker tick like the other time-driven components, so it never sleeps.

use embassy_time::{Duration, Instant};
use log::info;

use crate::app::ports::MonochromeLed;
use crate::timer::OneShotTimer;

/// Used when a blink request carries an interval of 0.
pub const DEFAULT_INTERVAL_MS: u32 = 1000;

pub struct Blinky<L> {
    led: L,
    timer: OneShotTimer,
    interval: Duration,
    /// Toggles left in the current sequence.  `None` blinks until stopped.
    remaining: Option<u32>,
}

impl<L: MonochromeLed> Blinky<L> {
    pub fn new(led: L) -> Self {
        Self {
            led,
            timer: OneShotTimer::new(),
            interval: Duration::from_millis(u64::from(DEFAULT_INTERVAL_MS)),
            remaining: Some(0),
        }
    }

    /// Flip the LED once.  Any blink sequence in progress is abandoned.
    pub fn toggle(&mut self) {
        self.timer.cancel();
        self.remaining = Some(0);
        self.led.toggle();
        info!("Blinky: toggled {}", if self.led.is_on() { "on" } else { "off" });
    }

    /// Start blinking `count` times, each on and off phase lasting
    /// `interval_ms`.  A count of 0 blinks until [`stop`](Self::stop).
    /// Replaces any sequence in progress and starts from dark.
    pub fn blink(&mut self, count: u32, interval_ms: u32, now: Instant) {
        self.timer.cancel();
        self.led.set_on_off(false);

        // Each blink is an on/off pair.
        self.remaining = match count.checked_mul(2) {
            Some(0) | None => None,
            toggles => toggles,
        };
        let interval_ms = if interval_ms == 0 {
            DEFAULT_INTERVAL_MS
        } else {
            interval_ms
        };
        self.interval = Duration::from_millis(u64::from(interval_ms));

        match self.remaining {
            Some(toggles) => info!("Blinky: {} blinks at {}ms", toggles / 2, interval_ms),
            None => info!("Blinky: blinking forever at {}ms", interval_ms),
        }
        self.timer.invoke_after(now, self.interval);
    }

    /// Stop blinking and leave the LED dark.
    pub fn stop(&mut self) {
        self.timer.cancel();
        self.remaining = Some(0);
        self.led.set_on_off(false);
    }

    pub fn is_idle(&self) -> bool {
        !self.timer.is_pending()
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    pub fn poll(&mut self, now: Instant) {
        if !self.timer.poll(now) {
            return;
        }
        self.led.toggle();
        if let Some(left) = self.remaining {
            let left = left.saturating_sub(1);
            self.remaining = Some(left);
            if left == 0 {
                info!("Blinky: stopped");
                return;
            }
        }
        self.timer.invoke_after(now, self.interval);
    }
}
