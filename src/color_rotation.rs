//! Colour rotation and demo mode.
//!
//! Walks a table of colour steps, interpolating from each step's colour to
//! the next one over `num_cycles` ticks and wrapping at the end of the
//! table.  Every tick publishes a `LedValueColorRotationMode`.
//!
//! When a demo duration is configured the rotation starts at boot and, once
//! the duration elapses, stops and publishes `DemoModeTimerExpired`.

use std::sync::Arc;

use embassy_time::{Duration, Instant};
use log::{info, warn};

use crate::config::HubConfig;
use crate::events::{DemoModeTimerExpired, EventBus, LedValue, LedValueColorRotationMode};
use crate::lerp::lerp_led;
use crate::timer::OneShotTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub color: LedValue,
    /// Ticks spent moving from this colour to the next.
    pub num_cycles: u16,
}

impl Step {
    pub const fn new(hex: u32, num_cycles: u16) -> Self {
        Self {
            color: LedValue::from_hex(hex),
            num_cycles,
        }
    }
}

/// Magenta, lavender, blue: 50 s per transition at the default step.
pub const PRODUCTION_STEPS: [Step; 3] = [
    Step::new(0xd6_02_70, 2500),
    Step::new(0x9b_4f_96, 2500),
    Step::new(0x00_38_a8, 2500),
];

pub struct ColorRotationManager {
    bus: Arc<EventBus>,
    steps: Vec<Step>,
    current_step: usize,
    step_cycle: u16,
    interval: Duration,
    step_timer: OneShotTimer,
    demo_duration: Option<Duration>,
    demo_timer: OneShotTimer,
}

impl ColorRotationManager {
    /// # Panics
    ///
    /// If `steps` is empty.
    pub fn new(bus: Arc<EventBus>, steps: &[Step], config: &HubConfig) -> Self {
        assert!(!steps.is_empty(), "colour rotation needs at least one step");
        let demo_duration = (config.demo_mode_secs > 0)
            .then(|| Duration::from_secs(u64::from(config.demo_mode_secs)));
        Self {
            bus,
            steps: steps.to_vec(),
            current_step: 0,
            step_cycle: 0,
            interval: Duration::from_millis(u64::from(config.color_rotation_step_ms)),
            step_timer: OneShotTimer::new(),
            demo_duration,
            demo_timer: OneShotTimer::new(),
        }
    }

    /// Start stepping; the first colour is published one interval after
    /// `now`.  Also starts the demo timer if a demo duration is set.
    pub fn start(&mut self, now: Instant) {
        self.step_timer.invoke_after(now, self.interval);
        if let Some(duration) = self.demo_duration {
            self.demo_timer.invoke_after(now, duration);
            info!("ColorRotation: demo mode for {}s", duration.as_secs());
        }
    }

    /// Stop stepping.  Position in the table is kept.
    pub fn stop(&mut self) {
        self.step_timer.cancel();
        self.demo_timer.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.step_timer.is_pending()
    }

    /// Publish the colour for the current tick and advance.
    pub fn update(&mut self) -> LedValue {
        let current = self.steps[self.current_step];
        let next = self.steps[(self.current_step + 1) % self.steps.len()];
        let color = lerp_led(current.color, next.color, self.step_cycle, current.num_cycles);

        self.step_cycle += 1;
        if self.step_cycle >= current.num_cycles {
            self.step_cycle = 0;
            self.current_step = (self.current_step + 1) % self.steps.len();
        }

        if !self.bus.publish(LedValueColorRotationMode(color)) {
            warn!("ColorRotation: dropped colour update");
        }
        color
    }

    /// Run every tick due by `now`, then the demo timer.
    pub fn poll(&mut self, now: Instant) {
        while let Some(due) = self.step_timer.deadline() {
            if !self.step_timer.poll(now) {
                break;
            }
            self.update();
            self.step_timer.invoke_at(due + self.interval);
        }

        if self.demo_timer.poll(now) {
            self.step_timer.cancel();
            info!("ColorRotation: demo mode over");
            if !self.bus.publish(DemoModeTimerExpired) {
                warn!("ColorRotation: dropped demo expiry");
            }
        }
    }
}
