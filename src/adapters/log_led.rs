//! Log-based LED adapter.
//!
//! Implements [`PolychromeLed`] and [`MonochromeLed`] by writing every
//! visible change to the logger.  Used by the host build, where there is no
//! LED to drive.

use log::{debug, info};

use crate::app::ports::{MonochromeLed, PolychromeLed};

#[derive(Debug)]
pub struct LogLed {
    rgb: (u8, u8, u8),
    brightness: u8,
    on: bool,
}

impl LogLed {
    pub fn new() -> Self {
        Self {
            rgb: (0, 0, 0),
            brightness: 0,
            on: false,
        }
    }

    pub fn current(&self) -> ((u8, u8, u8), u8, bool) {
        (self.rgb, self.brightness, self.on)
    }
}

impl Default for LogLed {
    fn default() -> Self {
        Self::new()
    }
}

impl PolychromeLed for LogLed {
    fn set_color(&mut self, r: u8, g: u8, b: u8) {
        if self.rgb != (r, g, b) {
            self.rgb = (r, g, b);
            // Colour rotation changes the colour every tick.
            debug!("LED | #{:02x}{:02x}{:02x}", r, g, b);
        }
    }

    fn set_brightness(&mut self, brightness: u8) {
        if self.brightness != brightness {
            self.brightness = brightness;
            debug!("LED | brightness={}", brightness);
        }
    }

    fn set_on_off(&mut self, on: bool) {
        if self.on != on {
            self.on = on;
            let (r, g, b) = self.rgb;
            info!(
                "LED | {} #{:02x}{:02x}{:02x}",
                if on { "ON " } else { "OFF" },
                r,
                g,
                b
            );
        }
    }
}

/// Status LED.
#[derive(Debug, Default)]
pub struct LogStatusLed {
    on: bool,
}

impl MonochromeLed for LogStatusLed {
    fn is_on(&self) -> bool {
        self.on
    }

    fn set_on_off(&mut self, on: bool) {
        if self.on != on {
            self.on = on;
            debug!("STATUS LED | {}", if on { "ON" } else { "OFF" });
        }
    }
}
