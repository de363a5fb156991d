//! Brightness-managed view of the status LED.
//!
//! Keeps the colour, on/off state and brightness the modes asked for, and
//! writes them through to the hardware LED.  Brightness follows the
//! ambient light (so the LED is not blinding in the dark) and is raised
//! when something is close to the proximity sensor.
//!
//! While any button is held, a hold layer shows plain white at fixed
//! brightness.  Mode changes made during the hold are recorded and shown
//! when the hold ends.

use log::debug;

use crate::app::ports::PolychromeLed;
use crate::events::LedValue;

pub const MIN_BRIGHTNESS: u8 = 10;
pub const MAX_BRIGHTNESS: u8 = 255;
pub const DEFAULT_BRIGHTNESS: u8 = 255;

/// Shown while a button is held.
pub const HOLD_COLOR: LedValue = LedValue::new(255, 255, 255);
pub const HOLD_BRIGHTNESS: u8 = 255;

const MIN_LUX: f32 = 40.0;
const MAX_LUX: f32 = 3000.0;

/// Proximity levels below this are sensor noise.
const PROXIMITY_NOISE_FLOOR: u8 = 3;

/// `aggregate += (next - aggregate) / 4`, seeded by the first value.
fn smooth_exponentially(aggregate: &mut Option<f32>, next: f32) -> f32 {
    const DECAY: f32 = 4.0;
    let value = match *aggregate {
        None => next,
        Some(current) => current + (next - current) / DECAY,
    };
    *aggregate = Some(value);
    value
}

/// Brightness for a smoothed lux level.
pub fn brightness_for_lux(lux: f32) -> u8 {
    if lux < MIN_LUX {
        MIN_BRIGHTNESS
    } else if lux > MAX_LUX {
        MAX_BRIGHTNESS
    } else {
        let range = f32::from(MAX_BRIGHTNESS - MIN_BRIGHTNESS);
        let scaled = ((lux - MIN_LUX) / (MAX_LUX - MIN_LUX) * range).round();
        scaled as u8 + MIN_BRIGHTNESS
    }
}

/// Brightness floor for a raw proximity sample.
pub fn brightness_for_proximity(sample: u16) -> u8 {
    let level = (sample >> 7).min(u16::from(u8::MAX)) as u8;
    if level < PROXIMITY_NOISE_FLOOR { 0 } else { level }
}

pub struct AmbientLightAdjustedLed<L> {
    led: L,
    color: LedValue,
    on: bool,
    ambient_lux: Option<f32>,
    ambient_brightness: u8,
    proximity_brightness: u8,
    held: bool,
}

impl<L: PolychromeLed> AmbientLightAdjustedLed<L> {
    /// Takes over `led`: black, default brightness, on.
    pub fn new(led: L) -> Self {
        let mut this = Self {
            led,
            color: LedValue::default(),
            on: true,
            ambient_lux: None,
            ambient_brightness: DEFAULT_BRIGHTNESS,
            proximity_brightness: 0,
            held: false,
        };
        this.write_all();
        this
    }

    pub fn set_color(&mut self, value: LedValue) {
        self.color = value;
        if !self.held {
            self.led.set_color(value.r, value.g, value.b);
        }
    }

    pub fn set_on_off(&mut self, on: bool) {
        self.on = on;
        if !self.held {
            self.led.set_on_off(on);
        }
    }

    pub fn update_brightness_from_ambient_light(&mut self, sample_lux: f32) {
        let lux = smooth_exponentially(&mut self.ambient_lux, sample_lux);
        self.ambient_brightness = brightness_for_lux(lux);
        debug!(
            "Ambient light: mean_lux={:.1}, brightness={}",
            lux, self.ambient_brightness
        );
        self.write_brightness();
    }

    pub fn update_brightness_from_proximity(&mut self, sample: u16) {
        let level = brightness_for_proximity(sample);
        if level != self.proximity_brightness {
            self.proximity_brightness = level;
            self.write_brightness();
        }
    }

    /// Enter or leave the button-hold layer.
    pub fn set_held(&mut self, held: bool) {
        if held == self.held {
            return;
        }
        self.held = held;
        if held {
            self.led.set_color(HOLD_COLOR.r, HOLD_COLOR.g, HOLD_COLOR.b);
            self.led.set_brightness(HOLD_BRIGHTNESS);
            self.led.set_on_off(true);
        } else {
            self.write_all();
        }
    }

    /// Colour requested by the active mode (not the hold colour).
    pub fn color(&self) -> LedValue {
        self.color
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Brightness requested outside the hold layer.
    pub fn brightness(&self) -> u8 {
        self.ambient_brightness.max(self.proximity_brightness)
    }

    pub fn inner(&self) -> &L {
        &self.led
    }

    fn write_brightness(&mut self) {
        if !self.held {
            let brightness = self.brightness();
            self.led.set_brightness(brightness);
        }
    }

    fn write_all(&mut self) {
        self.led.set_color(self.color.r, self.color.g, self.color.b);
        self.led.set_brightness(self.brightness());
        self.led.set_on_off(self.on);
    }
}
