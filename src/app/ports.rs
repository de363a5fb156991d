//! Port traits: the boundary between the hub core and the hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ StateManager / SamplingLoop
//! ```
//!
//! Driven adapters (LED, sensors) implement these traits.  The core
//! consumes them via generics, so nothing in the core touches registers,
//! PWM or I2C directly.  Button inputs use `embedded_hal::digital::InputPin`
//! instead of a port of their own.

use crate::error::SensorError;
use crate::sensors::air_quality::AirMeasurement;

// ───────────────────────────────────────────────────────────────
// LED port (driven adapter: core → hardware)
// ───────────────────────────────────────────────────────────────

/// A single RGB LED.  Gamma correction and PWM are the adapter's concern.
pub trait PolychromeLed {
    fn set_color(&mut self, r: u8, g: u8, b: u8);

    fn set_brightness(&mut self, brightness: u8);

    fn set_on_off(&mut self, on: bool);
}

/// A single-colour status LED.
pub trait MonochromeLed {
    fn is_on(&self) -> bool;

    fn set_on_off(&mut self, on: bool);

    fn toggle(&mut self) {
        let on = self.is_on();
        self.set_on_off(!on);
    }
}

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapters: hardware → core)
// ───────────────────────────────────────────────────────────────

/// Reflective proximity sensor, 0 (far) to 65535 (near).
pub trait ProximitySensor {
    fn enable(&mut self) -> Result<(), SensorError>;

    fn disable(&mut self) -> Result<(), SensorError>;

    /// Returns [`SensorError::NotEnabled`] before [`enable`](Self::enable).
    fn read_sample(&mut self) -> Result<u16, SensorError>;
}

pub trait AmbientLightSensor {
    fn read_sample_lux(&mut self) -> Result<f32, SensorError>;
}

/// Gas / humidity sensor.  `measure` blocks until the conversion is done,
/// so it is only called from the sampling thread.
pub trait AirSensor {
    fn measure(&mut self) -> Result<AirMeasurement, SensorError>;
}
