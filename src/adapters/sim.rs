//! Simulated peripherals for the host build.
//!
//! A [`SimEnvironment`] holds the readings every simulated sensor returns
//! and the levels of the four button lines.  The host binary changes them
//! from stdin; tests can change them directly.
//!
//! Button lines are active-low like the board's pulled-up switches.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embedded_hal::digital::{ErrorType, InputPin};
use parking_lot::Mutex;

use crate::app::ports::{AirSensor, AmbientLightSensor, ProximitySensor};
use crate::drivers::button::ButtonId;
use crate::error::SensorError;
use crate::sensors::air_quality::AirMeasurement;

#[derive(Debug, Clone, Copy)]
struct Readings {
    lux: f32,
    proximity: u16,
    air: AirMeasurement,
}

#[derive(Clone)]
pub struct SimEnvironment {
    readings: Arc<Mutex<Readings>>,
    /// Raw line levels, `true` = high (released).
    lines: Arc<[AtomicBool; 4]>,
}

impl SimEnvironment {
    pub fn new() -> Self {
        Self {
            readings: Arc::new(Mutex::new(Readings {
                lux: 400.0,
                proximity: 0,
                air: AirMeasurement::default(),
            })),
            lines: Arc::new([
                AtomicBool::new(true),
                AtomicBool::new(true),
                AtomicBool::new(true),
                AtomicBool::new(true),
            ]),
        }
    }

    pub fn set_lux(&self, lux: f32) {
        self.readings.lock().lux = lux;
    }

    pub fn set_proximity(&self, sample: u16) {
        self.readings.lock().proximity = sample;
    }

    pub fn set_gas_resistance(&self, ohms: f32) {
        self.readings.lock().air.gas_resistance_ohms = ohms;
    }

    pub fn set_humidity(&self, pct: f32) {
        self.readings.lock().air.humidity_pct = pct;
    }

    pub fn set_button(&self, id: ButtonId, pressed: bool) {
        self.lines[line_index(id)].store(!pressed, Ordering::Release);
    }

    pub fn ambient_light(&self) -> SimAmbientLight {
        SimAmbientLight(self.clone())
    }

    pub fn proximity(&self) -> SimProximity {
        SimProximity {
            env: self.clone(),
            enabled: false,
        }
    }

    pub fn air(&self) -> SimAir {
        SimAir(self.clone())
    }

    /// Button pins in A, B, X, Y order.
    pub fn button_pins(&self) -> [SimPin; 4] {
        ButtonId::ALL.map(|id| SimPin {
            env: self.clone(),
            index: line_index(id),
        })
    }
}

impl Default for SimEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

fn line_index(id: ButtonId) -> usize {
    match id {
        ButtonId::A => 0,
        ButtonId::B => 1,
        ButtonId::X => 2,
        ButtonId::Y => 3,
    }
}

pub struct SimAmbientLight(SimEnvironment);

impl AmbientLightSensor for SimAmbientLight {
    fn read_sample_lux(&mut self) -> Result<f32, SensorError> {
        Ok(self.0.readings.lock().lux)
    }
}

pub struct SimProximity {
    env: SimEnvironment,
    enabled: bool,
}

impl ProximitySensor for SimProximity {
    fn enable(&mut self) -> Result<(), SensorError> {
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), SensorError> {
        self.enabled = false;
        Ok(())
    }

    fn read_sample(&mut self) -> Result<u16, SensorError> {
        if !self.enabled {
            return Err(SensorError::NotEnabled);
        }
        Ok(self.env.readings.lock().proximity)
    }
}

pub struct SimAir(SimEnvironment);

impl AirSensor for SimAir {
    fn measure(&mut self) -> Result<AirMeasurement, SensorError> {
        let air = self.0.readings.lock().air;
        if air.gas_resistance_ohms <= 0.0 {
            return Err(SensorError::OutOfRange);
        }
        Ok(air)
    }
}

pub struct SimPin {
    env: SimEnvironment,
    index: usize,
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.env.lines[self.index].load(Ordering::Acquire))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}
