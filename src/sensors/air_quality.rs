//! Air-quality scoring.
//!
//! Raw gas resistance and humidity are folded into a single "quality"
//! figure, `ln(gas_ohms) + 0.04 * humidity_pct`.  The tracker keeps a
//! running mean and variance of that figure (Welford) and scores the latest
//! reading by how many standard deviations it sits from the mean:
//!
//! ```text
//!   score = clamp(((q - mean) / stddev + 3.0) * 256, 0, 1023)
//! ```
//!
//! so 768 is "average for this room", 0 is three deviations worse and
//! 1023 is about one deviation better.  The bias (3.0) and scale (256) are
//! empirical calibration constants.

use core::fmt;

use log::debug;

use crate::events::LedValue;
use crate::lerp::lerp_led;

/// Weight of relative humidity in the quality figure.
const HUMIDITY_FACTOR: f32 = 0.04;

/// Named points on the 0-1023 score scale.  The colours name the LED hue
/// at that score; they carry no other meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Red,
    Orange,
    Yellow,
    LightGreen,
    Green,
    BlueGreen,
    Cyan,
    LightBlue,
    Blue,
}

impl Score {
    pub const fn value(self) -> u16 {
        match self {
            Self::Red => 0,
            Self::Orange => 128,
            Self::Yellow => 256,
            Self::LightGreen => 384,
            Self::Green => 512,
            Self::BlueGreen => 640,
            Self::Cyan => 768,
            Self::LightBlue => 896,
            Self::Blue => 1023,
        }
    }
}

pub const MAX_SCORE: u16 = Score::Blue.value();
pub const AVERAGE_SCORE: u16 = Score::Cyan.value();

/// Width of one colour band on the score scale.
const BAND: u16 = 128;

/// LED colour at each band boundary, worst to best.
const LADDER: [LedValue; 9] = [
    LedValue::new(255, 0, 0),   // Red
    LedValue::new(255, 128, 0), // Orange
    LedValue::new(255, 255, 0), // Yellow
    LedValue::new(128, 255, 0), // LightGreen
    LedValue::new(0, 255, 0),   // Green
    LedValue::new(0, 255, 128), // BlueGreen
    LedValue::new(0, 255, 255), // Cyan
    LedValue::new(0, 128, 255), // LightBlue
    LedValue::new(0, 0, 255),   // Blue
];

/// Colour for `score`, interpolated between the ladder colours.
pub fn led_value_for_score(score: u16) -> LedValue {
    if score >= MAX_SCORE {
        return LADDER[LADDER.len() - 1];
    }
    let band = usize::from(score / BAND);
    let offset = score % BAND;
    // The last band is one point short (896..=1023).
    let den = if band == LADDER.len() - 2 { BAND - 1 } else { BAND };
    lerp_led(LADDER[band], LADDER[band + 1], offset, den)
}

/// Human-readable grade of a score, used by the Morse readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirQualityDescription {
    Invalid,
    Terrible,
    Bad,
    Mediocre,
    Okay,
    Good,
    VeryGood,
    Excellent,
    Superb,
}

impl AirQualityDescription {
    pub fn for_score(score: u16) -> Self {
        match score {
            s if s > MAX_SCORE => Self::Invalid,
            s if s < Score::Orange.value() => Self::Terrible,
            s if s < Score::Yellow.value() => Self::Bad,
            s if s < Score::LightGreen.value() => Self::Mediocre,
            s if s < Score::Green.value() => Self::Okay,
            s if s < Score::BlueGreen.value() => Self::Good,
            s if s < Score::Cyan.value() => Self::VeryGood,
            s if s < Score::LightBlue.value() => Self::Excellent,
            _ => Self::Superb,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::Terrible => "TERRIBLE",
            Self::Bad => "BAD",
            Self::Mediocre => "MEDIOCRE",
            Self::Okay => "OKAY",
            Self::Good => "GOOD",
            Self::VeryGood => "VERY GOOD",
            Self::Excellent => "EXCELLENT",
            Self::Superb => "SUPERB",
        }
    }
}

impl fmt::Display for AirQualityDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reading from the gas sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirMeasurement {
    pub temperature_c: f32,
    pub pressure_kpa: f32,
    pub humidity_pct: f32,
    pub gas_resistance_ohms: f32,
}

impl Default for AirMeasurement {
    /// Values representing decent air quality.
    fn default() -> Self {
        Self {
            temperature_c: 20.0,
            pressure_kpa: 100.0,
            humidity_pct: 40.0,
            gas_resistance_ohms: 50_000.0,
        }
    }
}

/// Running statistics behind the score.
#[derive(Debug, Clone, Default)]
pub struct AirQualityTracker {
    count: u32,
    quality: f32,
    mean: f32,
    sum_of_squares: f32,
}

impl AirQualityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, gas_resistance_ohms: f32, humidity_pct: f32) {
        self.count += 1;
        self.quality = gas_resistance_ohms.ln() + HUMIDITY_FACTOR * humidity_pct;
        let delta = self.quality - self.mean;
        self.mean += delta / self.count as f32;
        self.sum_of_squares += delta * (self.quality - self.mean);
    }

    /// Record a full measurement and return the new score.
    pub fn record(&mut self, measurement: AirMeasurement) -> u16 {
        self.update(measurement.gas_resistance_ohms, measurement.humidity_pct);
        self.score()
    }

    pub fn score(&self) -> u16 {
        if self.count < 2 {
            return AVERAGE_SCORE;
        }
        let stddev = (self.sum_of_squares / (self.count - 1) as f32).sqrt();
        // Identical readings so far: the latest one is exactly average.
        if stddev <= f32::EPSILON || !stddev.is_finite() {
            return AVERAGE_SCORE;
        }
        let score = ((self.quality - self.mean) / stddev + 3.0) * 256.0;
        let score = score.clamp(0.0, f32::from(MAX_SCORE));
        debug!(
            "count={}, quality={}, mean={}, stddev={}, score={}",
            self.count,
            self.quality,
            self.mean,
            stddev,
            score
        );
        score as u16
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}
