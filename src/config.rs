//! Hub configuration parameters.
//!
//! All tunable timing and threshold values for the sensor hub.  Defaults
//! match the shipped device; a host run can override them with a JSON file
//! (see `main.rs`), and `postcard` is the compact form for persistence.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sensors::air_quality::Score;

/// Core hub configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    // --- Sampling ---
    /// Period of the ambient/proximity/air sampling loop (milliseconds).
    pub sample_interval_ms: u32,
    /// Period of the button sampler (milliseconds).
    pub button_sample_interval_ms: u32,
    /// Time a raw button level must stay stable before it is published.
    pub debounce_interval_ms: u32,

    // --- Proximity ---
    /// Samples at or below this are "far".
    pub proximity_far_threshold: u16,
    /// Samples at or above this are "near".
    pub proximity_near_threshold: u16,

    // --- Alarm ---
    /// Initial alarm threshold on the 0-1023 air-quality scale.
    pub alarm_threshold: u16,
    /// Threshold editing auto-exits after this long (seconds).
    pub threshold_mode_timeout_s: u16,
    /// Pause between alarm Morse announcements (seconds).
    pub repeat_alarm_timeout_s: u16,
    /// How long the X button silences alarms (seconds).
    pub silence_alarm_timeout_s: u16,

    // --- Output ---
    /// Length of one Morse dit (milliseconds).
    pub morse_interval_ms: u32,
    /// Colour rotation step period (milliseconds).
    pub color_rotation_step_ms: u32,
    /// Colour rotation demo runs this long after boot; 0 disables it.
    pub demo_mode_secs: u16,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            // Sampling
            sample_interval_ms: 100,       // 10 Hz
            button_sample_interval_ms: 10, // 100 Hz
            debounce_interval_ms: 30,

            // Proximity
            proximity_far_threshold: 512,
            proximity_near_threshold: 16384,

            // Alarm
            alarm_threshold: Score::Yellow.value(),
            threshold_mode_timeout_s: 3,
            repeat_alarm_timeout_s: 30,
            silence_alarm_timeout_s: 60,

            // Output
            morse_interval_ms: 60,
            color_rotation_step_ms: 20,
            demo_mode_secs: 0,
        }
    }
}

impl HubConfig {
    /// Check cross-field rules.  Every violated rule is a static
    /// configuration mistake, reported with a short reason.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 || self.button_sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("sampling intervals must be non-zero"));
        }
        if self.debounce_interval_ms < self.button_sample_interval_ms {
            return Err(ConfigError::Invalid(
                "debounce interval shorter than the button sample interval",
            ));
        }
        if self.proximity_far_threshold > self.proximity_near_threshold {
            return Err(ConfigError::Invalid("proximity far threshold above near threshold"));
        }
        if self.alarm_threshold > crate::state_manager::MAX_THRESHOLD
            || self.alarm_threshold % crate::state_manager::THRESHOLD_INCREMENT != 0
        {
            return Err(ConfigError::Invalid(
                "alarm threshold must be a multiple of 128 no greater than 768",
            ));
        }
        if self.morse_interval_ms == 0 || self.color_rotation_step_ms == 0 {
            return Err(ConfigError::Invalid("output intervals must be non-zero"));
        }
        Ok(())
    }

    /// Parse a JSON document and validate it.  Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Encode in the compact persisted form.
    pub fn to_postcard(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Malformed)
    }

    /// Decode the compact persisted form and validate it.
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }
}
