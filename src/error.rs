//! Unified error types for the sensor hub.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! composition root handles startup failures uniformly.  All variants are
//! `Copy` so they can be carried through bus callbacks and logs without
//! allocation.
//!
//! The bus itself reports capacity problems through `bool`/`Option`
//! returns; [`BusError`] exists for the places that must propagate a
//! failed subscription (subsystem installation at startup).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned unusable data.
    Sensor(SensorError),
    /// The event bus rejected an operation.
    Bus(BusError),
    /// The event timer registry rejected an operation.
    Timer(TimerError),
    /// Work could not be handed to the worker.
    Worker(WorkerError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Worker(e) => write!(f, "worker: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The bus transaction to the sensor failed.
    ReadFailed,
    /// The sensor has not been enabled.
    NotEnabled,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::NotEnabled => write!(f, "sensor not enabled"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Every subscriber slot is occupied.
    SubscribersFull,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscribersFull => write!(f, "subscriber table full"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// A timer with this token is already registered.
    AlreadyExists(u32),
    /// The registry has no room for another timer.
    RegistryFull,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists(token) => write!(f, "timer {token} already registered"),
            Self::RegistryFull => write!(f, "timer registry full"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Worker errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    /// The work queue is at capacity.
    QueueFull,
    /// The worker has been asked to stop and accepts no more work.
    Stopped,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "work queue full"),
            Self::Stopped => write!(f, "worker stopped"),
        }
    }
}

impl From<WorkerError> for Error {
    fn from(e: WorkerError) -> Self {
        Self::Worker(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The serialised form could not be decoded.
    Malformed,
    /// A field failed validation; the payload names the rule.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed configuration"),
            Self::Invalid(rule) => write!(f, "invalid configuration: {rule}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_subsystem() {
        let e: Error = TimerError::AlreadyExists(7).into();
        assert_eq!(e.to_string(), "timer: timer 7 already registered");
        let e: Error = SensorError::ReadFailed.into();
        assert_eq!(e.to_string(), "sensor: read failed");
    }

    #[test]
    fn config_rule_is_reported() {
        let e = Error::from(ConfigError::Invalid("debounce interval must be non-zero"));
        assert!(e.to_string().contains("debounce interval"));
    }
}
