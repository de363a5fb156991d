//! Device modes.
//!
//! Exactly one [`Mode`] is active at a time.  Mode-local data lives in the
//! variant itself, so leaving a mode drops everything it owned.

use core::fmt;

use crate::events::MorseMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Shows the current air-quality colour.
    Monitor,
    /// Editing the alarm threshold; exits on its own after a timeout.
    Threshold,
    /// Air quality fell below the threshold; the score is sent as Morse
    /// until silenced or recovered.
    Alarm,
    /// One-off Morse readout of `message`.
    MorseReadout { message: MorseMessage },
}

impl Mode {
    pub fn id(&self) -> ModeId {
        match self {
            Self::Monitor => ModeId::Monitor,
            Self::Threshold => ModeId::Threshold,
            Self::Alarm => ModeId::Alarm,
            Self::MorseReadout { .. } => ModeId::MorseReadout,
        }
    }

    pub fn name(&self) -> &'static str {
        self.id().name()
    }
}

/// Data-free mode tag, carried in `SenseState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeId {
    Monitor,
    Threshold,
    Alarm,
    MorseReadout,
}

impl ModeId {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Monitor => "MonitorMode",
            Self::Threshold => "ThresholdMode",
            Self::Alarm => "AlarmMode",
            Self::MorseReadout => "MorseReadoutMode",
        }
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
