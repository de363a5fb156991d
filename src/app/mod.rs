//! Application seams.
//!
//! Hardware is reached only through the port traits in [`ports`], so the
//! state manager, sampling loop and status monitor run unchanged against
//! real peripherals, the host simulation, or test fakes.

pub mod ports;
pub mod status;
