//! Input and indicator drivers.

pub mod blinky;
pub mod button;
