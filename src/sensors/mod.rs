//! Sensor processing: air-quality scoring, proximity edges and the
//! periodic sampling loop that feeds them.

pub mod air_quality;
pub mod proximity;
pub mod sampling;
