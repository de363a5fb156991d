//! SenseHub core library.
//!
//! Event-driven logic for a small sensor hub: a bounded publish/subscribe
//! bus drained by one worker, the device state manager, Morse readout,
//! button debouncing, hysteresis edge detection and the periodic sampling
//! loop.  Hardware is reached only through the traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod color_rotation;
pub mod config;
pub mod drivers;
pub mod edge_detector;
pub mod error;
pub mod event_timers;
pub mod events;
pub mod lerp;
pub mod morse_code;
pub mod pubsub;
pub mod sensors;
pub mod state_manager;
pub mod stats;
pub mod timer;
pub mod worker;
