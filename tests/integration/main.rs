//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a subsystem through the
//! bus, against the mock hardware in [`mock_hw`].  Everything runs on the
//! host with no real hardware required.

mod button_pipeline_tests;
mod mock_hw;
mod pubsub_tests;
mod state_manager_tests;
