//! Adapters: concrete implementations of the port traits for the host.
//!
//! | Adapter   | Implements                                   | Connects to        |
//! |-----------|----------------------------------------------|--------------------|
//! | `log_led` | PolychromeLed, MonochromeLed                 | Log output         |
//! | `sim`     | AmbientLightSensor, ProximitySensor,         | In-memory readings |
//! |           | AirSensor, `embedded_hal` InputPin           |                    |

pub mod log_led;
pub mod sim;
