//! Input sources feeding the accessory.
//!
//! Current input sources:
//! - `mqtt`: Enviro Indoor readings published to an MQTT broker

pub mod mqtt;
