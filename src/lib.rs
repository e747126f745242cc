//! Enviro Indoor bridge library.
//!
//! Keeps an always-fresh snapshot of the readings a Pimoroni Enviro Indoor
//! board publishes over MQTT and serves them to a host accessory framework.

pub mod accessory;
pub mod config;
pub mod device;
pub mod error;
pub mod input;
pub mod sensors;
