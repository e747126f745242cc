//! MQTT input source for the Pimoroni Enviro Indoor board.
//!
//! The board publishes its readings as JSON on a single topic. This module
//! keeps the broker session alive, decodes the payloads and folds them into
//! the shared snapshot store.

mod client;
mod connection;
mod enviro;
mod handler;
mod integration;

pub use client::{MqttClient, MqttMessage};
pub use connection::{ConnectionState, ConnectionTracker, Transition};
pub use enviro::{EnviroReading, EnviroReadings, decode};
pub use handler::MessageHandler;
pub use integration::EnviroSession;
