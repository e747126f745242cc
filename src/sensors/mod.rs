//! Sensor state shared between the MQTT input and the accessory.
//!
//! The [`SnapshotStore`] is written by the message handler and read by the
//! query facade. All stores implement the [`Sensor`] trait which provides
//! version tracking for change detection.

pub mod identity;
pub mod snapshot;

pub use identity::{ReconcileResult, reconcile};
pub use snapshot::{AncillaryReadings, Snapshot, SnapshotStore};

/// Trait for sensors with change detection.
///
/// The version number is incremented each time the sensor value changes.
/// Readers compare versions to detect that new data arrived.
pub trait Sensor: Send + Sync {
    /// Get the current version number.
    fn version(&self) -> u32;
}
