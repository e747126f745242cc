//! Last-value-wins cache of the Enviro Indoor readings.
//!
//! Every successful message replaces temperature, humidity and illuminance
//! in one step under a single lock, so readers never see a mix of two
//! messages.

use super::Sensor;
use crate::input::mqtt::EnviroReading;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Reported before any message arrived. Physically impossible on purpose.
pub const DEFAULT_TEMPERATURE: f64 = -270.0;

pub const DEFAULT_HUMIDITY: f64 = 0.0;

/// Light sensors reject zero or negative levels, this is the floor.
pub const MIN_ILLUMINANCE: f64 = 0.0001;

/// Point-in-time copy of the cached values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Illuminance (lux), always > 0
    pub illuminance: f64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            humidity: DEFAULT_HUMIDITY,
            illuminance: MIN_ILLUMINANCE,
        }
    }
}

/// Readings the board sends that the accessory does not expose.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AncillaryReadings {
    pub pressure: Option<f64>,
    pub voltage: Option<f64>,
    pub color_temperature: Option<f64>,
    pub gas_resistance: Option<f64>,
    pub aqi: Option<f64>,
}

#[derive(Debug, Default)]
struct StoreState {
    snapshot: Snapshot,
    device_id: String,
    ancillary: AncillaryReadings,
    last_update: Option<DateTime<Utc>>,
    version: u32,
}

/// Thread-safe snapshot of the latest reading and device identity.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    state: Mutex<StoreState>,
}

impl SnapshotStore {
    /// Create a store holding the sentinel defaults and an empty identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached values with those of `reading`.
    ///
    /// Luminance at or below zero is stored as [`MIN_ILLUMINANCE`].
    pub fn fold(&self, reading: &EnviroReading) {
        let values = &reading.readings;
        let illuminance = if values.luminance <= 0.0 {
            MIN_ILLUMINANCE
        } else {
            values.luminance
        };

        let mut state = self.state.lock();
        state.snapshot = Snapshot {
            temperature: values.temperature,
            humidity: values.humidity,
            illuminance,
        };
        state.ancillary = AncillaryReadings {
            pressure: values.pressure,
            voltage: values.voltage,
            color_temperature: values.color_temperature,
            gas_resistance: values.gas_resistance,
            aqi: values.aqi,
        };
        state.last_update = Some(Utc::now());
        state.version = state.version.wrapping_add(1);
    }

    pub fn read(&self) -> Snapshot {
        self.state.lock().snapshot
    }

    /// Currently stored device identifier.
    pub fn identity(&self) -> String {
        self.state.lock().device_id.clone()
    }

    pub fn set_identity(&self, id: String) {
        self.state.lock().device_id = id;
    }

    pub fn ancillary(&self) -> AncillaryReadings {
        self.state.lock().ancillary.clone()
    }

    /// Time of the last fold, `None` until the first message.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_update
    }
}

impl Sensor for SnapshotStore {
    fn version(&self) -> u32 {
        self.state.lock().version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::mqtt::EnviroReadings;
    use std::sync::Arc;

    fn reading(temperature: f64, humidity: f64, luminance: f64) -> EnviroReading {
        EnviroReading {
            readings: EnviroReadings {
                temperature,
                humidity,
                luminance,
                pressure: Some(1012.5),
                voltage: None,
                color_temperature: None,
                gas_resistance: None,
                aqi: Some(20.0),
            },
            uid: "ABC123".to_string(),
            nickname: None,
            model: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_initial_state() {
        let store = SnapshotStore::new();
        let snapshot = store.read();
        assert_eq!(snapshot.temperature, -270.0);
        assert_eq!(snapshot.humidity, 0.0);
        assert_eq!(snapshot.illuminance, 0.0001);
        assert_eq!(store.identity(), "");
        assert_eq!(store.version(), 0);
        assert!(store.last_update().is_none());
    }

    #[test]
    fn test_fold_replaces_values() {
        let store = SnapshotStore::new();
        store.fold(&reading(21.5, 48.0, 150.0));

        let snapshot = store.read();
        assert_eq!(snapshot.temperature, 21.5);
        assert_eq!(snapshot.humidity, 48.0);
        assert_eq!(snapshot.illuminance, 150.0);
        assert_eq!(store.ancillary().pressure, Some(1012.5));
        assert_eq!(store.version(), 1);
        assert!(store.last_update().is_some());
    }

    #[test]
    fn test_fold_clamps_non_positive_luminance() {
        let store = SnapshotStore::new();
        for luminance in [0.0, -0.0, -1.0, -5000.0] {
            store.fold(&reading(20.0, 30.0, 42.0));
            store.fold(&reading(20.0, 30.0, luminance));
            assert_eq!(store.read().illuminance, MIN_ILLUMINANCE);
        }
    }

    #[test]
    fn test_fold_keeps_small_positive_luminance() {
        let store = SnapshotStore::new();
        store.fold(&reading(20.0, 30.0, 0.00001));
        assert_eq!(store.read().illuminance, 0.00001);
    }

    #[test]
    fn test_fold_is_idempotent() {
        let store = SnapshotStore::new();
        let r = reading(18.25, 61.0, 3.5);
        store.fold(&r);
        let once = store.read();
        store.fold(&r);
        assert_eq!(store.read(), once);
    }

    #[test]
    fn test_later_fold_wins() {
        let store = SnapshotStore::new();
        store.fold(&reading(25.0, 70.0, 900.0));
        store.fold(&reading(15.0, 20.0, 0.0));
        assert_eq!(
            store.read(),
            Snapshot {
                temperature: 15.0,
                humidity: 20.0,
                illuminance: MIN_ILLUMINANCE,
            }
        );
    }

    #[test]
    fn test_fold_does_not_touch_identity() {
        let store = SnapshotStore::new();
        store.fold(&reading(20.0, 30.0, 1.0));
        assert_eq!(store.identity(), "");

        store.set_identity("ABC123".to_string());
        assert_eq!(store.identity(), "ABC123");
    }

    #[test]
    fn test_concurrent_reads_never_see_partial_fold() {
        // Each reading keeps all three fields equal, so a torn read would
        // show differing values.
        let store = Arc::new(SnapshotStore::new());
        store.fold(&reading(1.0, 1.0, 1.0));

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 1..=2000 {
                    let v = i as f64;
                    store.fold(&reading(v, v, v));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..2000 {
                        let s = store.read();
                        assert_eq!(s.temperature, s.humidity);
                        assert_eq!(s.humidity, s.illuminance);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.read().temperature, 2000.0);
    }
}
