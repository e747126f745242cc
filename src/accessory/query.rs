//! Read side of the accessory.
//!
//! Characteristic reads are answered from the snapshot store, never from the
//! network, so they are cheap enough to serve on every host poll.

use crate::sensors::SnapshotStore;
use log::debug;
use std::sync::Arc;

/// Display name of the temperature service.
pub const TEMPERATURE_SERVICE_NAME: &str = "Temperature";

/// Display name of the humidity service.
pub const HUMIDITY_SERVICE_NAME: &str = "Humidity";

/// Display name of the light sensor service.
pub const LIGHT_SERVICE_NAME: &str = "Light Level";

/// Source of current readings for the host framework's get handlers.
pub trait ReadingSource: Send + Sync {
    /// Current temperature (°C)
    fn temperature(&self) -> f64;

    /// Current relative humidity (%)
    fn humidity(&self) -> f64;

    /// Current ambient light level (lux)
    fn illuminance(&self) -> f64;
}

/// Get handlers over a shared [`SnapshotStore`].
#[derive(Clone)]
pub struct QueryFacade {
    store: Arc<SnapshotStore>,
}

impl QueryFacade {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn handle_temperature_get(&self) -> f64 {
        let value = self.store.read().temperature;
        debug!("Temperature -> {}", value);
        value
    }

    pub fn handle_humidity_get(&self) -> f64 {
        let value = self.store.read().humidity;
        debug!("Humidity -> {}", value);
        value
    }

    pub fn handle_light_sensor_get(&self) -> f64 {
        let value = self.store.read().illuminance;
        debug!("Light -> {}", value);
        value
    }
}

impl ReadingSource for QueryFacade {
    fn temperature(&self) -> f64 {
        self.handle_temperature_get()
    }

    fn humidity(&self) -> f64 {
        self.handle_humidity_get()
    }

    fn illuminance(&self) -> f64 {
        self.handle_light_sensor_get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::mqtt::decode;

    #[test]
    fn test_sentinel_defaults_before_any_message() {
        let facade = QueryFacade::new(Arc::new(SnapshotStore::new()));
        assert_eq!(facade.handle_temperature_get(), -270.0);
        assert_eq!(facade.handle_humidity_get(), 0.0);
        assert_eq!(facade.handle_light_sensor_get(), 0.0001);
    }

    #[test]
    fn test_reads_follow_store() {
        let store = Arc::new(SnapshotStore::new());
        let facade = QueryFacade::new(store.clone());

        let reading = decode(
            br#"{"readings":{"temperature":22.25,"humidity":51.5,"luminance":310},"uid":"A"}"#,
        )
        .unwrap();
        store.fold(&reading);

        let source: &dyn ReadingSource = &facade;
        assert_eq!(source.temperature(), 22.25);
        assert_eq!(source.humidity(), 51.5);
        assert_eq!(source.illuminance(), 310.0);
    }
}
