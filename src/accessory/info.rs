//! Accessory information (manufacturer, model, serial number).
//!
//! The host framework owns the real records. The bridge only talks to them
//! through [`AccessoryInformation`], and only when the device identity changes.

use crate::config::AccessoryConfig;
use log::info;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Writable accessory information service of the host framework.
pub trait AccessoryInformation: Send + Sync {
    fn set_manufacturer(&self, manufacturer: &str);
    fn set_model(&self, model: &str);
    fn set_serial_number(&self, serial_number: &str);
}

/// Values last written to an [`AccessoryInfoRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessoryInfo {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

/// In-memory accessory information, for hosts without their own registry.
#[derive(Debug, Default)]
pub struct AccessoryInfoRecord {
    info: RwLock<AccessoryInfo>,
    serial_updates: AtomicU32,
}

impl AccessoryInfoRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> AccessoryInfo {
        self.info.read().clone()
    }

    /// Number of times a serial number was written.
    pub fn serial_updates(&self) -> u32 {
        self.serial_updates.load(Ordering::SeqCst)
    }
}

impl AccessoryInformation for AccessoryInfoRecord {
    fn set_manufacturer(&self, manufacturer: &str) {
        self.info.write().manufacturer = manufacturer.to_string();
    }

    fn set_model(&self, model: &str) {
        self.info.write().model = model.to_string();
    }

    fn set_serial_number(&self, serial_number: &str) {
        self.info.write().serial_number = serial_number.to_string();
        self.serial_updates.fetch_add(1, Ordering::SeqCst);
    }
}

/// Writes manufacturer, model and a new serial number in one go.
pub struct MetadataRefresher {
    target: Arc<dyn AccessoryInformation>,
    manufacturer: String,
    model: String,
}

impl MetadataRefresher {
    pub fn new(target: Arc<dyn AccessoryInformation>, config: &AccessoryConfig) -> Self {
        Self {
            target,
            manufacturer: config.manufacturer.clone(),
            model: config.model.clone(),
        }
    }

    pub fn refresh(&self, serial_number: &str) {
        info!(
            "Updating accessory information: {} {} ({})",
            self.manufacturer, self.model, serial_number
        );
        self.target.set_manufacturer(&self.manufacturer);
        self.target.set_model(&self.model);
        self.target.set_serial_number(serial_number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_refresh_writes_all_fields() {
        let record = Arc::new(AccessoryInfoRecord::new());
        let refresher = MetadataRefresher::new(record.clone(), &Config::default().accessory);

        refresher.refresh("ABC123");

        assert_eq!(
            record.get(),
            AccessoryInfo {
                manufacturer: "Pimoroni".to_string(),
                model: "EnviroIndoor".to_string(),
                serial_number: "ABC123".to_string(),
            }
        );
        assert_eq!(record.serial_updates(), 1);
    }

    #[test]
    fn test_configured_manufacturer_and_model() {
        let mut config = Config::default().accessory;
        config.manufacturer = "Acme".to_string();
        config.model = "Indoor v2".to_string();

        let record = Arc::new(AccessoryInfoRecord::new());
        MetadataRefresher::new(record.clone(), &config).refresh("S1");

        let info = record.get();
        assert_eq!(info.manufacturer, "Acme");
        assert_eq!(info.model, "Indoor v2");
    }
}
