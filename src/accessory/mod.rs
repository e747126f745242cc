//! Interfaces towards the host accessory framework.
//!
//! The host reads values through [`ReadingSource`] and receives identity
//! updates through [`AccessoryInformation`]. Neither side depends on the
//! other's types.

pub mod info;
pub mod query;

pub use info::{AccessoryInfo, AccessoryInfoRecord, AccessoryInformation, MetadataRefresher};
pub use query::{
    HUMIDITY_SERVICE_NAME, LIGHT_SERVICE_NAME, QueryFacade, ReadingSource,
    TEMPERATURE_SERVICE_NAME,
};
