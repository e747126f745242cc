pub mod enviro_indoor;

pub use enviro_indoor::EnviroIndoorDevice;
