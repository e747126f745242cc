use enviro_indoor_bridge::accessory::{
    AccessoryInfoRecord, HUMIDITY_SERVICE_NAME, LIGHT_SERVICE_NAME, ReadingSource,
    TEMPERATURE_SERVICE_NAME,
};
use enviro_indoor_bridge::config::{self, Config};
use enviro_indoor_bridge::device::EnviroIndoorDevice;
use enviro_indoor_bridge::sensors::Sensor;
use log::{error, info};
use std::sync::Arc;
use tokio::signal;
use tokio::time::{Duration, interval};

/// How often the current snapshot is written to the log.
const REPORT_INTERVAL: Duration = Duration::from_secs(60);

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();
    init_logger();
    info!("Starting Enviro Indoor bridge");

    let config = Config::from_env();
    info!("Configuration loaded:");
    info!("  Accessory: {}", config.accessory.name);
    info!("  Broker: {}", config.mqtt.broker);
    info!("  Topic: {}", config.mqtt.topic);
    info!("  Client ID: {}", config.mqtt.client_id);

    let info_record = Arc::new(AccessoryInfoRecord::new());
    let device = match EnviroIndoorDevice::start(config, info_record.clone()) {
        Ok(device) => device,
        Err(e) => {
            error!("Failed to start accessory: {}", e);
            std::process::exit(1);
        }
    };

    info!("Enviro Indoor bridge is running");
    info!("  - Press Ctrl+C to exit");

    let query = device.query();
    let store = device.store().clone();
    let report_task = tokio::spawn(async move {
        let mut ticker = interval(REPORT_INTERVAL);
        let mut last_version = 0;
        loop {
            ticker.tick().await;
            let version = store.version();
            if version == last_version {
                continue;
            }
            last_version = version;

            let info = info_record.get();
            info!(
                "{} {} ({}): {}={:.1}°C {}={:.1}% {}={} lx",
                info.manufacturer,
                info.model,
                info.serial_number,
                TEMPERATURE_SERVICE_NAME,
                query.temperature(),
                HUMIDITY_SERVICE_NAME,
                query.humidity(),
                LIGHT_SERVICE_NAME,
                query.illuminance()
            );
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    report_task.abort();
    device.shutdown().await;

    info!("Enviro Indoor bridge stopped");
}
