//! Diagnostic binary for the Enviro Indoor MQTT feed.
//!
//! Usage:
//!   cargo run --bin mqtt-probe -- --broker 10.0.0.2 --topic enviro/indoor
//!
//! Connects to the broker, logs every decoded reading and connection state
//! change, and prints the snapshot and ancillary readings on an interval.

use clap::Parser;
use enviro_indoor_bridge::accessory::{AccessoryInfoRecord, MetadataRefresher, QueryFacade};
use enviro_indoor_bridge::config::{self, Config};
use enviro_indoor_bridge::input::mqtt::{EnviroSession, MessageHandler};
use enviro_indoor_bridge::sensors::SnapshotStore;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mqtt-probe")]
#[command(about = "Watch Enviro Indoor readings on an MQTT broker")]
struct Cli {
    /// Broker address (host[:port], optional mqtt:// or mqtts:// scheme)
    #[arg(long, env = "MQTT_BROKER")]
    broker: Option<String>,

    /// Topic the board publishes on
    #[arg(long, env = "MQTT_TOPIC")]
    topic: Option<String>,

    #[arg(long, env = "MQTT_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Seconds between snapshot reports
    #[arg(long, default_value_t = 10)]
    interval: u64,
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let report_interval = Duration::from_secs(cli.interval.max(1));

    let mut config = Config::from_env();
    if let Some(broker) = cli.broker {
        config.mqtt.broker = broker;
    }
    if let Some(topic) = cli.topic {
        config.mqtt.topic = topic;
    }
    if cli.username.is_some() {
        config.mqtt.username = cli.username;
    }
    if cli.password.is_some() {
        config.mqtt.password = cli.password;
    }

    info!("Starting Enviro Indoor MQTT probe");

    let store = Arc::new(SnapshotStore::new());
    let record = Arc::new(AccessoryInfoRecord::new());
    let refresher = Arc::new(MetadataRefresher::new(record.clone(), &config.accessory));
    let handler = MessageHandler::new(store.clone(), refresher);

    let session = match EnviroSession::start(&config.mqtt, handler) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to start MQTT session: {}", e);
            std::process::exit(1);
        }
    };

    let mut state_rx = session.subscribe_state();
    let state_task = tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            info!(">>> Connection state: {}", state);
        }
    });

    let query = QueryFacade::new(store.clone());
    let report_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(report_interval);
        loop {
            ticker.tick().await;
            let Some(updated) = store.last_update() else {
                info!("No reading received yet");
                continue;
            };

            let extra = store.ancillary();
            info!(
                "[{}] temp={}°C humidity={}% light={} lx | pressure={:?} aqi={:?} voltage={:?} (serial {})",
                updated.format("%H:%M:%S"),
                query.handle_temperature_get(),
                query.handle_humidity_get(),
                query.handle_light_sensor_get(),
                extra.pressure,
                extra.aqi,
                extra.voltage,
                record.get().serial_number,
            );
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
        _ = state_task => {
            warn!("Connection state watcher ended");
        }
    }

    report_task.abort();
    session.shutdown().await;

    info!("Probe complete.");
}
