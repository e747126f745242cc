use crate::accessory::{AccessoryInformation, MetadataRefresher, QueryFacade};
use crate::config::Config;
use crate::error::Result;
use crate::input::mqtt::{ConnectionState, EnviroSession, MessageHandler};
use crate::sensors::SnapshotStore;
use std::sync::Arc;

/// Enviro Indoor accessory exposing temperature, humidity and light level.
///
/// Owns the snapshot store and the broker session for its lifetime.
pub struct EnviroIndoorDevice {
    store: Arc<SnapshotStore>,
    session: EnviroSession,
}

impl EnviroIndoorDevice {
    /// Publish the initial accessory information and connect to the broker.
    ///
    /// The startup serial is written to the host without becoming the stored
    /// device identity, so the first reported uid still triggers a refresh.
    pub fn start(config: Config, info: Arc<dyn AccessoryInformation>) -> Result<Self> {
        log::info!("Initializing {} accessory...", config.accessory.name);

        let store = Arc::new(SnapshotStore::new());
        let refresher = Arc::new(MetadataRefresher::new(info, &config.accessory));
        refresher.refresh(config.accessory.initial_serial());

        let handler = MessageHandler::new(store.clone(), refresher);
        let session = EnviroSession::start(&config.mqtt, handler)?;

        Ok(Self { store, session })
    }

    /// Get handlers for the host's characteristic reads.
    pub fn query(&self) -> QueryFacade {
        QueryFacade::new(self.store.clone())
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn session(&self) -> &EnviroSession {
        &self.session
    }

    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}
