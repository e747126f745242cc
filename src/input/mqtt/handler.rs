//! Single entry point for inbound reading messages.

use super::enviro::decode;
use crate::accessory::MetadataRefresher;
use crate::error::DecodeError;
use crate::sensors::{ReconcileResult, SnapshotStore, reconcile};
use log::{debug, info, warn};
use std::sync::Arc;

/// Decodes payloads, folds them into the store and keeps the accessory
/// information in step with the reported device uid.
#[derive(Clone)]
pub struct MessageHandler {
    store: Arc<SnapshotStore>,
    refresher: Arc<MetadataRefresher>,
}

impl MessageHandler {
    pub fn new(store: Arc<SnapshotStore>, refresher: Arc<MetadataRefresher>) -> Self {
        Self { store, refresher }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Process one raw payload.
    ///
    /// A payload that fails to decode leaves the store untouched.
    pub fn handle(&self, payload: &[u8]) -> Result<ReconcileResult, DecodeError> {
        debug!("[MQTT] {}", String::from_utf8_lossy(payload));

        let reading = decode(payload).inspect_err(|e| {
            warn!("[MQTT] Dropping unreadable message: {}", e);
        })?;

        self.store.fold(&reading);

        let result = reconcile(&reading.uid, &self.store.identity());
        if let ReconcileResult::Changed(uid) = &result {
            info!("[MQTT] Sensor identity changed to {}", uid);
            self.refresher.refresh(uid);
            self.store.set_identity(uid.clone());
        }

        Ok(result)
    }
}
