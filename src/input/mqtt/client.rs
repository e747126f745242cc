//! MQTT client wrapper for the Enviro Indoor broker connection.

use crate::config::{BrokerEndpoint, BrokerScheme, MqttConfig};
use crate::error::{ConfigError, SubscriptionError, TransportError};
use log::{debug, info};
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS, Transport};
use std::time::Duration;

/// Capacity of the request channel between client handle and event loop.
const REQUEST_CAPACITY: usize = 100;

/// Message received from MQTT broker.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// MQTT client and its not yet polled event loop.
pub struct MqttClient {
    client: AsyncClient,
    event_loop: EventLoop,
    endpoint: BrokerEndpoint,
}

impl MqttClient {
    /// Create a new MQTT client from configuration.
    ///
    /// Nothing touches the network until the event loop is polled.
    pub fn new(config: &MqttConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint()?;

        let mut options = MqttOptions::new(&config.client_id, &endpoint.host, endpoint.port);
        // Zero disables keep-alive
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        if let Some(username) = &config.username {
            let password = config.password.clone().unwrap_or_default();
            options.set_credentials(username, password);
        }

        if endpoint.scheme == BrokerScheme::Tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);

        Ok(Self {
            client,
            event_loop,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &BrokerEndpoint {
        &self.endpoint
    }

    pub fn into_parts(self) -> (AsyncClient, EventLoop) {
        (self.client, self.event_loop)
    }
}

/// Queue a QoS 0 subscription without waiting on the event loop.
///
/// Safe to call from inside the task that polls the event loop.
pub fn request_subscribe(client: &AsyncClient, topic: &str) -> Result<(), SubscriptionError> {
    info!("[MQTT] Subscribing to topic: {}", topic);
    client
        .try_subscribe(topic, QoS::AtMostOnce)
        .map_err(|source| SubscriptionError::Request {
            topic: topic.to_string(),
            source,
        })
}

/// Queue unsubscribe and disconnect requests.
pub fn request_teardown(client: &AsyncClient, topic: &str) -> Result<(), TransportError> {
    debug!("[MQTT] Unsubscribing from {}", topic);
    client.try_unsubscribe(topic)?;
    client.try_disconnect()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config(keep_alive_secs: u64) -> MqttConfig {
        let mut config = Config::default().mqtt;
        config.broker = "10.0.0.2".to_string();
        config.topic = "enviro/indoor".to_string();
        config.keep_alive_secs = keep_alive_secs;
        config
    }

    #[test]
    fn test_keep_alive_passed_through() {
        for secs in [0, 1, 3, 30] {
            let client = MqttClient::new(&config(secs)).unwrap();
            let (_, event_loop) = client.into_parts();
            assert_eq!(
                event_loop.mqtt_options.keep_alive(),
                Duration::from_secs(secs)
            );
        }
    }

    #[test]
    fn test_endpoint_from_bare_host() {
        let client = MqttClient::new(&config(30)).unwrap();
        assert_eq!(client.endpoint().to_string(), "mqtt://10.0.0.2:1883");
    }
}
