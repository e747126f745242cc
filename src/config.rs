use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Port used when the broker address has none and the scheme is plain TCP.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Port used when the broker address has none and the scheme is TLS.
pub const DEFAULT_MQTTS_PORT: u16 = 8883;

/// Load environment variables from a `.env` file in the working directory.
///
/// Variables already present in the environment take precedence.
pub fn load_dotenv() {
    if let Err(e) = dotenv::dotenv()
        && !e.not_found()
    {
        log::warn!("Failed to load .env file: {}", e);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub accessory: AccessoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker address as `host[:port]`, optionally with a scheme.
    pub broker: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Topic filter the readings are published on.
    pub topic: String,
    pub keep_alive_secs: u64,
    /// Pause before the event loop retries after a transport failure.
    pub reconnect_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessoryConfig {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    /// Serial shown before the sensor has reported its own uid.
    /// Falls back to the accessory name.
    pub serial_number: Option<String>,
}

impl AccessoryConfig {
    pub fn initial_serial(&self) -> &str {
        self.serial_number.as_deref().unwrap_or(&self.name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig {
                broker: "localhost".to_string(),
                client_id: default_client_id(),
                username: None,
                password: None,
                topic: String::new(),
                keep_alive_secs: 30,
                reconnect_delay_secs: 5,
            },
            accessory: AccessoryConfig {
                name: "Enviro Indoor".to_string(),
                manufacturer: "Pimoroni".to_string(),
                model: "EnviroIndoor".to_string(),
                serial_number: None,
            },
        }
    }
}

fn default_client_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("enviro-indoor-bridge-{}", &id[..8])
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // MQTT configuration
        if let Ok(broker) = std::env::var("MQTT_BROKER") {
            config.mqtt.broker = broker;
        }
        if let Ok(client_id) = std::env::var("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Ok(username) = std::env::var("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Ok(password) = std::env::var("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }
        if let Ok(topic) = std::env::var("MQTT_TOPIC") {
            config.mqtt.topic = topic;
        }
        if let Ok(keep_alive) = std::env::var("MQTT_KEEP_ALIVE_SECS")
            && let Ok(k) = keep_alive.parse()
        {
            config.mqtt.keep_alive_secs = k;
        }
        if let Ok(delay) = std::env::var("MQTT_RECONNECT_DELAY_SECS")
            && let Ok(d) = delay.parse()
        {
            config.mqtt.reconnect_delay_secs = d;
        }

        // Accessory information
        if let Ok(name) = std::env::var("ACCESSORY_NAME") {
            config.accessory.name = name;
        }
        if let Ok(manufacturer) = std::env::var("ACCESSORY_MANUFACTURER") {
            config.accessory.manufacturer = manufacturer;
        }
        if let Ok(model) = std::env::var("ACCESSORY_MODEL") {
            config.accessory.model = model;
        }
        if let Ok(serial) = std::env::var("ACCESSORY_SERIAL") {
            config.accessory.serial_number = Some(serial);
        }

        config
    }
}

impl MqttConfig {
    /// Check the settings the session cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.trim().is_empty() {
            return Err(ConfigError::MissingBroker);
        }
        if self.topic.trim().is_empty() {
            return Err(ConfigError::MissingTopic);
        }
        Ok(())
    }

    /// Resolve the configured broker address into a connection target.
    pub fn endpoint(&self) -> Result<BrokerEndpoint, ConfigError> {
        BrokerEndpoint::parse(&self.broker)
    }
}

/// Prefix `mqtt://` when the address carries no scheme.
pub fn normalize_broker_url(address: &str) -> String {
    let address = address.trim();
    if address.contains("://") {
        address.to_string()
    } else {
        format!("mqtt://{}", address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerScheme {
    Tcp,
    Tls,
}

/// Host and port the MQTT client connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub scheme: BrokerScheme,
    pub host: String,
    pub port: u16,
}

impl BrokerEndpoint {
    pub fn parse(address: &str) -> Result<Self, ConfigError> {
        if address.trim().is_empty() {
            return Err(ConfigError::MissingBroker);
        }

        let normalized = normalize_broker_url(address);
        let url = Url::parse(&normalized).map_err(|source| ConfigError::InvalidBrokerUrl {
            address: address.to_string(),
            source,
        })?;

        let scheme = match url.scheme() {
            "mqtt" | "tcp" => BrokerScheme::Tcp,
            "mqtts" | "ssl" | "tls" => BrokerScheme::Tls,
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(ConfigError::MissingHost(address.to_string())),
        };

        let port = url.port().unwrap_or(match scheme {
            BrokerScheme::Tcp => DEFAULT_MQTT_PORT,
            BrokerScheme::Tls => DEFAULT_MQTTS_PORT,
        });

        Ok(Self { scheme, host, port })
    }
}

impl fmt::Display for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.scheme {
            BrokerScheme::Tcp => "mqtt",
            BrokerScheme::Tls => "mqtts",
        };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_scheme() {
        assert_eq!(normalize_broker_url("test.local"), "mqtt://test.local");
        assert_eq!(
            normalize_broker_url("10.0.0.2:1884"),
            "mqtt://10.0.0.2:1884"
        );
    }

    #[test]
    fn test_normalize_keeps_existing_scheme() {
        assert_eq!(
            normalize_broker_url("mqtts://broker.example.com"),
            "mqtts://broker.example.com"
        );
    }

    #[test]
    fn test_endpoint_default_ports() {
        let endpoint = BrokerEndpoint::parse("test.local").unwrap();
        assert_eq!(endpoint.scheme, BrokerScheme::Tcp);
        assert_eq!(endpoint.host, "test.local");
        assert_eq!(endpoint.port, DEFAULT_MQTT_PORT);

        let endpoint = BrokerEndpoint::parse("mqtts://broker.example.com").unwrap();
        assert_eq!(endpoint.scheme, BrokerScheme::Tls);
        assert_eq!(endpoint.port, DEFAULT_MQTTS_PORT);
    }

    #[test]
    fn test_endpoint_explicit_port() {
        let endpoint = BrokerEndpoint::parse("10.0.0.2:1884").unwrap();
        assert_eq!(endpoint.host, "10.0.0.2");
        assert_eq!(endpoint.port, 1884);
        assert_eq!(endpoint.to_string(), "mqtt://10.0.0.2:1884");
    }

    #[test]
    fn test_endpoint_rejects_unknown_scheme() {
        let err = BrokerEndpoint::parse("http://broker.example.com").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(s) if s == "http"));
    }

    #[test]
    fn test_endpoint_rejects_empty_address() {
        assert!(matches!(
            BrokerEndpoint::parse("  "),
            Err(ConfigError::MissingBroker)
        ));
    }

    #[test]
    fn test_validate_requires_topic() {
        let config = Config::default();
        assert!(matches!(
            config.mqtt.validate(),
            Err(ConfigError::MissingTopic)
        ));

        let mut config = Config::default();
        config.mqtt.topic = "enviro/indoor".to_string();
        assert!(config.mqtt.validate().is_ok());
    }

    #[test]
    fn test_initial_serial_falls_back_to_name() {
        let mut config = Config::default();
        assert_eq!(config.accessory.initial_serial(), "Enviro Indoor");

        config.accessory.serial_number = Some("E-01".to_string());
        assert_eq!(config.accessory.initial_serial(), "E-01");
    }
}
