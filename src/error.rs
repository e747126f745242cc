use thiserror::Error as ThisError;

/// Inbound payload could not be turned into a reading.
#[derive(ThisError, Debug)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("payload is not a valid reading: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Broker did not accept the topic subscription.
#[derive(ThisError, Debug)]
pub enum SubscriptionError {
    #[error("failed to queue subscribe request for {topic}: {source}")]
    Request {
        topic: String,
        #[source]
        source: rumqttc::ClientError,
    },

    #[error("broker rejected subscription to {0}")]
    Rejected(String),
}

#[derive(ThisError, Debug)]
pub enum TransportError {
    #[error("MQTT connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("MQTT broker address is not configured")]
    MissingBroker,

    #[error("MQTT topic is not configured")]
    MissingTopic,

    #[error("invalid broker address {address}: {source}")]
    InvalidBrokerUrl {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("broker address {0} has no host")]
    MissingHost(String),

    #[error("unsupported broker scheme: {0}")]
    UnsupportedScheme(String),
}

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
