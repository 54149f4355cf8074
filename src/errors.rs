//! Errors for AIS bridge watch
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AisBridgeError {
    #[error("MQTT connection failed")]
    MqttConnectionError(#[from] rumqttc::ConnectionError),

    #[error("MQTT client error")]
    MqttClientError(#[from] rumqttc::ClientError),

    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid topic")]
    InvalidTopic(String),

    #[error("Invalid MMSI")]
    InvalidMmsi(String),

    #[error("Unknown message type")]
    UnknownMessageType(String),

    #[error("Invalid position report: {0}")]
    InvalidReport(String),

    #[error("Invalid bridge registry: {0}")]
    InvalidBridgeRegistry(String),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}
