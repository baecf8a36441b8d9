//! MQTT channel error types.

use thiserror::Error;

/// Errors that can occur during MQTT operations.
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),

    #[error("ack error: {0}")]
    Ack(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("provisioning error: {0}")]
    Provisioning(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for MQTT results.
pub type MqttResult<T> = Result<T, MqttError>;
