//! MQTT channel for Azure IoT Hub communication.
//!
//! Provides a typed MQTT abstraction for the Blinky device agent:
//! - `Channel` trait for publish/subscribe/ack (mockable in tests)
//! - `MqttChannel` with TLS (SAS or X.509) for production
//! - `MockChannel` for testing without a broker
//! - `HubClient` for telemetry, direct-method replies and subscriptions
//! - `DeliveryTracker` pairing queued publishes with broker PUBACKs
//! - `IncomingMessage` classification for dispatching events
//! - `DpsClient` for the one-shot provisioning handshake

pub mod channel;
pub mod config;
pub mod delivery;
pub mod error;
pub mod handler;
pub mod hub;
pub mod mock;
pub mod provisioning;
pub mod tls;

// Re-exports for convenience.
pub use channel::{Channel, MqttChannel, wait_connected};
pub use config::MqttConfig;
pub use delivery::DeliveryTracker;
pub use error::{MqttError, MqttResult};
pub use handler::{CloudMessage, IncomingMessage, classify};
pub use hub::HubClient;
pub use mock::MockChannel;
pub use provisioning::{DpsClient, ProvisioningConfig, Provisioner};
