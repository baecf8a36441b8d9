//! MQTT channel — async client for IoT Hub communication.
//!
//! Wraps `rumqttc::AsyncClient` behind the `Channel` trait. Manual acks
//! are enabled so the agent decides when an inbound message is completed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, Publish, QoS};

use crate::config::MqttConfig;
use crate::error::{MqttError, MqttResult};
use crate::tls;

/// Capacity of the request queue between the client and its event loop.
const REQUEST_CAPACITY: usize = 64;

// ── Channel trait ─────────────────────────────────────────────

/// Abstraction for MQTT message publishing, subscribing and acking.
///
/// Enables mocking in tests without a real MQTT broker.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Publish a raw payload to a topic.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()>;

    /// Subscribe to a topic filter.
    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()>;

    /// Acknowledge (complete) an incoming publish.
    async fn ack(&self, publish: &Publish) -> MqttResult<()>;
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for Arc<C> {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()> {
        (**self).publish(topic, payload, qos).await
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()> {
        (**self).subscribe(filter, qos).await
    }

    async fn ack(&self, publish: &Publish) -> MqttResult<()> {
        (**self).ack(publish).await
    }
}

// ── MqttChannel ───────────────────────────────────────────────

/// MQTT channel connected to IoT Hub.
///
/// Owns the `AsyncClient` for publishing/subscribing. The `EventLoop`
/// is returned separately from `new()` — the caller (device agent) must
/// drive it via `eventloop.poll()`.
pub struct MqttChannel {
    client: AsyncClient,
}

impl MqttChannel {
    /// Create a new MQTT channel.
    ///
    /// With TLS enabled, the CA certificate is always loaded; the device
    /// certificate and key are loaded only when the config names them.
    pub fn new(config: &MqttConfig) -> MqttResult<(Self, EventLoop)> {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(config.keepalive_secs.into()));
        options.set_credentials(
            config.username.clone(),
            config.password.clone().unwrap_or_default(),
        );
        options.set_manual_acks(true);

        if config.use_tls {
            let identity = match (&config.client_cert_path, &config.client_key_path) {
                (Some(cert), Some(key)) => Some(tls::load_client_identity(cert, key)?),
                _ => None,
            };
            options.set_transport(tls::load_tls_transport(&config.ca_cert_path, identity)?);
        } else {
            options.set_transport(tls::plaintext_transport());
        }

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        Ok((Self { client }, eventloop))
    }
}

/// Poll the event loop until the broker accepts the connection.
///
/// Any error before CONNACK, or a refused CONNACK, is returned to the
/// caller; there is no retry.
pub async fn wait_connected(eventloop: &mut EventLoop) -> MqttResult<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(MqttError::Connection(format!("connection refused: {code:?}"))),
                };
            }
            Ok(_) => {}
            Err(e) => return Err(MqttError::Connection(e.to_string())),
        }
    }
}

#[async_trait]
impl Channel for MqttChannel {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()> {
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(|e| MqttError::Publish(e.to_string()))
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()> {
        self.client
            .subscribe(filter, qos)
            .await
            .map_err(|e| MqttError::Subscribe(e.to_string()))
    }

    async fn ack(&self, publish: &Publish) -> MqttResult<()> {
        self.client
            .ack(publish)
            .await
            .map_err(|e| MqttError::Ack(e.to_string()))
    }
}
