//! Device provisioning handshake (Azure DPS over MQTT).
//!
//! Presents an X.509 identity plus scope and registration id, then follows
//! `202 assigning` responses (honouring `retry-after`) until the service
//! answers `assigned` or fails. There is no retry on failure.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};

use crate::error::{MqttError, MqttResult};
use crate::tls;
use blinky_protocol::provisioning::{Registration, RegistrationOperation, RegistrationRequest};
use blinky_protocol::topics;

/// Poll delay when the service omits `retry-after`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(3);

/// Everything needed to register one device.
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    pub host: String,
    pub port: u16,
    pub id_scope: String,
    pub registration_id: String,
    pub ca_cert_path: String,
    pub client_cert_path: String,
    pub client_key_path: String,
}

/// Trades a device identity for hub connection parameters.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn register(&self) -> MqttResult<Registration>;
}

/// What the handshake should do after a response.
#[derive(Debug, PartialEq, Eq)]
pub enum FlowStep {
    /// Publish an operation-status query after `delay`.
    Poll {
        topic: String,
        delay: Duration,
    },
    /// Registration finished.
    Assigned(Registration),
    /// Not a provisioning response; keep waiting.
    Ignore,
}

/// Protocol state of one registration attempt.
#[derive(Debug)]
pub struct RegistrationFlow {
    registration_id: String,
    next_request_id: u64,
}

impl RegistrationFlow {
    pub fn new(registration_id: impl Into<String>) -> Self {
        Self {
            registration_id: registration_id.into(),
            next_request_id: 1,
        }
    }

    fn request_id(&mut self) -> String {
        let rid = self.next_request_id;
        self.next_request_id += 1;
        rid.to_string()
    }

    /// Topic and body of the initial `iotdps-register` publish.
    pub fn register_request(&mut self) -> MqttResult<(String, Vec<u8>)> {
        let body = serde_json::to_vec(&RegistrationRequest {
            registration_id: self.registration_id.clone(),
        })
        .map_err(|e| MqttError::Serialization(e.to_string()))?;
        Ok((topics::dps_register(&self.request_id()), body))
    }

    /// Advance on a response publish.
    pub fn on_response(&mut self, topic: &str, payload: &[u8]) -> MqttResult<FlowStep> {
        let Some(response) = topics::parse_dps_response(topic) else {
            return Ok(FlowStep::Ignore);
        };

        if response.status >= 300 {
            return Err(MqttError::Provisioning(format!(
                "registration rejected with status {}: {}",
                response.status,
                String::from_utf8_lossy(payload)
            )));
        }

        let operation: RegistrationOperation = serde_json::from_slice(payload)
            .map_err(|e| MqttError::Serialization(format!("invalid DPS response: {e}")))?;

        if let Some(registration) = operation.registration() {
            return Ok(FlowStep::Assigned(registration));
        }

        if operation.is_assigning() {
            let delay = response
                .retry_after_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            let rid = self.request_id();
            return Ok(FlowStep::Poll {
                topic: topics::dps_operation_status(&rid, &operation.operation_id),
                delay,
            });
        }

        Err(MqttError::Provisioning(operation.failure_reason()))
    }
}

/// Provisioning client over MQTT with an X.509 identity.
pub struct DpsClient {
    config: ProvisioningConfig,
}

impl DpsClient {
    pub fn new(config: ProvisioningConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Provisioner for DpsClient {
    async fn register(&self) -> MqttResult<Registration> {
        let config = &self.config;
        let identity = tls::load_client_identity(&config.client_cert_path, &config.client_key_path)?;

        let mut options = MqttOptions::new(&config.registration_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        options.set_credentials(
            topics::dps_username(&config.id_scope, &config.registration_id),
            "",
        );
        options.set_transport(tls::load_tls_transport(&config.ca_cert_path, Some(identity))?);

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        client
            .subscribe(topics::DPS_RESPONSE_FILTER, QoS::AtLeastOnce)
            .await
            .map_err(|e| MqttError::Subscribe(e.to_string()))?;

        let mut flow = RegistrationFlow::new(&config.registration_id);
        let (topic, body) = flow.register_request()?;
        client
            .publish(topic, QoS::AtLeastOnce, false, body)
            .await
            .map_err(|e| MqttError::Publish(e.to_string()))?;

        tracing::info!(
            host = %config.host,
            registration_id = %config.registration_id,
            "provisioning registration sent"
        );

        loop {
            let publish = match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => publish,
                Ok(_) => continue,
                Err(e) => return Err(MqttError::Connection(e.to_string())),
            };

            match flow.on_response(&publish.topic, &publish.payload)? {
                FlowStep::Poll { topic, delay } => {
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "registration pending");
                    tokio::time::sleep(delay).await;
                    client
                        .publish(topic, QoS::AtLeastOnce, false, Vec::new())
                        .await
                        .map_err(|e| MqttError::Publish(e.to_string()))?;
                }
                FlowStep::Assigned(registration) => {
                    if let Err(e) = client.disconnect().await {
                        tracing::debug!(error = %e, "provisioning disconnect failed");
                    }
                    return Ok(registration);
                }
                FlowStep::Ignore => {}
            }
        }
    }
}
