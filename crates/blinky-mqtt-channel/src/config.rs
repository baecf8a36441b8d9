//! MQTT connection settings.

/// MQTT connection configuration.
///
/// Built by the agent's bootstrapper from a parsed connection string.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// MQTT broker hostname (IoT Hub or edge gateway).
    pub broker_host: String,
    /// MQTT broker port (8883 for TLS).
    pub broker_port: u16,
    /// MQTT client ID (the device id for IoT Hub).
    pub client_id: String,
    /// MQTT username (`{hub}/{device}/?api-version=...`).
    pub username: String,
    /// SAS token for shared-key auth. `None` for X.509.
    pub password: Option<String>,
    /// Enable TLS. When false, connects plaintext (local dev broker).
    pub use_tls: bool,
    /// Path to the CA certificate the broker chains to (PEM).
    pub ca_cert_path: String,
    /// Path to device X.509 certificate (PEM). Set only for X.509 auth.
    pub client_cert_path: Option<String>,
    /// Path to device private key (PEM). Set only for X.509 auth.
    pub client_key_path: Option<String>,
    /// Keep-alive interval in seconds.
    pub keepalive_secs: u16,
}

impl MqttConfig {
    /// Whether a client certificate will be presented during the handshake.
    pub fn uses_client_cert(&self) -> bool {
        self.client_cert_path.is_some() && self.client_key_path.is_some()
    }
}
