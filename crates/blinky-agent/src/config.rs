//! Agent configuration, loaded once from a JSON settings file.

use serde::Deserialize;

use blinky_protocol::provisioning::DEFAULT_DPS_HOST;
use blinky_protocol::sas::DEFAULT_TOKEN_TTL_SECS;

/// Top-level configuration for the device agent.
///
/// Pin numbers are BCM GPIO numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Status indicator, pulsed on every successful send and inbound message.
    #[serde(rename = "LEDPin")]
    pub led_pin: u8,
    /// Remote state indicator, driven by the `start`/`stop` methods.
    pub remote_led_pin: u8,
    /// Device connection string. Absent when the device is provisioned at startup.
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Device label written into telemetry payloads.
    #[serde(default = "default_device_id")]
    pub device_id: String,
    /// Use the simulated sensor. Only simulated data is supported.
    #[serde(default = "default_simulated_data")]
    pub simulated_data: bool,
    /// Temperature (celsius) above which telemetry is flagged as an alert.
    #[serde(default = "default_temperature_alert")]
    pub temperature_alert: f64,
    /// Broker port.
    #[serde(default = "default_broker_port")]
    pub broker_port: u16,
    /// Enable TLS. Disable only against a local plaintext broker.
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    /// CA certificate the hub and provisioning service chain to (PEM).
    #[serde(default = "default_ca_cert_path")]
    pub ca_cert_path: String,
    /// Device X.509 certificate, read when the identity is certificate-based.
    #[serde(default = "default_cert_path")]
    pub cert_path: String,
    /// Device private key, read alongside `cert_path`.
    #[serde(default = "default_key_path")]
    pub key_path: String,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u16,
    /// Lifetime of SAS tokens signed from a shared access key.
    #[serde(default = "default_sas_ttl")]
    pub sas_token_ttl_secs: i64,
    /// Device provisioning settings, used when no connection string is set.
    #[serde(default)]
    pub provisioning: Option<ProvisioningSettings>,
}

/// Provisioning service endpoint and device registration identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningSettings {
    #[serde(default = "default_dps_host")]
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    pub id_scope: String,
    pub registration_id: String,
}

fn default_device_id() -> String {
    "Raspberry Pi Node".to_string()
}

fn default_simulated_data() -> bool {
    true
}

fn default_temperature_alert() -> f64 {
    30.0
}

fn default_broker_port() -> u16 {
    8883
}

fn default_use_tls() -> bool {
    true
}

fn default_ca_cert_path() -> String {
    "DigiCertGlobalRootG2.crt.pem".to_string()
}

fn default_cert_path() -> String {
    "certificate-hackathon-x509_cert.pem".to_string()
}

fn default_key_path() -> String {
    "certificate-hackathon-x509_key.pem".to_string()
}

fn default_keepalive() -> u16 {
    30
}

fn default_sas_ttl() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_dps_host() -> String {
    DEFAULT_DPS_HOST.to_string()
}

impl AgentConfig {
    /// Load config from a JSON file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse and validate config from a JSON string.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.connection_string.is_none() && self.provisioning.is_none() {
            anyhow::bail!("config needs either 'connectionString' or 'provisioning'");
        }
        if !self.simulated_data {
            anyhow::bail!("only simulated sensor data is supported ('simulatedData': true)");
        }
        Ok(())
    }
}
