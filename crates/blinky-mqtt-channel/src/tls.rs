//! TLS configuration for IoT Hub and provisioning connections.
//!
//! Loads the broker CA certificate and, for X.509 identities, the device
//! certificate and private key from PEM files, then configures rumqttc's
//! TLS transport.

use rumqttc::{TlsConfiguration, Transport};

use crate::error::{MqttError, MqttResult};

/// PEM-encoded device certificate and private key.
#[derive(Clone)]
pub struct ClientIdentity {
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_len", &self.cert.len())
            .finish_non_exhaustive()
    }
}

/// Read the device X.509 certificate and key.
///
/// Both files must exist; a missing file is a fatal startup error for the
/// caller.
pub fn load_client_identity(cert_path: &str, key_path: &str) -> MqttResult<ClientIdentity> {
    let cert = std::fs::read(cert_path)
        .map_err(|e| MqttError::Tls(format!("failed to read client cert '{cert_path}': {e}")))?;

    let key = std::fs::read(key_path)
        .map_err(|e| MqttError::Tls(format!("failed to read client key '{key_path}': {e}")))?;

    Ok(ClientIdentity { cert, key })
}

/// Build a TLS transport trusting `ca_cert_path`, optionally presenting a
/// client certificate.
pub fn load_tls_transport(
    ca_cert_path: &str,
    identity: Option<ClientIdentity>,
) -> MqttResult<Transport> {
    let ca = std::fs::read(ca_cert_path)
        .map_err(|e| MqttError::Tls(format!("failed to read CA cert '{ca_cert_path}': {e}")))?;

    Ok(Transport::tls_with_config(TlsConfiguration::Simple {
        ca,
        alpn: None,
        client_auth: identity.map(|id| (id.cert, id.key)),
    }))
}

/// Build MQTT options without TLS (for local testing / dev mode).
pub fn plaintext_transport() -> Transport {
    Transport::Tcp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_client_cert_returns_error() {
        let err = load_client_identity("/nonexistent/cert.pem", "/nonexistent/key.pem")
            .err()
            .expect("should fail");
        let msg = err.to_string();
        assert!(msg.contains("client cert"), "error should mention client cert: {msg}");
    }

    #[test]
    fn missing_ca_cert_returns_error() {
        let err = load_tls_transport("/nonexistent/ca.pem", None)
            .err()
            .expect("should fail");
        let msg = err.to_string();
        assert!(msg.contains("CA cert"), "error should mention CA cert: {msg}");
    }

    #[test]
    fn identity_debug_hides_key() {
        let id = ClientIdentity {
            cert: b"cert".to_vec(),
            key: b"secret".to_vec(),
        };
        assert!(!format!("{id:?}").contains("secret"));
    }
}
