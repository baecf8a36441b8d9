//! IoT Hub device connection strings.
//!
//! Format: `HostName=<hub>;DeviceId=<id>;SharedAccessKey=<base64>` with
//! `SharedAccessSignature=<token>` or `x509=true` as alternative credentials.
//! Values may themselves contain `=` (base64 padding), so each segment is
//! split on the first `=` only.

use std::fmt;
use std::str::FromStr;

use crate::error::{ProtocolError, ProtocolResult};

/// How the device proves its identity to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Symmetric key; a SAS token is signed from it at connect time.
    SharedAccessKey(String),
    /// Pre-signed SAS token, used verbatim as the MQTT password.
    SharedAccessSignature(String),
    /// X.509 client certificate presented during the TLS handshake.
    X509,
}

/// Parsed device connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub host_name: String,
    pub device_id: String,
    pub credential: Credential,
    /// Edge gateway to connect through instead of the hub itself.
    pub gateway_host_name: Option<String>,
}

impl ConnectionString {
    /// Build an X.509 connection string, as synthesized after provisioning.
    pub fn x509(host_name: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            device_id: device_id.into(),
            credential: Credential::X509,
            gateway_host_name: None,
        }
    }

    pub fn parse(s: &str) -> ProtocolResult<Self> {
        let mut host_name = None;
        let mut device_id = None;
        let mut key = None;
        let mut signature = None;
        let mut x509 = false;
        let mut gateway_host_name = None;

        for segment in s.split(';').map(str::trim).filter(|seg| !seg.is_empty()) {
            let (name, value) = segment
                .split_once('=')
                .ok_or_else(|| ProtocolError::MalformedSegment(segment.to_string()))?;
            match name.trim() {
                "HostName" => host_name = Some(value.to_string()),
                "DeviceId" => device_id = Some(value.to_string()),
                "SharedAccessKey" => key = Some(value.to_string()),
                "SharedAccessSignature" => signature = Some(value.to_string()),
                "GatewayHostName" => gateway_host_name = Some(value.to_string()),
                "x509" => x509 = value.trim().eq_ignore_ascii_case("true"),
                // Unknown keys (e.g. ModuleId) are tolerated and ignored.
                _ => {}
            }
        }

        let credential = match (key, signature, x509) {
            (_, _, true) => Credential::X509,
            (Some(k), _, false) => Credential::SharedAccessKey(k),
            (None, Some(sig), false) => Credential::SharedAccessSignature(sig),
            (None, None, false) => {
                return Err(ProtocolError::MissingField(
                    "SharedAccessKey, SharedAccessSignature or x509",
                ));
            }
        };

        Ok(Self {
            host_name: host_name
                .filter(|h| !h.is_empty())
                .ok_or(ProtocolError::MissingField("HostName"))?,
            device_id: device_id
                .filter(|d| !d.is_empty())
                .ok_or(ProtocolError::MissingField("DeviceId"))?,
            credential,
            gateway_host_name,
        })
    }

    /// Whether the connection string asks for certificate-based identity.
    pub fn uses_x509(&self) -> bool {
        matches!(self.credential, Credential::X509)
    }

    /// Host the MQTT client should dial (gateway if present, else hub).
    pub fn broker_host(&self) -> &str {
        self.gateway_host_name.as_deref().unwrap_or(&self.host_name)
    }
}

impl FromStr for ConnectionString {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostName={};DeviceId={}", self.host_name, self.device_id)?;
        match &self.credential {
            Credential::SharedAccessKey(k) => write!(f, ";SharedAccessKey={k}")?,
            Credential::SharedAccessSignature(s) => write!(f, ";SharedAccessSignature={s}")?,
            Credential::X509 => write!(f, ";x509=true")?,
        }
        if let Some(gateway) = &self.gateway_host_name {
            write!(f, ";GatewayHostName={gateway}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_shared_key() {
        let cs = ConnectionString::parse("HostName=h;DeviceId=d;SharedAccessKey=k").unwrap();
        assert_eq!(cs.host_name, "h");
        assert_eq!(cs.device_id, "d");
        assert_eq!(cs.credential, Credential::SharedAccessKey("k".into()));
        assert!(!cs.uses_x509());
    }

    #[test]
    fn key_keeps_base64_padding() {
        let cs = ConnectionString::parse(
            "HostName=hub.azure-devices.net;DeviceId=pi;SharedAccessKey=YWJjZA==",
        )
        .unwrap();
        assert_eq!(cs.credential, Credential::SharedAccessKey("YWJjZA==".into()));
    }

    #[test]
    fn parse_x509_marker() {
        let cs = ConnectionString::parse("HostName=h;DeviceId=d;x509=true").unwrap();
        assert!(cs.uses_x509());
    }

    #[test]
    fn x509_false_requires_other_credential() {
        let err = ConnectionString::parse("HostName=h;DeviceId=d;x509=false").unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField(_)));
    }

    #[test]
    fn missing_host_name() {
        let err = ConnectionString::parse("DeviceId=d;SharedAccessKey=k").unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField("HostName")));
    }

    #[test]
    fn malformed_segment() {
        let err = ConnectionString::parse("HostName=h;garbage;DeviceId=d").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedSegment(ref s) if s == "garbage"));
    }

    #[test]
    fn gateway_overrides_broker_host() {
        let cs = ConnectionString::parse(
            "HostName=h;DeviceId=d;SharedAccessKey=k;GatewayHostName=edge.local",
        )
        .unwrap();
        assert_eq!(cs.broker_host(), "edge.local");
    }

    #[test]
    fn display_synthesizes_x509_string() {
        let cs = ConnectionString::x509("hub.azure-devices.net", "pi-01");
        assert_eq!(
            cs.to_string(),
            "HostName=hub.azure-devices.net;DeviceId=pi-01;x509=true"
        );
        assert_eq!(ConnectionString::parse(&cs.to_string()).unwrap(), cs);
    }
}
