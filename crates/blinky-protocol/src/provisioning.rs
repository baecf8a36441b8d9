//! Device provisioning service (DPS) registration payloads.

use serde::{Deserialize, Serialize};

use crate::connection_string::ConnectionString;

/// Default global provisioning endpoint.
pub const DEFAULT_DPS_HOST: &str = "global.azure-devices-provisioning.net";

/// Body of the `iotdps-register` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub registration_id: String,
}

/// Body of every `$dps/registrations/res/...` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOperation {
    pub operation_id: String,
    /// `assigning`, `assigned`, `failed` or `disabled`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_state: Option<RegistrationState>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_hub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub assigned_hub: String,
    pub device_id: String,
}

impl Registration {
    /// Connection string for the assigned hub, authenticated by the same
    /// X.509 identity used to register.
    pub fn connection_string(&self) -> ConnectionString {
        ConnectionString::x509(&self.assigned_hub, &self.device_id)
    }
}

impl RegistrationOperation {
    pub fn is_assigning(&self) -> bool {
        self.status.eq_ignore_ascii_case("assigning")
    }

    /// The assignment, if the operation completed with a hub and device id.
    pub fn registration(&self) -> Option<Registration> {
        if !self.status.eq_ignore_ascii_case("assigned") {
            return None;
        }
        let state = self.registration_state.as_ref()?;
        Some(Registration {
            assigned_hub: state.assigned_hub.clone()?,
            device_id: state.device_id.clone()?,
        })
    }

    /// Human-readable failure reason for logs.
    pub fn failure_reason(&self) -> String {
        match self
            .registration_state
            .as_ref()
            .and_then(|s| s.error_message.as_deref())
        {
            Some(msg) => format!("{}: {msg}", self.status),
            None => self.status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigned_operation_yields_registration() {
        let json = r#"{
            "operationId": "4.d0a671905ea5b2c8.1",
            "status": "assigned",
            "registrationState": {
                "registrationId": "pi-01",
                "assignedHub": "hub.azure-devices.net",
                "deviceId": "pi-01",
                "status": "assigned"
            }
        }"#;
        let op: RegistrationOperation = serde_json::from_str(json).unwrap();
        let reg = op.registration().unwrap();
        assert_eq!(reg.assigned_hub, "hub.azure-devices.net");
        assert_eq!(
            reg.connection_string().to_string(),
            "HostName=hub.azure-devices.net;DeviceId=pi-01;x509=true"
        );
    }

    #[test]
    fn assigning_operation_has_no_registration() {
        let json = r#"{"operationId": "4.x", "status": "assigning"}"#;
        let op: RegistrationOperation = serde_json::from_str(json).unwrap();
        assert!(op.is_assigning());
        assert!(op.registration().is_none());
    }

    #[test]
    fn failure_reason_includes_error_message() {
        let json = r#"{
            "operationId": "4.x",
            "status": "failed",
            "registrationState": {"errorCode": 401002, "errorMessage": "unauthorized"}
        }"#;
        let op: RegistrationOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op.failure_reason(), "failed: unauthorized");
    }

    #[test]
    fn request_serializes_registration_id() {
        let req = RegistrationRequest {
            registration_id: "pi-01".into(),
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"registrationId":"pi-01"}"#
        );
    }
}
