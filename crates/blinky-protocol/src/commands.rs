//! Direct-method (remote command) request and reply types.

use serde::Serialize;

use crate::topics;

/// A broker-initiated command invocation, scoped to one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRequest {
    /// Method name, e.g. `start` or `stop`.
    pub name: String,
    /// Request id echoed on the reply topic.
    pub request_id: String,
    /// Opaque payload as sent by the caller.
    pub payload: Vec<u8>,
}

impl MethodRequest {
    /// Payload rendered for logs; empty payloads render as an empty string.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Reply to a direct method: HTTP-style status and a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodResponse {
    pub status: u16,
    pub body: String,
}

impl MethodResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn not_found(method: &str) -> Self {
        Self {
            status: 404,
            body: format!("method '{method}' is not implemented"),
        }
    }

    /// Reply topic for the request this answers.
    pub fn topic(&self, request_id: &str) -> String {
        topics::method_response(self.status, request_id)
    }

    /// Reply body as JSON (a JSON string value).
    pub fn payload(&self) -> Vec<u8> {
        json_bytes(&self.body)
    }
}

fn json_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    // Serializing a plain string cannot fail.
    serde_json::to_vec(value).unwrap_or_default()
}
