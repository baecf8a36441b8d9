//! Incoming message classification for the MQTT event loop.
//!
//! Parses raw MQTT publishes into typed `IncomingMessage` variants
//! so the device agent can dispatch them without topic string matching.

use rumqttc::Publish;

use blinky_protocol::commands::MethodRequest;
use blinky_protocol::topics;

/// A cloud-to-device message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudMessage {
    pub payload: Vec<u8>,
    /// Decoded application and system properties from the topic.
    pub properties: Vec<(String, String)>,
}

impl CloudMessage {
    /// Payload decoded as UTF-8; invalid sequences are replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// A classified incoming MQTT message.
#[derive(Debug)]
pub enum IncomingMessage {
    /// Direct-method invocation.
    Method(MethodRequest),
    /// Cloud-to-device message.
    CloudToDevice(CloudMessage),
    /// Unrecognized topic.
    Unknown { topic: String, payload: Vec<u8> },
}

/// Classify a raw MQTT publish into a typed message.
pub fn classify(publish: &Publish) -> IncomingMessage {
    let topic = &publish.topic;
    let payload = publish.payload.to_vec();

    if let Some((name, request_id)) = topics::parse_method_request(topic) {
        return IncomingMessage::Method(MethodRequest {
            name,
            request_id,
            payload,
        });
    }

    if let Some(properties) = topics::parse_devicebound(topic) {
        return IncomingMessage::CloudToDevice(CloudMessage {
            payload,
            properties,
        });
    }

    IncomingMessage::Unknown {
        topic: topic.clone(),
        payload,
    }
}
