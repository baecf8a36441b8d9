use serde::{Deserialize, Serialize};

use crate::topics;

/// Property name flagging a reading above the alert threshold.
pub const PROP_TEMPERATURE_ALERT: &str = "temperatureAlert";
/// Property name carrying the remote indicator state.
pub const PROP_STATE_LED: &str = "stateLed";

/// One device-to-cloud message. Created per send, never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Strictly increasing per process, never reused.
    pub sequence_id: u64,
    pub payload: Vec<u8>,
    pub temperature_alert: bool,
    pub state_led: bool,
}

impl OutboundMessage {
    /// The two string-valued application properties, in wire order.
    pub fn properties(&self) -> [(&'static str, &'static str); 2] {
        [
            (PROP_TEMPERATURE_ALERT, bool_str(self.temperature_alert)),
            (PROP_STATE_LED, bool_str(self.state_led)),
        ]
    }

    /// Events topic for `device_id`, property bag included.
    pub fn topic(&self, device_id: &str) -> String {
        topics::device_events(device_id, &self.properties())
    }
}

fn bool_str(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

/// JSON body of a telemetry message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryPayload {
    pub message_id: u64,
    pub device_id: String,
    /// Degrees celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
}
