//! Telemetry sender.
//!
//! Each send takes the next sequence id, asks the composer for a payload,
//! tags it with `temperatureAlert`/`stateLed` and queues it at QoS 1. The
//! indicator pulses when the hub acknowledges the message (`delivered`);
//! a rejected publish is logged and returned, never retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::Context as _;

use blinky_mqtt_channel::{Channel, HubClient};
use blinky_protocol::telemetry::OutboundMessage;

use crate::composer::MessageComposer;
use crate::indicator::Indicator;

pub struct TelemetrySender {
    last_sequence_id: AtomicU64,
    composer: Mutex<Box<dyn MessageComposer>>,
}

impl TelemetrySender {
    pub fn new(composer: Box<dyn MessageComposer>) -> Self {
        Self {
            last_sequence_id: AtomicU64::new(0),
            composer: Mutex::new(composer),
        }
    }

    /// Last sequence id handed out (0 before the first send).
    pub fn last_sequence_id(&self) -> u64 {
        self.last_sequence_id.load(Ordering::SeqCst)
    }

    /// Allocate the next sequence id and compose a message for it.
    ///
    /// The id is consumed even if composition fails, so ids are never reused.
    pub fn next_message(&self, state_led: bool) -> anyhow::Result<OutboundMessage> {
        let sequence_id = self.last_sequence_id.fetch_add(1, Ordering::SeqCst) + 1;
        let composed = self
            .composer
            .lock()
            .map_err(|_| anyhow::anyhow!("message composer poisoned"))?
            .compose(sequence_id)
            .with_context(|| format!("failed to compose message {sequence_id}"))?;

        Ok(OutboundMessage {
            sequence_id,
            payload: composed.payload,
            temperature_alert: composed.temperature_alert,
            state_led,
        })
    }

    /// Compose and queue one message. Returns its sequence id.
    ///
    /// `Ok` means the client accepted the publish; the message counts as
    /// sent only once `delivered` is called for its id.
    pub async fn send<C: Channel>(
        &self,
        hub: &HubClient<C>,
        state_led: bool,
    ) -> anyhow::Result<u64> {
        let message = self.next_message(state_led)?;
        tracing::info!(
            sequence_id = message.sequence_id,
            temperature_alert = message.temperature_alert,
            state_led,
            payload = %String::from_utf8_lossy(&message.payload),
            "sending message"
        );

        hub.send_event(&message).await.map_err(|e| {
            tracing::error!(
                sequence_id = message.sequence_id,
                error = %e,
                "failed to send message"
            );
            anyhow::Error::from(e)
        })?;
        Ok(message.sequence_id)
    }

    /// The hub acknowledged `sequence_id`: pulse the indicator.
    pub fn delivered(&self, sequence_id: u64, indicator: &Indicator) {
        indicator.pulse();
        tracing::info!(sequence_id, "message sent");
    }
}
