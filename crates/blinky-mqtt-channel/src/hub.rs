//! IoT Hub device operations over any `Channel`.
//!
//! Typed helpers for telemetry, direct-method replies and the two inbound
//! subscriptions the agent needs. Telemetry is published at QoS 1 and is
//! only delivered once the hub's PUBACK is seen by `confirm_delivery`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rumqttc::{Event, Publish, QoS};

use crate::channel::Channel;
use crate::delivery::DeliveryTracker;
use crate::error::MqttResult;
use blinky_protocol::commands::MethodResponse;
use blinky_protocol::telemetry::OutboundMessage;
use blinky_protocol::topics;

/// Device-side IoT Hub client backed by a `Channel` implementation.
///
/// Wraps any `Channel` (real or mock).
pub struct HubClient<C: Channel> {
    channel: C,
    device_id: String,
    deliveries: Mutex<DeliveryTracker<u64>>,
}

impl<C: Channel> HubClient<C> {
    pub fn new(channel: C, device_id: impl Into<String>) -> Self {
        Self {
            channel,
            device_id: device_id.into(),
            deliveries: Mutex::new(DeliveryTracker::new()),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Queue one telemetry message with its property bag.
    ///
    /// `Ok` means the client accepted the publish, not that the hub has it;
    /// delivery is reported later by `confirm_delivery`.
    pub async fn send_event(&self, message: &OutboundMessage) -> MqttResult<()> {
        let topic = message.topic(&self.device_id);
        self.channel
            .publish(&topic, &message.payload, QoS::AtLeastOnce)
            .await?;
        self.deliveries().queued(Some(message.sequence_id));
        Ok(())
    }

    /// Feed an event loop event; returns the sequence id of a telemetry
    /// message the hub has just acknowledged.
    pub fn confirm_delivery(&self, event: &Event) -> Option<u64> {
        self.deliveries().on_event(event)
    }

    /// Sequence ids queued or in flight without a PUBACK.
    pub fn undelivered(&self) -> Vec<u64> {
        self.deliveries().pending()
    }

    fn deliveries(&self) -> MutexGuard<'_, DeliveryTracker<u64>> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reply to a direct-method invocation.
    pub async fn send_method_response(
        &self,
        request_id: &str,
        response: &MethodResponse,
    ) -> MqttResult<()> {
        self.channel
            .publish(
                &response.topic(request_id),
                &response.payload(),
                QoS::AtMostOnce,
            )
            .await?;
        self.deliveries().queued(None);
        Ok(())
    }

    /// Subscribe to direct-method invocations.
    pub async fn subscribe_methods(&self) -> MqttResult<()> {
        self.channel
            .subscribe(topics::METHODS_FILTER, QoS::AtMostOnce)
            .await
    }

    /// Subscribe to cloud-to-device messages.
    pub async fn subscribe_cloud_to_device(&self) -> MqttResult<()> {
        let filter = topics::devicebound_filter(&self.device_id);
        self.channel.subscribe(&filter, QoS::AtLeastOnce).await
    }

    /// Complete an inbound message.
    pub async fn complete(&self, publish: &Publish) -> MqttResult<()> {
        self.channel.ack(publish).await
    }
}
