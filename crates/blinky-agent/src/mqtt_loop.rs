//! MQTT event loop driver and incoming message dispatcher.
//!
//! Polls the rumqttc event loop and handles each event to completion
//! before polling again, so inbound messages and delivery acknowledgements
//! are processed one at a time in arrival order.

use rumqttc::{Event, EventLoop, Packet, Publish};

use blinky_mqtt_channel::{
    Channel, CloudMessage, IncomingMessage, MqttError, MqttResult, classify,
};

use crate::commands;
use crate::context::AgentContext;

/// Drive the MQTT event loop and dispatch every event.
///
/// There is no reconnect: the subscriptions and SAS token belong to the
/// session opened at startup, so the first connection error ends the loop
/// and is returned. Telemetry still waiting for a PUBACK is logged as
/// undelivered.
pub async fn run<C: Channel>(
    mut eventloop: EventLoop,
    ctx: &AgentContext<C>,
) -> MqttResult<()> {
    loop {
        match eventloop.poll().await {
            Ok(event) => handle_event(ctx, &event).await,
            Err(e) => {
                let undelivered = ctx.hub().undelivered();
                if !undelivered.is_empty() {
                    tracing::error!(
                        sequence_ids = ?undelivered,
                        "messages not acknowledged by the hub"
                    );
                }
                return Err(MqttError::Connection(e.to_string()));
            }
        }
    }
}

/// Handle one event loop event: dispatch inbound publishes and turn hub
/// PUBACKs into delivered telemetry.
pub async fn handle_event<C: Channel>(ctx: &AgentContext<C>, event: &Event) {
    if let Event::Incoming(Packet::Publish(publish)) = event {
        handle_publish(ctx, publish).await;
    } else if let Some(sequence_id) = ctx.hub().confirm_delivery(event) {
        ctx.sender().delivered(sequence_id, ctx.indicator());
    }
}

/// Dispatch one inbound publish, then complete it exactly once.
pub async fn handle_publish<C: Channel>(ctx: &AgentContext<C>, publish: &Publish) {
    match classify(publish) {
        IncomingMessage::Method(request) => {
            commands::handle(ctx, &request).await;
        }
        IncomingMessage::CloudToDevice(message) => {
            handle_cloud_message(ctx, &message);
        }
        IncomingMessage::Unknown { topic, .. } => {
            tracing::debug!(topic = %topic, "ignoring unrecognized message");
        }
    }

    if let Err(e) = ctx.hub().complete(publish).await {
        tracing::warn!(topic = %publish.topic, error = %e, "failed to complete message");
    }
}

fn handle_cloud_message<C: Channel>(ctx: &AgentContext<C>, message: &CloudMessage) {
    ctx.indicator().pulse();
    tracing::info!(
        message = %message.text(),
        properties = ?message.properties,
        "received message"
    );
}
