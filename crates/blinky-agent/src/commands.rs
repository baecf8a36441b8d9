//! Direct-method handlers for `start` and `stop`.
//!
//! Each invocation writes the remote indicator, sends exactly one telemetry
//! message and replies 200. There is no idempotence guard, and a failed
//! reply does not undo the GPIO write.

use blinky_mqtt_channel::Channel;
use blinky_protocol::commands::{MethodRequest, MethodResponse};

use crate::context::AgentContext;

pub const START: &str = "start";
pub const STOP: &str = "stop";

const START_REPLY: &str = "Successully start sending message to cloud";
const STOP_REPLY: &str = "Successully stop sending message to cloud";

/// Run a method invocation and publish its reply.
///
/// Returns the reply that was (or failed to be) sent.
pub async fn handle<C: Channel>(ctx: &AgentContext<C>, request: &MethodRequest) -> MethodResponse {
    tracing::info!(
        method = %request.name,
        request_id = %request.request_id,
        payload = %request.payload_text(),
        "invoking method"
    );

    let response = match request.name.as_str() {
        START => set_remote_state(ctx, true, START_REPLY).await,
        STOP => set_remote_state(ctx, false, STOP_REPLY).await,
        other => {
            tracing::warn!(method = other, "unknown method");
            MethodResponse::not_found(other)
        }
    };

    if let Err(e) = ctx
        .hub()
        .send_method_response(&request.request_id, &response)
        .await
    {
        tracing::error!(
            method = %request.name,
            error = %e,
            "failed sending a method response"
        );
    }

    response
}

async fn set_remote_state<C: Channel>(
    ctx: &AgentContext<C>,
    on: bool,
    reply: &str,
) -> MethodResponse {
    if let Err(e) = ctx.set_remote_indicator(on) {
        tracing::warn!(error = %e, "failed to drive remote indicator");
    }

    // Telemetry is fire-and-forget: the sender already logged the failure.
    if let Err(e) = ctx.send_telemetry(on).await {
        tracing::debug!(error = %e, "telemetry for method not sent");
    }

    MethodResponse::ok(reply)
}
