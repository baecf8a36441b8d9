//! Blinky device agent — LED indicator, telemetry and remote commands for a
//! single-board computer connected to IoT Hub.
//!
//! Runs on a single-threaded runtime: every inbound event is handled to
//! completion, in arrival order, on one task.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use blinky_agent::bootstrap;
use blinky_agent::composer::{SensorComposer, SimulatedSensor};
use blinky_agent::config::AgentConfig;
use blinky_agent::context::{self, AgentContext};
use blinky_agent::gpio::{Gpio, RppalGpio};
use blinky_agent::indicator::Indicator;
use blinky_agent::mqtt_loop;
use blinky_mqtt_channel::DpsClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "blinky-agent starting");

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());

    let config = AgentConfig::from_file(&config_path).inspect_err(|e| {
        tracing::error!(path = %config_path, error = %e, "failed to load config");
    })?;
    tracing::info!(
        led_pin = config.led_pin,
        remote_led_pin = config.remote_led_pin,
        "config loaded"
    );

    // ── GPIO ────────────────────────────────────────────────────
    let gpio: Arc<dyn Gpio> = Arc::new(RppalGpio::new()?);
    context::setup_pins(gpio.as_ref(), &config)?;
    let indicator = Indicator::new(Arc::clone(&gpio), config.led_pin);
    indicator.pulse();

    let composer = SensorComposer::new(
        SimulatedSensor::new(),
        config.device_id.clone(),
        config.temperature_alert,
    );

    // ── Connection ──────────────────────────────────────────────
    let connection = bootstrap::resolve_connection_string(&config, DpsClient::new)
        .await
        .inspect_err(|e| tracing::error!("failed to resolve connection: {e:#}"))?;

    let mqtt = bootstrap::mqtt_config(&config, &connection, chrono::Utc::now())?;
    let (hub, eventloop) = bootstrap::open_hub(&mqtt, &connection.device_id)
        .await
        .inspect_err(|e| tracing::error!("IoT Hub connect failed: {e:#}"))?;

    let ctx = AgentContext::new(config, hub, gpio, indicator, Box::new(composer));

    tracing::info!(device_id = %connection.device_id, "blinky-agent ready");

    tokio::select! {
        result = mqtt_loop::run(eventloop, &ctx) => {
            result.inspect_err(|e| tracing::error!("IoT Hub connection lost: {e}"))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("blinky-agent stopped");
    Ok(())
}
