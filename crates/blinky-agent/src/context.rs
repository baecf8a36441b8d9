//! Agent context: the single owner of the connection, pins, indicator and
//! sequence counter. Built once at startup and passed by reference to every
//! handler.

use std::sync::Arc;

use blinky_mqtt_channel::{Channel, HubClient};

use crate::composer::MessageComposer;
use crate::config::AgentConfig;
use crate::gpio::{Gpio, GpioResult};
use crate::indicator::Indicator;
use crate::sender::TelemetrySender;

pub struct AgentContext<C: Channel> {
    config: AgentConfig,
    hub: HubClient<C>,
    gpio: Arc<dyn Gpio>,
    indicator: Indicator,
    sender: TelemetrySender,
}

impl<C: Channel> AgentContext<C> {
    pub fn new(
        config: AgentConfig,
        hub: HubClient<C>,
        gpio: Arc<dyn Gpio>,
        indicator: Indicator,
        composer: Box<dyn MessageComposer>,
    ) -> Self {
        Self {
            config,
            hub,
            gpio,
            indicator,
            sender: TelemetrySender::new(composer),
        }
    }

    pub fn hub(&self) -> &HubClient<C> {
        &self.hub
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    pub fn sender(&self) -> &TelemetrySender {
        &self.sender
    }

    /// Drive the remote state indicator.
    pub fn set_remote_indicator(&self, on: bool) -> GpioResult<()> {
        self.gpio.digital_write(self.config.remote_led_pin, on)
    }

    /// Queue one telemetry message tagged with `state_led`.
    pub async fn send_telemetry(&self, state_led: bool) -> anyhow::Result<u64> {
        self.sender.send(&self.hub, state_led).await
    }
}

/// Claim the status and remote indicator pins as outputs.
pub fn setup_pins(gpio: &dyn Gpio, config: &AgentConfig) -> GpioResult<()> {
    gpio.setup_output(config.led_pin)?;
    gpio.setup_output(config.remote_led_pin)
}
