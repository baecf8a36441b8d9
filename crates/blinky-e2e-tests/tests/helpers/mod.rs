//! Shared test harness for E2E integration tests.
//!
//! Wires a real `AgentContext` to a `MockChannel` and `MockGpio`, so tests
//! exercise the agent's dispatch, telemetry and indicator paths across
//! crate boundaries without a broker or hardware.

#![allow(dead_code)]

use std::sync::Arc;

use rumqttc::{Event, Outgoing, Packet, PubAck, Publish, QoS};

use blinky_agent::composer::{SensorComposer, SimulatedSensor};
use blinky_agent::config::AgentConfig;
use blinky_agent::context::{AgentContext, setup_pins};
use blinky_agent::gpio::MockGpio;
use blinky_agent::indicator::Indicator;
use blinky_agent::mqtt_loop;
use blinky_mqtt_channel::mock::PublishedMessage;
use blinky_mqtt_channel::{HubClient, MockChannel};
use blinky_protocol::telemetry::TelemetryPayload;

pub const LED_PIN: u8 = 1;
pub const REMOTE_LED_PIN: u8 = 2;
pub const DEVICE_ID: &str = "d";

pub const CONFIG_JSON: &str = r#"{
    "LEDPin": 1,
    "remoteLedPin": 2,
    "connectionString": "HostName=h;DeviceId=d;SharedAccessKey=k",
    "deviceId": "Raspberry Pi Node"
}"#;

/// End-to-end harness: one agent context over mock transport and pins.
pub struct TestHarness {
    pub ctx: AgentContext<Arc<MockChannel>>,
    pub mqtt: Arc<MockChannel>,
    pub gpio: Arc<MockGpio>,
    next_pkid: u16,
    next_outgoing_pkid: u16,
    written: usize,
}

impl TestHarness {
    pub fn new() -> Self {
        let config = AgentConfig::from_json(CONFIG_JSON).unwrap();
        let mqtt = Arc::new(MockChannel::new());
        let gpio = Arc::new(MockGpio::new());
        setup_pins(gpio.as_ref(), &config).unwrap();

        let indicator = Indicator::new(gpio.clone(), config.led_pin);
        let composer = SensorComposer::new(
            SimulatedSensor::with_seed(2024),
            config.device_id.clone(),
            config.temperature_alert,
        );
        let ctx = AgentContext::new(
            config,
            HubClient::new(mqtt.clone(), DEVICE_ID),
            gpio.clone(),
            indicator,
            Box::new(composer),
        );

        Self {
            ctx,
            mqtt,
            gpio,
            next_pkid: 1,
            next_outgoing_pkid: 1,
            written: 0,
        }
    }

    /// Deliver a raw publish through the agent's dispatcher.
    pub async fn deliver(&mut self, topic: &str, payload: &[u8], qos: QoS) -> u16 {
        let mut publish = Publish::new(topic, qos, payload);
        if qos != QoS::AtMostOnce {
            publish.pkid = self.next_pkid;
            self.next_pkid += 1;
        }
        mqtt_loop::handle_publish(&self.ctx, &publish).await;
        publish.pkid
    }

    /// Invoke a direct method the way the hub would.
    pub async fn invoke(&mut self, method: &str, request_id: &str, payload: &[u8]) {
        let topic = format!("$iothub/methods/POST/{method}/?$rid={request_id}");
        self.deliver(&topic, payload, QoS::AtMostOnce).await;
    }

    /// Send a cloud-to-device message.
    pub async fn cloud_to_device(&mut self, payload: &[u8]) -> u16 {
        let topic = format!("devices/{DEVICE_ID}/messages/devicebound/");
        self.deliver(&topic, payload, QoS::AtLeastOnce).await
    }

    /// Report every publish queued since the last call as written to the
    /// wire, the way the event loop does. Returns the QoS 1 packet ids.
    pub async fn write_outgoing(&mut self) -> Vec<u16> {
        let published = self.mqtt.published();
        let mut pkids = Vec::new();
        for message in &published[self.written..] {
            let pkid = if message.qos == QoS::AtMostOnce {
                0
            } else {
                let pkid = self.next_outgoing_pkid;
                self.next_outgoing_pkid += 1;
                pkids.push(pkid);
                pkid
            };
            let event = Event::Outgoing(Outgoing::Publish(pkid));
            mqtt_loop::handle_event(&self.ctx, &event).await;
        }
        self.written = published.len();
        pkids
    }

    /// Deliver the hub's PUBACK for `pkid`.
    pub async fn puback(&self, pkid: u16) {
        let event = Event::Incoming(Packet::PubAck(PubAck::new(pkid)));
        mqtt_loop::handle_event(&self.ctx, &event).await;
    }

    /// Telemetry messages published so far.
    pub fn telemetry(&self) -> Vec<PublishedMessage> {
        self.mqtt
            .published_with_prefix(&format!("devices/{DEVICE_ID}/messages/events/"))
    }

    /// Method replies published so far.
    pub fn replies(&self) -> Vec<PublishedMessage> {
        self.mqtt.published_with_prefix("$iothub/methods/res/")
    }
}

/// Decode a telemetry payload.
pub fn payload(message: &PublishedMessage) -> TelemetryPayload {
    serde_json::from_slice(&message.payload).unwrap()
}
