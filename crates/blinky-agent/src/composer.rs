//! Telemetry payload composition from sensor readings.
//!
//! The composer turns a sequence id into a JSON payload plus the
//! temperature-alert flag. Only a simulated sensor is provided.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use blinky_protocol::telemetry::TelemetryPayload;

/// One environmental sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
}

/// Source of environmental samples.
pub trait Sensor: Send {
    fn read(&mut self) -> anyhow::Result<SensorReading>;
}

/// Uniform random readings: temperature in [20, 40), humidity in [60, 80).
pub struct SimulatedSensor {
    rng: StdRng,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sensor for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for SimulatedSensor {
    fn read(&mut self) -> anyhow::Result<SensorReading> {
        Ok(SensorReading {
            temperature: self.rng.gen_range(20.0..40.0),
            humidity: self.rng.gen_range(60.0..80.0),
        })
    }
}

/// Payload and alert flag for one outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedMessage {
    pub payload: Vec<u8>,
    pub temperature_alert: bool,
}

/// Produces the body of an outbound message for a given sequence id.
pub trait MessageComposer: Send {
    fn compose(&mut self, message_id: u64) -> anyhow::Result<ComposedMessage>;
}

/// Composer reading from a `Sensor` and flagging readings above a threshold.
pub struct SensorComposer<S: Sensor> {
    sensor: S,
    device_id: String,
    alert_threshold: f64,
}

impl<S: Sensor> SensorComposer<S> {
    pub fn new(sensor: S, device_id: impl Into<String>, alert_threshold: f64) -> Self {
        Self {
            sensor,
            device_id: device_id.into(),
            alert_threshold,
        }
    }
}

impl<S: Sensor> MessageComposer for SensorComposer<S> {
    fn compose(&mut self, message_id: u64) -> anyhow::Result<ComposedMessage> {
        let reading = self.sensor.read()?;
        let payload = serde_json::to_vec(&TelemetryPayload {
            message_id,
            device_id: self.device_id.clone(),
            temperature: reading.temperature,
            humidity: reading.humidity,
        })?;
        Ok(ComposedMessage {
            payload,
            temperature_alert: reading.temperature > self.alert_threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSensor(SensorReading);

    impl Sensor for FixedSensor {
        fn read(&mut self) -> anyhow::Result<SensorReading> {
            Ok(self.0)
        }
    }

    struct BrokenSensor;

    impl Sensor for BrokenSensor {
        fn read(&mut self) -> anyhow::Result<SensorReading> {
            anyhow::bail!("i2c read failed")
        }
    }

    #[test]
    fn simulated_readings_in_range() {
        let mut sensor = SimulatedSensor::with_seed(42);
        for _ in 0..100 {
            let r = sensor.read().unwrap();
            assert!((20.0..40.0).contains(&r.temperature), "{r:?}");
            assert!((60.0..80.0).contains(&r.humidity), "{r:?}");
        }
    }

    #[test]
    fn seeded_sensor_is_reproducible() {
        let a = SimulatedSensor::with_seed(7).read().unwrap();
        let b = SimulatedSensor::with_seed(7).read().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn payload_carries_message_id_and_device() {
        let sensor = FixedSensor(SensorReading {
            temperature: 25.0,
            humidity: 65.0,
        });
        let mut composer = SensorComposer::new(sensor, "pi-lab", 30.0);
        let msg = composer.compose(12).unwrap();

        let payload: TelemetryPayload = serde_json::from_slice(&msg.payload).unwrap();
        assert_eq!(payload.message_id, 12);
        assert_eq!(payload.device_id, "pi-lab");
        assert_eq!(payload.temperature, 25.0);
        assert!(!msg.temperature_alert);
    }

    #[test]
    fn alert_only_strictly_above_threshold() {
        let at = FixedSensor(SensorReading {
            temperature: 30.0,
            humidity: 70.0,
        });
        assert!(!SensorComposer::new(at, "d", 30.0).compose(1).unwrap().temperature_alert);

        let above = FixedSensor(SensorReading {
            temperature: 30.5,
            humidity: 70.0,
        });
        assert!(SensorComposer::new(above, "d", 30.0).compose(1).unwrap().temperature_alert);
    }

    #[test]
    fn sensor_failure_propagates() {
        let mut composer = SensorComposer::new(BrokenSensor, "d", 30.0);
        let err = composer.compose(1).unwrap_err();
        assert!(err.to_string().contains("i2c"));
    }
}
