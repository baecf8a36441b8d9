//! GPIO output abstraction.
//!
//! `Gpio` trait with `setup_output`/`digital_write`. Two impls:
//! - `RppalGpio` — Raspberry Pi, wraps `rppal::gpio` output pins
//! - `MockGpio` — all platforms, records every write for assertions

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rppal::gpio::{Level, OutputPin};
use thiserror::Error;

/// Errors that can occur while driving GPIO pins.
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("GPIO unavailable: {0}")]
    Unavailable(String),

    #[error("pin {pin} error: {message}")]
    Pin { pin: u8, message: String },

    #[error("pin {0} is not configured as an output")]
    NotConfigured(u8),
}

/// Convenience alias for GPIO results.
pub type GpioResult<T> = Result<T, GpioError>;

/// Digital output driver.
pub trait Gpio: Send + Sync {
    /// Claim `pin` as a digital output.
    fn setup_output(&self, pin: u8) -> GpioResult<()>;

    /// Drive `pin` high (`true`) or low (`false`).
    fn digital_write(&self, pin: u8, high: bool) -> GpioResult<()>;
}

// ── RppalGpio ─────────────────────────────────────────────────

/// Raspberry Pi GPIO via `/dev/gpiomem`. Pins are BCM numbers.
///
/// Claimed pins are held for the process lifetime; rppal resets them to
/// their original state when the driver is dropped.
pub struct RppalGpio {
    gpio: rppal::gpio::Gpio,
    outputs: Mutex<HashMap<u8, OutputPin>>,
}

impl RppalGpio {
    pub fn new() -> GpioResult<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| GpioError::Unavailable(e.to_string()))?;
        Ok(Self {
            gpio,
            outputs: Mutex::new(HashMap::new()),
        })
    }
}

impl Gpio for RppalGpio {
    fn setup_output(&self, pin: u8) -> GpioResult<()> {
        let output = self
            .gpio
            .get(pin)
            .map_err(|e| GpioError::Pin {
                pin,
                message: e.to_string(),
            })?
            .into_output_low();
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pin, output);
        Ok(())
    }

    fn digital_write(&self, pin: u8, high: bool) -> GpioResult<()> {
        let mut outputs = self.outputs.lock().unwrap_or_else(PoisonError::into_inner);
        let output = outputs.get_mut(&pin).ok_or(GpioError::NotConfigured(pin))?;
        output.write(if high { Level::High } else { Level::Low });
        Ok(())
    }
}

// ── MockGpio ──────────────────────────────────────────────────

/// Mock GPIO that records writes instead of touching hardware.
#[derive(Default)]
pub struct MockGpio {
    outputs: Mutex<Vec<u8>>,
    writes: Mutex<Vec<(u8, bool)>>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins claimed as outputs, in setup order.
    pub fn outputs(&self) -> Vec<u8> {
        self.outputs.lock().unwrap().clone()
    }

    /// Every `(pin, level)` write, in order.
    pub fn writes(&self) -> Vec<(u8, bool)> {
        self.writes.lock().unwrap().clone()
    }

    /// Writes to one pin, in order.
    pub fn writes_to(&self, pin: u8) -> Vec<bool> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
            .collect()
    }

    /// Last level written to `pin`, if any.
    pub fn level(&self, pin: u8) -> Option<bool> {
        self.writes_to(pin).last().copied()
    }
}

impl Gpio for MockGpio {
    fn setup_output(&self, pin: u8) -> GpioResult<()> {
        self.outputs.lock().unwrap().push(pin);
        Ok(())
    }

    fn digital_write(&self, pin: u8, high: bool) -> GpioResult<()> {
        self.writes.lock().unwrap().push((pin, high));
        Ok(())
    }
}
