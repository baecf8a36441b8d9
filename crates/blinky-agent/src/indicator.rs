//! Indicator pulse: drive an output high, then low after a fixed delay.
//!
//! The pending off-timer is a single cancellable task. Starting a new pulse
//! aborts the previous timer, so an older pulse can never switch the LED
//! off while a newer one is still lit.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::gpio::Gpio;

/// How long the indicator stays lit per pulse.
pub const PULSE_DURATION: Duration = Duration::from_millis(500);

pub struct Indicator {
    gpio: Arc<dyn Gpio>,
    pin: u8,
    pending_off: Mutex<Option<JoinHandle<()>>>,
}

impl Indicator {
    pub fn new(gpio: Arc<dyn Gpio>, pin: u8) -> Self {
        Self {
            gpio,
            pin,
            pending_off: Mutex::new(None),
        }
    }

    /// Light the indicator and schedule it off, replacing any pending
    /// off-timer. Must be called from within a tokio runtime.
    pub fn pulse(&self) {
        let mut pending = self
            .pending_off
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        if let Err(e) = self.gpio.digital_write(self.pin, true) {
            tracing::warn!(pin = self.pin, error = %e, "failed to light indicator");
        }

        let gpio = Arc::clone(&self.gpio);
        let pin = self.pin;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(PULSE_DURATION).await;
            if let Err(e) = gpio.digital_write(pin, false) {
                tracing::warn!(pin, error = %e, "failed to clear indicator");
            }
        }));
    }
}

impl Drop for Indicator {
    fn drop(&mut self) {
        if let Some(handle) = self
            .pending_off
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
