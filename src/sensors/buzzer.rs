//! Alarm buzzer on a digital output.
//!
//! While on, a background task toggles the pin every [`TONE_PERIOD`] so the
//! buzzer beeps instead of sounding continuously.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use super::SensorAdapter;
use crate::error::HardwareError;
use crate::hardware::DigitalOutput;
use crate::resource::{Command, PropertyValue};

pub const TONE_PERIOD: Duration = Duration::from_millis(800);

type SharedPin = Arc<Mutex<Box<dyn DigitalOutput>>>;

pub struct Buzzer {
    pin: Option<SharedPin>,
    on: bool,
    tone: Option<CancellationToken>,
}

impl Buzzer {
    /// Takes the pin and silences it.
    pub fn new(mut pin: Box<dyn DigitalOutput>) -> Result<Self, HardwareError> {
        pin.write(false)?;
        Ok(Self {
            pin: Some(Arc::new(Mutex::new(pin))),
            on: false,
            tone: None,
        })
    }

    pub fn simulated() -> Self {
        Self {
            pin: None,
            on: false,
            tone: None,
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.tone.is_some()
    }

    fn start_tone(&mut self, pin: SharedPin) -> Result<(), HardwareError> {
        if self.tone.is_some() {
            return Ok(());
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("[Buzzer] No runtime for the tone task, sounding continuously");
            return pin.lock().write(true);
        };

        let token = CancellationToken::new();
        let cancel = token.clone();
        runtime.spawn(async move {
            let start = tokio::time::Instant::now() + TONE_PERIOD;
            let mut ticks = tokio::time::interval_at(start, TONE_PERIOD);
            let mut note = false;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => {
                        if let Err(e) = pin.lock().write(note) {
                            warn!("[Buzzer] Tone write failed: {}", e);
                            break;
                        }
                        note = !note;
                    }
                }
            }
        });
        self.tone = Some(token);
        Ok(())
    }

    fn stop_tone(&mut self) -> Result<(), HardwareError> {
        if let Some(token) = self.tone.take() {
            token.cancel();
        }
        if let Some(pin) = &self.pin {
            pin.lock().write(false)?;
        }
        Ok(())
    }
}

impl SensorAdapter for Buzzer {
    fn read(&mut self) -> Result<PropertyValue, HardwareError> {
        Ok(PropertyValue::Binary { value: self.on })
    }

    fn write(&mut self, command: Command) -> Result<(), HardwareError> {
        let Command::Switch(on) = command else {
            return Err(HardwareError::NotAnActuator(self.name()));
        };

        match self.pin.clone() {
            None => info!("[Sim] buzzer -> {}", if on { "on" } else { "off" }),
            Some(pin) if on => self.start_tone(pin)?,
            Some(_) => self.stop_tone()?,
        }
        self.on = on;
        Ok(())
    }

    fn is_simulated(&self) -> bool {
        self.pin.is_none()
    }

    fn safe_state(&mut self) -> Result<(), HardwareError> {
        self.on = false;
        self.stop_tone()
    }

    fn name(&self) -> &'static str {
        "buzzer"
    }
}

impl Drop for Buzzer {
    fn drop(&mut self) {
        if let Some(token) = self.tone.take() {
            token.cancel();
        }
    }
}
