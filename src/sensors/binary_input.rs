//! Momentary digital inputs: push button and PIR motion sensor.
//!
//! The reported value is simply the pin level.

use super::SensorAdapter;
use crate::error::HardwareError;
use crate::hardware::DigitalInput;
use crate::resource::PropertyValue;

pub struct BinaryInput {
    name: &'static str,
    pin: Option<Box<dyn DigitalInput>>,
    state: bool,
}

impl BinaryInput {
    pub fn new(name: &'static str, pin: Box<dyn DigitalInput>) -> Self {
        Self {
            name,
            pin: Some(pin),
            state: false,
        }
    }

    /// Alternates its state on every sample.
    pub fn simulated(name: &'static str) -> Self {
        Self {
            name,
            pin: None,
            state: false,
        }
    }
}

impl SensorAdapter for BinaryInput {
    fn read(&mut self) -> Result<PropertyValue, HardwareError> {
        self.state = match self.pin.as_mut() {
            Some(pin) => pin.read()?,
            None => !self.state,
        };
        Ok(PropertyValue::Binary { value: self.state })
    }

    fn is_simulated(&self) -> bool {
        self.pin.is_none()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
