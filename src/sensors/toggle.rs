//! Latching toggle built on a momentary button.
//!
//! Each press (rising edge) flips the reported state; releases are ignored.

use super::SensorAdapter;
use crate::error::HardwareError;
use crate::hardware::DigitalInput;
use crate::resource::PropertyValue;

pub struct ToggleButton {
    pin: Option<Box<dyn DigitalInput>>,
    pressed: bool,
    state: bool,
}

impl ToggleButton {
    pub fn new(pin: Box<dyn DigitalInput>) -> Self {
        Self {
            pin: Some(pin),
            pressed: false,
            state: false,
        }
    }

    /// Flips on every sample.
    pub fn simulated() -> Self {
        Self {
            pin: None,
            pressed: false,
            state: false,
        }
    }
}

impl SensorAdapter for ToggleButton {
    fn read(&mut self) -> Result<PropertyValue, HardwareError> {
        match self.pin.as_mut() {
            Some(pin) => {
                let pressed = pin.read()?;
                if pressed && !self.pressed {
                    self.state = !self.state;
                }
                self.pressed = pressed;
            }
            None => self.state = !self.state,
        }
        Ok(PropertyValue::Binary { value: self.state })
    }

    fn is_simulated(&self) -> bool {
        self.pin.is_none()
    }

    fn name(&self) -> &'static str {
        "toggle"
    }
}
