//! On/off actuators on a digital output: LED and fan.

use log::info;

use super::SensorAdapter;
use crate::error::HardwareError;
use crate::hardware::DigitalOutput;
use crate::resource::{Command, PropertyValue};

pub struct BinarySwitch {
    name: &'static str,
    pin: Option<Box<dyn DigitalOutput>>,
    on: bool,
}

impl BinarySwitch {
    /// Takes the pin and drives it low.
    pub fn new(name: &'static str, mut pin: Box<dyn DigitalOutput>) -> Result<Self, HardwareError> {
        pin.write(false)?;
        Ok(Self {
            name,
            pin: Some(pin),
            on: false,
        })
    }

    pub fn simulated(name: &'static str) -> Self {
        Self {
            name,
            pin: None,
            on: false,
        }
    }

    fn drive(&mut self, on: bool) -> Result<(), HardwareError> {
        match self.pin.as_mut() {
            Some(pin) => pin.write(on)?,
            None => info!("[Sim] {} -> {}", self.name, if on { "on" } else { "off" }),
        }
        self.on = on;
        Ok(())
    }
}

impl SensorAdapter for BinarySwitch {
    fn read(&mut self) -> Result<PropertyValue, HardwareError> {
        Ok(PropertyValue::Binary { value: self.on })
    }

    fn write(&mut self, command: Command) -> Result<(), HardwareError> {
        match command {
            Command::Switch(on) => self.drive(on),
            _ => Err(HardwareError::NotAnActuator(self.name)),
        }
    }

    fn is_simulated(&self) -> bool {
        self.pin.is_none()
    }

    fn safe_state(&mut self) -> Result<(), HardwareError> {
        self.drive(false)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
