//! Chainable RGB LED: clock on the configured pin, data on the next one.

use log::info;

use super::SensorAdapter;
use crate::error::HardwareError;
use crate::hardware::ChainableLed;
use crate::resource::{Command, PropertyValue};

const OFF: [u8; 3] = [0, 0, 0];

pub struct RgbLed {
    led: Option<ChainableLed>,
    rgb: [u8; 3],
}

impl RgbLed {
    /// Takes the LED and turns it off.
    pub fn new(mut led: ChainableLed) -> Result<Self, HardwareError> {
        let [r, g, b] = OFF;
        led.set_color(r, g, b)?;
        Ok(Self { led: Some(led), rgb: OFF })
    }

    pub fn simulated() -> Self {
        Self { led: None, rgb: OFF }
    }

    fn show(&mut self, rgb: [u8; 3]) -> Result<(), HardwareError> {
        let [r, g, b] = rgb;
        match self.led.as_mut() {
            Some(led) => led.set_color(r, g, b)?,
            None => info!("[Sim] rgbled -> [{}, {}, {}]", r, g, b),
        }
        self.rgb = rgb;
        Ok(())
    }
}

impl SensorAdapter for RgbLed {
    fn read(&mut self) -> Result<PropertyValue, HardwareError> {
        Ok(PropertyValue::colour(self.rgb))
    }

    fn write(&mut self, command: Command) -> Result<(), HardwareError> {
        match command {
            Command::Colour(rgb) => self.show(rgb),
            _ => Err(HardwareError::NotAnActuator(self.name())),
        }
    }

    fn is_simulated(&self) -> bool {
        self.led.is_none()
    }

    fn safe_state(&mut self) -> Result<(), HardwareError> {
        self.show(OFF)
    }

    fn name(&self) -> &'static str {
        "rgbled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::encode_frame;
    use crate::sensors::test_pins::RecordingOutput;

    /// Data-line bits of every frame sent so far.
    fn sent_bits(data: &RecordingOutput) -> Vec<bool> {
        data.writes.lock().clone()
    }

    #[test]
    fn test_setup_and_colour_frames() {
        let clock = RecordingOutput::default();
        let data = RecordingOutput::default();
        let mut led = RgbLed::new(ChainableLed::new(
            Box::new(clock.clone()),
            Box::new(data.clone()),
        ))
        .unwrap();

        let off: Vec<bool> = encode_frame(0, 0, 0).bits().collect();
        assert_eq!(sent_bits(&data), off);

        led.write(Command::Colour([255, 0, 128])).unwrap();
        let colour: Vec<bool> = encode_frame(255, 0, 128).bits().collect();
        assert_eq!(&sent_bits(&data)[off.len()..], colour.as_slice());
        assert_eq!(clock.writes.lock().len(), 2 * (off.len() + colour.len()));
        assert_eq!(led.read().unwrap(), PropertyValue::colour([255, 0, 128]));
    }

    #[test]
    fn test_safe_state_turns_off() {
        let mut led = RgbLed::simulated();
        led.write(Command::Colour([1, 2, 3])).unwrap();
        led.safe_state().unwrap();
        assert_eq!(led.read().unwrap(), PropertyValue::colour([0, 0, 0]));
    }
}
