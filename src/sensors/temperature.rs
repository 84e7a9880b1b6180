//! Thermistor temperature sensor with an optional setpoint.
//!
//! Readings are tracked in Celsius. While a setpoint is stored, a changed
//! reading is only reported once it reaches the setpoint.

use log::debug;

use super::{SIMULATED_DRIFT, SensorAdapter};
use crate::error::HardwareError;
use crate::hardware::{ANALOG_MAX, AnalogInput};
use crate::resource::properties::round_centi;
use crate::resource::{Command, PropertyValue};

/// Thermistor B constant.
pub const BETA: f64 = 3975.0;
/// Thermistor resistance at the reference temperature.
pub const R0_OHMS: f64 = 10_000.0;
pub const T0_KELVIN: f64 = 298.15;

/// Celsius for a 10-bit reading, or `None` at the rails.
pub fn celsius_from_raw(raw: u16) -> Option<f64> {
    if raw == 0 {
        return None;
    }
    let raw = f64::from(raw);
    let resistance = (f64::from(ANALOG_MAX) - raw) * R0_OHMS / raw;
    let kelvin = 1.0 / ((resistance / R0_OHMS).ln() / BETA + 1.0 / T0_KELVIN);
    let celsius = kelvin - 273.15;
    celsius.is_finite().then(|| round_centi(celsius))
}

pub struct Thermistor {
    pin: Option<Box<dyn AnalogInput>>,
    celsius: f64,
    setpoint: Option<f64>,
}

impl Thermistor {
    pub fn new(pin: Box<dyn AnalogInput>) -> Self {
        Self {
            pin: Some(pin),
            celsius: 0.0,
            setpoint: None,
        }
    }

    pub fn simulated() -> Self {
        Self {
            pin: None,
            celsius: 0.0,
            setpoint: None,
        }
    }

    pub fn setpoint(&self) -> Option<f64> {
        self.setpoint
    }
}

impl SensorAdapter for Thermistor {
    fn read(&mut self) -> Result<PropertyValue, HardwareError> {
        self.celsius = match self.pin.as_mut() {
            Some(pin) => {
                let raw = pin.read_raw()?;
                celsius_from_raw(raw).ok_or_else(|| HardwareError::InvalidReading {
                    pin: "temperature".into(),
                    reason: format!("raw value {} is outside the thermistor curve", raw),
                })?
            }
            None => round_centi(self.celsius + SIMULATED_DRIFT),
        };
        debug!("[Temperature] {} C", self.celsius);
        Ok(PropertyValue::celsius(self.celsius, self.setpoint))
    }

    fn write(&mut self, command: Command) -> Result<(), HardwareError> {
        match command {
            Command::Setpoint { celsius } => {
                debug!("[Temperature] setpoint: {} C", celsius);
                self.setpoint = Some(celsius);
                Ok(())
            }
            _ => Err(HardwareError::NotAnActuator(self.name())),
        }
    }

    fn is_simulated(&self) -> bool {
        self.pin.is_none()
    }

    fn should_report(&self, value: &PropertyValue) -> bool {
        match value {
            PropertyValue::Temperature {
                temperature,
                desired,
                ..
            } => desired.is_none_or(|setpoint| *temperature >= setpoint),
            _ => true,
        }
    }

    fn name(&self) -> &'static str {
        "temperature"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::test_pins::ScriptedInput;

    fn celsius(sensor: &mut Thermistor) -> f64 {
        match sensor.read().unwrap() {
            PropertyValue::Temperature { temperature, .. } => temperature,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_curve_near_reference() {
        assert_eq!(celsius_from_raw(512), Some(25.04));
        assert!(celsius_from_raw(700).unwrap() > 25.04);
        assert_eq!(celsius_from_raw(0), None);
    }

    #[test]
    fn test_reads_pin() {
        let pin = ScriptedInput::new([512u16], 512);
        let mut sensor = Thermistor::new(Box::new(pin));
        assert_eq!(celsius(&mut sensor), 25.04);
    }

    #[test]
    fn test_simulation_drifts() {
        let mut sensor = Thermistor::simulated();
        assert_eq!(celsius(&mut sensor), 0.1);
        assert_eq!(celsius(&mut sensor), 0.2);
    }

    #[test]
    fn test_setpoint_gates_reporting() {
        let mut sensor = Thermistor::simulated();
        assert!(sensor.should_report(&PropertyValue::celsius(10.0, None)));

        sensor.write(Command::Setpoint { celsius: 30.0 }).unwrap();
        assert_eq!(sensor.setpoint(), Some(30.0));

        let below = sensor.read().unwrap();
        assert!(!sensor.should_report(&below));
        assert!(sensor.should_report(&PropertyValue::celsius(30.0, Some(30.0))));
        assert!(sensor.should_report(&PropertyValue::celsius(31.5, Some(30.0))));
    }

    #[test]
    fn test_rejects_switch_commands() {
        let mut sensor = Thermistor::simulated();
        assert!(sensor.write(Command::Switch(true)).is_err());
    }
}
