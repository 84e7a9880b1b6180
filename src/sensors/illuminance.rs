//! Ambient light sensor (photoresistor divider) on an analog pin.

use super::{SIMULATED_DRIFT, SensorAdapter};
use crate::error::HardwareError;
use crate::hardware::{ANALOG_MAX, AnalogInput};
use crate::resource::PropertyValue;
use crate::resource::properties::round_centi;

/// Lux for a 10-bit reading, or `None` at the rails where the curve diverges.
pub fn lux_from_raw(raw: u16) -> Option<f64> {
    let raw = f64::from(raw);
    let resistance = (f64::from(ANALOG_MAX) - raw) * 10.0 / raw;
    let lux = 10000.0 / (resistance * 15.0).powf(4.0 / 3.0);
    lux.is_finite().then(|| round_centi(lux))
}

pub struct LightSensor {
    pin: Option<Box<dyn AnalogInput>>,
    lux: f64,
}

impl LightSensor {
    pub fn new(pin: Box<dyn AnalogInput>) -> Self {
        Self {
            pin: Some(pin),
            lux: 0.0,
        }
    }

    pub fn simulated() -> Self {
        Self {
            pin: None,
            lux: 0.0,
        }
    }
}

impl SensorAdapter for LightSensor {
    fn read(&mut self) -> Result<PropertyValue, HardwareError> {
        self.lux = match self.pin.as_mut() {
            Some(pin) => {
                let raw = pin.read_raw()?;
                lux_from_raw(raw).ok_or_else(|| HardwareError::InvalidReading {
                    pin: "illuminance".into(),
                    reason: format!("raw value {} is outside the sensor curve", raw),
                })?
            }
            None => round_centi(self.lux + SIMULATED_DRIFT),
        };
        Ok(PropertyValue::Illuminance {
            illuminance: self.lux,
        })
    }

    fn is_simulated(&self) -> bool {
        self.pin.is_none()
    }

    fn name(&self) -> &'static str {
        "illuminance"
    }
}
