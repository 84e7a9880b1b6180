//! Gas (CO2) detector on an analog pin.
//!
//! Reports a boolean: detection latches on when the density rises above the
//! threshold and clears when it falls below it again.

use log::debug;

use super::SensorAdapter;
use crate::error::HardwareError;
use crate::hardware::AnalogInput;
use crate::resource::PropertyValue;

pub const DENSITY_THRESHOLD: f64 = 70.0;

/// Density estimate for a 10-bit reading.
pub fn density_from_raw(raw: u16) -> f64 {
    f64::from(raw) * 500.0 / 1024.0
}

pub struct GasSensor {
    pin: Option<Box<dyn AnalogInput>>,
    /// Density at the last threshold crossing.
    latched_density: f64,
    detected: bool,
}

impl GasSensor {
    pub fn new(pin: Box<dyn AnalogInput>) -> Self {
        Self {
            pin: Some(pin),
            latched_density: 0.0,
            detected: false,
        }
    }

    pub fn simulated() -> Self {
        Self {
            pin: None,
            latched_density: 0.0,
            detected: false,
        }
    }

    fn apply_density(&mut self, density: f64) {
        debug!("[Gas] density: {:.2}, threshold: {}", density, DENSITY_THRESHOLD);
        if density > DENSITY_THRESHOLD && self.latched_density < DENSITY_THRESHOLD {
            self.latched_density = density;
            self.detected = true;
        } else if self.latched_density > DENSITY_THRESHOLD && density < DENSITY_THRESHOLD {
            self.latched_density = density;
            self.detected = false;
        }
    }
}

impl SensorAdapter for GasSensor {
    fn read(&mut self) -> Result<PropertyValue, HardwareError> {
        match self.pin.as_mut() {
            Some(pin) => {
                let density = density_from_raw(pin.read_raw()?);
                self.apply_density(density);
            }
            None => self.detected = !self.detected,
        }
        Ok(PropertyValue::Binary {
            value: self.detected,
        })
    }

    fn is_simulated(&self) -> bool {
        self.pin.is_none()
    }

    fn name(&self) -> &'static str {
        "gas"
    }
}
