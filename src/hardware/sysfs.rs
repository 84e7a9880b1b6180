//! Linux sysfs GPIO and IIO ADC pins.
//!
//! Opening a pin fails with [`HardwareError::Unavailable`] when the kernel
//! interface is missing, which is how the daemon detects that it must run in
//! simulation mode.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use super::{ANALOG_MAX, AnalogInput, DigitalInput, DigitalOutput};
use crate::error::HardwareError;

pub const GPIO_ROOT: &str = "/sys/class/gpio";
pub const IIO_ROOT: &str = "/sys/bus/iio/devices/iio:device0";

/// ADC resolution of the boards these daemons were written for.
pub const DEFAULT_ADC_BITS: u8 = 12;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

fn unavailable(path: &Path, reason: impl ToString) -> HardwareError {
    HardwareError::Unavailable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// A GPIO line exported through `/sys/class/gpio`.
#[derive(Debug)]
pub struct SysfsGpio {
    pin: u32,
    value_path: PathBuf,
}

impl SysfsGpio {
    pub fn input(pin: u32) -> Result<Self, HardwareError> {
        Self::open_in(Path::new(GPIO_ROOT), pin, Direction::In)
    }

    pub fn output(pin: u32) -> Result<Self, HardwareError> {
        Self::open_in(Path::new(GPIO_ROOT), pin, Direction::Out)
    }

    /// Export `pin` under `root` and set its direction.
    pub fn open_in(root: &Path, pin: u32, direction: Direction) -> Result<Self, HardwareError> {
        let pin_dir = root.join(format!("gpio{}", pin));
        if !pin_dir.exists() {
            let export = root.join("export");
            if !export.exists() {
                return Err(unavailable(&export, "GPIO sysfs interface not present"));
            }
            fs::write(&export, pin.to_string()).map_err(|e| unavailable(&export, e))?;
        }

        let direction_path = pin_dir.join("direction");
        fs::write(&direction_path, direction.as_str())
            .map_err(|e| unavailable(&direction_path, e))?;

        debug!("[Gpio] D{} opened as {}", pin, direction.as_str());
        Ok(Self {
            pin,
            value_path: pin_dir.join("value"),
        })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }
}

impl DigitalInput for SysfsGpio {
    fn read(&mut self) -> Result<bool, HardwareError> {
        let raw = fs::read_to_string(&self.value_path)?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(HardwareError::InvalidReading {
                pin: format!("D{}", self.pin),
                reason: format!("unexpected value {:?}", other),
            }),
        }
    }
}

impl DigitalOutput for SysfsGpio {
    fn write(&mut self, high: bool) -> Result<(), HardwareError> {
        fs::write(&self.value_path, if high { "1" } else { "0" })?;
        Ok(())
    }
}

/// One channel of an IIO ADC, normalised to a 10-bit reading.
#[derive(Debug)]
pub struct IioAnalog {
    channel: u32,
    raw_path: PathBuf,
    resolution_bits: u8,
}

impl IioAnalog {
    pub fn open(channel: u32) -> Result<Self, HardwareError> {
        Self::open_in(Path::new(IIO_ROOT), channel, DEFAULT_ADC_BITS)
    }

    pub fn open_in(root: &Path, channel: u32, resolution_bits: u8) -> Result<Self, HardwareError> {
        let raw_path = root.join(format!("in_voltage{}_raw", channel));
        if !raw_path.exists() {
            return Err(unavailable(&raw_path, "ADC channel not present"));
        }
        debug!("[Adc] A{} opened ({} bit)", channel, resolution_bits);
        Ok(Self {
            channel,
            raw_path,
            resolution_bits,
        })
    }
}

impl AnalogInput for IioAnalog {
    fn read_raw(&mut self) -> Result<u16, HardwareError> {
        let text = fs::read_to_string(&self.raw_path)?;
        let raw: u32 = text
            .trim()
            .parse()
            .map_err(|e| HardwareError::InvalidReading {
                pin: format!("A{}", self.channel),
                reason: format!("{}: {:?}", e, text.trim()),
            })?;

        let scaled = match self.resolution_bits {
            bits if bits > 10 => raw >> (bits - 10),
            bits => raw << (10 - bits),
        };
        Ok(scaled.min(ANALOG_MAX as u32) as u16)
    }
}
