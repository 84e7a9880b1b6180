//! Pin access for sensor adapters.
//!
//! Adapters only see these traits; the Linux sysfs implementations live in
//! [`sysfs`], and tests substitute recording pins.

pub mod chainable_led;
pub mod sysfs;

pub use chainable_led::{BitStream, ChainableLed, encode_frame};
pub use sysfs::{IioAnalog, SysfsGpio};

use crate::error::HardwareError;

/// Full scale of a normalised analog reading (10-bit ADC).
pub const ANALOG_MAX: u16 = 1023;

pub trait DigitalInput: Send {
    /// True when the pin reads high.
    fn read(&mut self) -> Result<bool, HardwareError>;
}

pub trait DigitalOutput: Send {
    fn write(&mut self, high: bool) -> Result<(), HardwareError>;
}

pub trait AnalogInput: Send {
    /// Raw reading normalised to `0..=ANALOG_MAX`.
    fn read_raw(&mut self) -> Result<u16, HardwareError>;
}
