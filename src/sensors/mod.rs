//! Sensor adapters: one per resource kind.
//!
//! An adapter samples its pin (or a deterministic simulation of it) and, for
//! actuators, drives the pin from a validated [`Command`]. Adapters keep no
//! notion of observers or change notification; that is the engine's job.
//!
//! Simulated adapters follow fixed rules so that clients can be tested
//! without hardware: boolean sensors alternate on every sample and analog
//! sensors drift upwards by 0.1 per sample.

pub mod binary_input;
pub mod buzzer;
pub mod gas;
pub mod illuminance;
pub mod rgb_led;
pub mod switch;
pub mod temperature;
pub mod toggle;

pub use binary_input::BinaryInput;
pub use buzzer::Buzzer;
pub use gas::GasSensor;
pub use illuminance::LightSensor;
pub use rgb_led::RgbLed;
pub use switch::BinarySwitch;
pub use temperature::Thermistor;
pub use toggle::ToggleButton;

use log::{info, warn};

use crate::error::HardwareError;
use crate::hardware::{ChainableLed, IioAnalog, SysfsGpio};
use crate::resource::{Command, PropertyValue, ResourceKind};

/// Drift applied per sample by simulated analog sensors.
pub const SIMULATED_DRIFT: f64 = 0.1;

pub trait SensorAdapter: Send {
    /// Sample the current value. Actuators report their commanded state.
    fn read(&mut self) -> Result<PropertyValue, HardwareError>;

    /// Drive the pin. Only actuators override this.
    fn write(&mut self, _command: Command) -> Result<(), HardwareError> {
        Err(HardwareError::NotAnActuator(self.name()))
    }

    fn is_simulated(&self) -> bool;

    /// Whether a changed sample should be pushed to observers.
    fn should_report(&self, _value: &PropertyValue) -> bool {
        true
    }

    /// Bring the hardware to its off state before shutdown.
    fn safe_state(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Open the adapter for `kind` on `pin`.
///
/// When hardware is requested but the pin cannot be opened or fails its
/// first sample, the adapter falls back to simulation instead of failing the
/// daemon.
pub fn open_adapter(kind: ResourceKind, pin: u32, simulation: bool) -> Box<dyn SensorAdapter> {
    if simulation {
        info!("Running in simulation mode");
        return simulated_adapter(kind);
    }

    usable_or_simulated(kind, pin, hardware_adapter(kind, pin))
}

/// Keep the opened hardware adapter if it samples, otherwise simulate.
fn usable_or_simulated(
    kind: ResourceKind,
    pin: u32,
    opened: Result<Box<dyn SensorAdapter>, HardwareError>,
) -> Box<dyn SensorAdapter> {
    match opened.and_then(first_sample) {
        Ok(adapter) => {
            info!(
                "Running on HW using pin {}{}",
                kind.pin_kind().label(),
                pin
            );
            adapter
        }
        Err(e) => {
            warn!("No hardware access: {}", e);
            warn!("Automatically switching to simulation mode");
            simulated_adapter(kind)
        }
    }
}

/// Take one trial sample so a pin that opens but cannot be read is caught at
/// startup.
fn first_sample(
    mut adapter: Box<dyn SensorAdapter>,
) -> Result<Box<dyn SensorAdapter>, HardwareError> {
    adapter.read()?;
    Ok(adapter)
}

pub fn simulated_adapter(kind: ResourceKind) -> Box<dyn SensorAdapter> {
    match kind {
        ResourceKind::Button => Box::new(BinaryInput::simulated("button")),
        ResourceKind::Motion => Box::new(BinaryInput::simulated("motion")),
        ResourceKind::Toggle => Box::new(ToggleButton::simulated()),
        ResourceKind::Gas => Box::new(GasSensor::simulated()),
        ResourceKind::Illuminance => Box::new(LightSensor::simulated()),
        ResourceKind::Temperature => Box::new(Thermistor::simulated()),
        ResourceKind::Led => Box::new(BinarySwitch::simulated("led")),
        ResourceKind::Fan => Box::new(BinarySwitch::simulated("fan")),
        ResourceKind::Buzzer => Box::new(Buzzer::simulated()),
        ResourceKind::RgbLed => Box::new(RgbLed::simulated()),
    }
}

fn hardware_adapter(
    kind: ResourceKind,
    pin: u32,
) -> Result<Box<dyn SensorAdapter>, HardwareError> {
    let adapter: Box<dyn SensorAdapter> = match kind {
        ResourceKind::Button => {
            Box::new(BinaryInput::new("button", Box::new(SysfsGpio::input(pin)?)))
        }
        ResourceKind::Motion => {
            Box::new(BinaryInput::new("motion", Box::new(SysfsGpio::input(pin)?)))
        }
        ResourceKind::Toggle => Box::new(ToggleButton::new(Box::new(SysfsGpio::input(pin)?))),
        ResourceKind::Gas => Box::new(GasSensor::new(Box::new(IioAnalog::open(pin)?))),
        ResourceKind::Illuminance => Box::new(LightSensor::new(Box::new(IioAnalog::open(pin)?))),
        ResourceKind::Temperature => Box::new(Thermistor::new(Box::new(IioAnalog::open(pin)?))),
        ResourceKind::Led => Box::new(BinarySwitch::new(
            "led",
            Box::new(SysfsGpio::output(pin)?),
        )?),
        ResourceKind::Fan => Box::new(BinarySwitch::new(
            "fan",
            Box::new(SysfsGpio::output(pin)?),
        )?),
        ResourceKind::Buzzer => Box::new(Buzzer::new(Box::new(SysfsGpio::output(pin)?))?),
        ResourceKind::RgbLed => {
            let led = ChainableLed::new(
                Box::new(SysfsGpio::output(pin)?),
                Box::new(SysfsGpio::output(pin + 1)?),
            );
            Box::new(RgbLed::new(led)?)
        }
    };
    Ok(adapter)
}
