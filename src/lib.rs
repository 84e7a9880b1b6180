//! Smart home device daemons.
//!
//! Each daemon exposes one sensor or actuator (button, buzzer, fan, gas,
//! illuminance, LED, RGB LED, motion, temperature, toggle) as an observable
//! resource: clients retrieve and update it, and observers receive change
//! notifications driven by [`resource::ObservableResource`].

pub mod config;
pub mod device_info;
pub mod error;
pub mod hardware;
pub mod instance_lock;
pub mod provisioning;
pub mod resource;
pub mod sensors;
pub mod transport;
