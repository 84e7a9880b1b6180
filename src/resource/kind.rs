//! Resource kinds served by the device daemons.
//!
//! Every daemon exposes exactly one kind. The per-kind constants (resource
//! type, base path, default pin, poll interval) live here so that the rest of
//! the crate never branches on string names.

use std::time::Duration;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Delay before the first notification after an observe or update, so the
/// immediate response reaches the client first.
pub const INITIAL_NOTIFY_DELAY: Duration = Duration::from_millis(200);

/// Whether a kind's pin is read through GPIO or the ADC.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PinKind {
    Digital,
    Analog,
}

impl PinKind {
    /// Board label prefix ("D4", "A1").
    pub fn label(self) -> &'static str {
        match self {
            PinKind::Digital => "D",
            PinKind::Analog => "A",
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    Button,
    Buzzer,
    Fan,
    Gas,
    Illuminance,
    Led,
    #[value(name = "rgbled")]
    RgbLed,
    Motion,
    Temperature,
    Toggle,
}

impl ResourceKind {
    /// Semantic resource type advertised to clients.
    pub fn resource_type(self) -> &'static str {
        match self {
            ResourceKind::Button | ResourceKind::Toggle => "oic.r.button",
            ResourceKind::Buzzer => "oic.r.buzzer",
            ResourceKind::Fan => "oic.r.fan",
            ResourceKind::Gas => "oic.r.sensor.carbondioxide",
            ResourceKind::Illuminance => "oic.r.sensor.illuminance",
            ResourceKind::Led => "oic.r.led",
            ResourceKind::RgbLed => "oic.r.colour.rgb",
            ResourceKind::Motion => "oic.r.sensor.motion",
            ResourceKind::Temperature => "oic.r.temperature",
        }
    }

    /// Resource path before the instance description is appended.
    pub fn base_path(self) -> String {
        format!("/a/{}", self)
    }

    /// Human-readable name used in the device name.
    pub fn display_name(self) -> &'static str {
        match self {
            ResourceKind::Button => "Button",
            ResourceKind::Buzzer => "Buzzer",
            ResourceKind::Fan => "Fan",
            ResourceKind::Gas => "Gas",
            ResourceKind::Illuminance => "Illuminance",
            ResourceKind::Led => "LED",
            ResourceKind::RgbLed => "RGB LED",
            ResourceKind::Motion => "Motion",
            ResourceKind::Temperature => "Temperature",
            ResourceKind::Toggle => "Toggle",
        }
    }

    pub fn pin_kind(self) -> PinKind {
        match self {
            ResourceKind::Gas | ResourceKind::Illuminance | ResourceKind::Temperature => {
                PinKind::Analog
            }
            _ => PinKind::Digital,
        }
    }

    /// Board pin used when none is given on the command line.
    ///
    /// The RGB LED also claims `pin + 1` for its data line.
    pub fn default_pin(self) -> u32 {
        match self {
            ResourceKind::Button => 4,
            ResourceKind::Buzzer => 6,
            ResourceKind::Fan => 9,
            ResourceKind::Gas => 0,
            ResourceKind::Illuminance => 3,
            ResourceKind::Led => 2,
            ResourceKind::RgbLed => 7,
            ResourceKind::Motion => 5,
            ResourceKind::Temperature => 1,
            ResourceKind::Toggle => 4,
        }
    }

    /// Steady-state interval between background re-checks while observed.
    pub fn poll_interval(self) -> Duration {
        match self {
            ResourceKind::Button => Duration::from_millis(1000),
            _ => Duration::from_millis(2000),
        }
    }

    /// True for kinds that accept update requests.
    pub fn is_actuator(self) -> bool {
        matches!(
            self,
            ResourceKind::Buzzer
                | ResourceKind::Fan
                | ResourceKind::Led
                | ResourceKind::RgbLed
                | ResourceKind::Temperature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_names_round_trip_through_strum() {
        for kind in ResourceKind::iter() {
            let name = kind.to_string();
            assert_eq!(ResourceKind::from_str(&name).unwrap(), kind);
        }
        assert_eq!(ResourceKind::RgbLed.to_string(), "rgbled");
    }

    #[test]
    fn test_base_paths() {
        assert_eq!(ResourceKind::Button.base_path(), "/a/button");
        assert_eq!(ResourceKind::RgbLed.base_path(), "/a/rgbled");
        assert_eq!(ResourceKind::Temperature.base_path(), "/a/temperature");
    }

    #[test]
    fn test_poll_intervals() {
        assert_eq!(
            ResourceKind::Button.poll_interval(),
            Duration::from_millis(1000)
        );
        assert_eq!(ResourceKind::Gas.poll_interval(), Duration::from_millis(2000));
    }

    #[test]
    fn test_analog_kinds() {
        let analog: Vec<_> = ResourceKind::iter()
            .filter(|k| k.pin_kind() == PinKind::Analog)
            .collect();
        assert_eq!(
            analog,
            vec![
                ResourceKind::Gas,
                ResourceKind::Illuminance,
                ResourceKind::Temperature
            ]
        );
    }
}
