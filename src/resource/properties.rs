//! Property payloads exposed to clients.
//!
//! Each kind has a fixed shape; the wire format is the flat JSON object
//! `{"rt": ..., "id": ..., <kind fields>}`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Valid range of every colour channel.
pub const COLOUR_RANGE: [u8; 2] = [0, 255];

/// Temperature units accepted by the temperature resource.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Display, EnumString,
)]
pub enum Units {
    #[default]
    C,
    F,
    K,
}

impl Units {
    /// Inclusive valid range for readings and setpoints in these units.
    pub fn range(self) -> (f64, f64) {
        match self {
            Units::C => (-40.0, 125.0),
            Units::F => (-40.0, 257.0),
            Units::K => (233.15, 398.15),
        }
    }

    /// Range formatted the way clients expect it (`"-40,125"`).
    pub fn range_label(self) -> String {
        let (min, max) = self.range();
        format!("{},{}", min, max)
    }

    pub fn contains(self, value: f64) -> bool {
        let (min, max) = self.range();
        value >= min && value <= max
    }

    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            Units::C => celsius,
            Units::F => celsius * 9.0 / 5.0 + 32.0,
            Units::K => celsius + 273.15,
        }
    }

    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            Units::C => value,
            Units::F => (value - 32.0) * 5.0 / 9.0,
            Units::K => value - 273.15,
        }
    }
}

/// Round to two decimals, the precision every analog reading is reported with.
pub fn round_centi(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Kind-specific part of a property snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Binary {
        value: bool,
    },
    Illuminance {
        illuminance: f64,
    },
    Temperature {
        temperature: f64,
        units: Units,
        range: String,
        #[serde(rename = "desiredTemperature", skip_serializing_if = "Option::is_none")]
        desired: Option<f64>,
    },
    Colour {
        #[serde(rename = "rgbValue")]
        rgb_value: [u8; 3],
        range: [u8; 2],
    },
}

impl PropertyValue {
    /// Temperature snapshot in Celsius, the unit the engine tracks changes in.
    pub fn celsius(temperature: f64, desired: Option<f64>) -> Self {
        PropertyValue::Temperature {
            temperature: round_centi(temperature),
            units: Units::C,
            range: Units::C.range_label(),
            desired: desired.map(round_centi),
        }
    }

    pub fn colour(rgb_value: [u8; 3]) -> Self {
        PropertyValue::Colour {
            rgb_value,
            range: COLOUR_RANGE,
        }
    }

    /// Re-express a temperature snapshot in other units. Other shapes pass through.
    pub fn in_units(&self, target: Units) -> Self {
        match self {
            PropertyValue::Temperature {
                temperature,
                units,
                desired,
                ..
            } => {
                let convert = |v: f64| round_centi(target.from_celsius(units.to_celsius(v)));
                PropertyValue::Temperature {
                    temperature: convert(*temperature),
                    units: target,
                    range: target.range_label(),
                    desired: desired.map(convert),
                }
            }
            other => other.clone(),
        }
    }
}

/// Full snapshot returned to clients and pushed to observers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Properties {
    pub rt: &'static str,
    pub id: String,
    #[serde(flatten)]
    pub value: PropertyValue,
}

impl Properties {
    pub fn in_units(&self, units: Units) -> Self {
        Self {
            rt: self.rt,
            id: self.id.clone(),
            value: self.value.in_units(units),
        }
    }
}
