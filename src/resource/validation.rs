//! Update payload parsing and resource-specific range validation.
//!
//! Parsing turns a JSON body into an [`UpdateCommand`] (shape checks only).
//! [`validate`] then applies the range rules for the target kind and yields a
//! [`Command`] that sensor adapters can act on without re-checking.

use serde_json::Value;

use super::kind::ResourceKind;
use super::properties::Units;
use crate::error::ValidationError;

/// Update request as received, before range checks.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateCommand {
    /// Boolean actuators (LED, fan, buzzer).
    Switch(bool),
    /// RGB channels; a channel that failed to parse is `NaN`.
    Colour([f64; 3]),
    /// Temperature setpoint in the given units.
    Setpoint { temperature: f64, units: Units },
}

/// Range-checked command for a sensor adapter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Switch(bool),
    Colour([u8; 3]),
    /// Setpoint normalised to Celsius.
    Setpoint { celsius: f64 },
}

impl UpdateCommand {
    /// Parse an update body for the given kind.
    pub fn from_payload(kind: ResourceKind, payload: &Value) -> Result<Self, ValidationError> {
        let body = payload
            .as_object()
            .ok_or_else(|| ValidationError::InvalidPayload("expected a JSON object".into()))?;

        match kind {
            ResourceKind::Led | ResourceKind::Fan | ResourceKind::Buzzer => {
                match body.get("value") {
                    Some(Value::Bool(on)) => Ok(UpdateCommand::Switch(*on)),
                    Some(_) => Err(ValidationError::ExpectedBoolean),
                    None => Err(ValidationError::MissingField("value")),
                }
            }
            ResourceKind::RgbLed => {
                let channels = body
                    .get("rgbValue")
                    .ok_or(ValidationError::MissingField("rgbValue"))?
                    .as_array()
                    .ok_or_else(|| ValidationError::InvalidPayload("'rgbValue' must be an array".into()))?;
                if channels.len() != 3 {
                    return Err(ValidationError::ChannelCount(channels.len()));
                }
                Ok(UpdateCommand::Colour([
                    parse_channel(&channels[0]),
                    parse_channel(&channels[1]),
                    parse_channel(&channels[2]),
                ]))
            }
            ResourceKind::Temperature => {
                let temperature = body
                    .get("temperature")
                    .ok_or(ValidationError::MissingField("temperature"))?
                    .as_f64()
                    .ok_or(ValidationError::ExpectedNumber)?;
                let units = match body.get("units") {
                    None | Some(Value::Null) => Units::default(),
                    Some(Value::String(s)) => s
                        .parse()
                        .map_err(|_| ValidationError::UnknownUnits(s.clone()))?,
                    Some(other) => return Err(ValidationError::UnknownUnits(other.to_string())),
                };
                Ok(UpdateCommand::Setpoint { temperature, units })
            }
            _ => Err(ValidationError::ReadOnly(kind.into())),
        }
    }
}

/// Integer parse with the leniency clients rely on: numbers are truncated,
/// numeric strings are accepted, anything else is `NaN`.
fn parse_channel(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().map(f64::trunc).unwrap_or(f64::NAN),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(f64::trunc)
            .unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Apply the range rules of `kind` to an update.
pub fn validate(kind: ResourceKind, command: UpdateCommand) -> Result<Command, ValidationError> {
    if !kind.is_actuator() {
        return Err(ValidationError::ReadOnly(kind.into()));
    }

    match (kind, command) {
        (ResourceKind::Led | ResourceKind::Fan | ResourceKind::Buzzer, UpdateCommand::Switch(on)) => {
            Ok(Command::Switch(on))
        }
        (ResourceKind::RgbLed, UpdateCommand::Colour(channels)) => {
            let mut rgb = [0u8; 3];
            for (channel, value) in channels.into_iter().enumerate() {
                if value.is_nan() {
                    return Err(ValidationError::NotANumber { channel });
                }
                if !(0.0..=255.0).contains(&value) {
                    return Err(ValidationError::ChannelOutOfRange { channel, value });
                }
                rgb[channel] = value as u8;
            }
            Ok(Command::Colour(rgb))
        }
        (ResourceKind::Temperature, UpdateCommand::Setpoint { temperature, units }) => {
            if !temperature.is_finite() || !units.contains(temperature) {
                let (min, max) = units.range();
                return Err(ValidationError::TemperatureOutOfRange {
                    value: temperature,
                    units,
                    min,
                    max,
                });
            }
            Ok(Command::Setpoint {
                celsius: units.to_celsius(temperature),
            })
        }
        (kind, _) => Err(ValidationError::Mismatch(kind.into())),
    }
}
