//! Device and platform details advertised with the resource registration.

use serde::Serialize;

use crate::config::ResourceSettings;

pub const CORE_SPEC_VERSION: &str = "core.1.1.0";
pub const DATA_MODEL: &str = "res.1.1.0";
pub const BASELINE_INTERFACE: &str = "oic.if.baseline";

pub const MANUFACTURER_NAME: &str = "Smart Home";
pub const PLATFORM_VERSION: &str = "1.1.0";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub name: String,
    pub core_spec_version: &'static str,
    pub data_models: Vec<&'static str>,
}

impl DeviceInfo {
    /// `Smart Home <Kind> (<description>)`
    pub fn for_resource(settings: &ResourceSettings) -> Self {
        Self {
            name: format!(
                "Smart Home {} ({})",
                settings.kind.display_name(),
                settings.description
            ),
            core_spec_version: CORE_SPEC_VERSION,
            data_models: vec![DATA_MODEL],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub manufacturer_name: &'static str,
    pub platform_version: &'static str,
    pub firmware_version: &'static str,
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self {
            manufacturer_name: MANUFACTURER_NAME,
            platform_version: PLATFORM_VERSION,
            firmware_version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Retained registration record published for a served resource.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub resource_path: String,
    pub resource_types: Vec<&'static str>,
    pub interfaces: Vec<&'static str>,
    pub discoverable: bool,
    pub observable: bool,
    pub simulated: bool,
    pub device: DeviceInfo,
    pub platform: PlatformInfo,
}

impl ResourceDescriptor {
    pub fn new(settings: &ResourceSettings, simulated: bool) -> Self {
        Self {
            resource_path: settings.resource_path(),
            resource_types: vec![settings.kind.resource_type()],
            interfaces: vec![BASELINE_INTERFACE],
            discoverable: true,
            observable: true,
            simulated,
            device: DeviceInfo::for_resource(settings),
            platform: PlatformInfo::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use serde_json::json;

    #[test]
    fn test_device_name() {
        let mut settings = ResourceSettings::new(ResourceKind::RgbLed);
        settings.description = "Hall".into();
        assert_eq!(
            DeviceInfo::for_resource(&settings).name,
            "Smart Home RGB LED (Hall)"
        );
    }

    #[test]
    fn test_descriptor_wire_shape() {
        let settings = ResourceSettings::new(ResourceKind::Motion);
        let value = serde_json::to_value(ResourceDescriptor::new(&settings, true)).unwrap();
        assert_eq!(value["resourcePath"], json!("/a/motion"));
        assert_eq!(value["resourceTypes"], json!(["oic.r.sensor.motion"]));
        assert_eq!(value["interfaces"], json!(["oic.if.baseline"]));
        assert_eq!(value["observable"], json!(true));
        assert_eq!(value["device"]["coreSpecVersion"], json!("core.1.1.0"));
        assert_eq!(value["device"]["dataModels"], json!(["res.1.1.0"]));
        assert_eq!(value["platform"]["manufacturerName"], json!("Smart Home"));
    }
}
