use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::resource::ResourceKind;

/// Load environment variables from a .env file.
/// Values with spaces do not need quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Variables already in the environment win
        if std::env::var(key).is_err() {
            // SAFETY: called from main before the runtime starts any threads
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// `KEY=value` pairs of a .env file, skipping blanks and comments.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }
            pairs.push((key, value));
        }
    }
    pairs
}

/// Command line of a device daemon.
#[derive(Parser, Debug, Clone)]
#[command(name = "smarthome-device")]
#[command(about = "Expose one sensor or actuator as an observable resource")]
pub struct Cli {
    /// Resource kind to serve
    #[arg(value_enum)]
    pub kind: ResourceKind,

    /// Board pin number (defaults to the kind's usual pin)
    pub pin: Option<u32>,

    /// Suffix appended to the resource path to tell instances apart
    pub description: Option<String>,

    /// Simulate the sensor instead of touching hardware
    #[arg(short, long, env = "SIMULATION")]
    pub simulation: bool,

    /// Skip writing the access-control descriptor
    #[arg(long)]
    pub no_secure: bool,
}

/// Resolved settings of the single resource a daemon serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSettings {
    pub kind: ResourceKind,
    pub pin: u32,
    pub description: String,
    pub simulation: bool,
    pub secure: bool,
}

impl From<Cli> for ResourceSettings {
    fn from(cli: Cli) -> Self {
        Self {
            kind: cli.kind,
            pin: cli.pin.unwrap_or_else(|| cli.kind.default_pin()),
            description: cli.description.unwrap_or_default(),
            simulation: cli.simulation,
            secure: !cli.no_secure,
        }
    }
}

impl ResourceSettings {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            pin: kind.default_pin(),
            description: String::new(),
            simulation: false,
            secure: true,
        }
    }

    /// `/a/<kind><description>`
    pub fn resource_path(&self) -> String {
        format!("{}{}", self.kind.base_path(), self.description)
    }

    /// `<kind><description>`
    pub fn identifier(&self) -> String {
        format!("{}{}", self.kind, self.description)
    }

    /// Board label of the configured pin ("D4", "A1").
    pub fn pin_label(&self) -> String {
        format!("{}{}", self.kind.pin_kind().label(), self.pin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub transport: TransportConfig,
    pub provisioning: ProvisioningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Prepended to every resource path to form topics.
    pub topic_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Where access-control descriptors are written in secure mode.
    pub dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig {
                broker_host: "localhost".to_string(),
                broker_port: 1883,
                client_id: "smarthome-device".to_string(),
                username: None,
                password: None,
            },
            transport: TransportConfig {
                topic_prefix: "smarthome".to_string(),
            },
            provisioning: ProvisioningConfig {
                dir: PathBuf::from("/var/lib/smarthome/provisioning"),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Some(port) = lookup("MQTT_BROKER_PORT")
            && let Ok(p) = port.parse()
        {
            config.mqtt.broker_port = p;
        }
        if let Some(client_id) = lookup("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Some(username) = lookup("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Some(password) = lookup("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }

        if let Some(prefix) = lookup("TOPIC_PREFIX") {
            config.transport.topic_prefix = prefix;
        }
        if let Some(dir) = lookup("PROVISION_DIR") {
            config.provisioning.dir = PathBuf::from(dir);
        }

        config
    }

    /// Keep client ids unique per resource so several daemons can share a broker.
    pub fn for_resource(mut self, settings: &ResourceSettings) -> Self {
        self.mqtt.client_id = format!("{}-{}", self.mqtt.client_id, settings.identifier());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.mqtt.broker_host, "localhost");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.transport.topic_prefix, "smarthome");
        assert!(config.mqtt.username.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("MQTT_BROKER_HOST", "10.0.0.2"),
            ("MQTT_BROKER_PORT", "8883"),
            ("MQTT_USERNAME", "home"),
            ("TOPIC_PREFIX", "lab"),
            ("PROVISION_DIR", "/tmp/acl"),
        ]));
        assert_eq!(config.mqtt.broker_host, "10.0.0.2");
        assert_eq!(config.mqtt.broker_port, 8883);
        assert_eq!(config.mqtt.username.as_deref(), Some("home"));
        assert_eq!(config.transport.topic_prefix, "lab");
        assert_eq!(config.provisioning.dir, PathBuf::from("/tmp/acl"));
    }

    #[test]
    fn test_bad_port_keeps_default() {
        let config = Config::from_lookup(lookup(&[("MQTT_BROKER_PORT", "eighty")]));
        assert_eq!(config.mqtt.broker_port, 1883);
    }

    #[test]
    fn test_parse_dotenv() {
        let pairs = parse_dotenv("# broker\nMQTT_BROKER_HOST = my host\n\nTOPIC_PREFIX=\"home\"\nJUNK\n");
        assert_eq!(
            pairs,
            vec![("MQTT_BROKER_HOST", "my host"), ("TOPIC_PREFIX", "home")]
        );
    }

    #[test]
    fn test_cli_defaults_pin_and_description() {
        let cli = Cli::try_parse_from(["smarthome-device", "rgbled"]).unwrap();
        let settings = ResourceSettings::from(cli);
        assert_eq!(settings.kind, ResourceKind::RgbLed);
        assert_eq!(settings.pin, 7);
        assert!(settings.secure);
        assert_eq!(settings.resource_path(), "/a/rgbled");
        assert_eq!(settings.pin_label(), "D7");
    }

    #[test]
    fn test_cli_with_pin_and_description() {
        let cli = Cli::try_parse_from([
            "smarthome-device",
            "temperature",
            "2",
            "Kitchen",
            "-s",
            "--no-secure",
        ])
        .unwrap();
        let settings = ResourceSettings::from(cli);
        assert_eq!(settings.pin, 2);
        assert!(settings.simulation);
        assert!(!settings.secure);
        assert_eq!(settings.resource_path(), "/a/temperatureKitchen");
        assert_eq!(settings.identifier(), "temperatureKitchen");
        assert_eq!(settings.pin_label(), "A2");
    }

    #[test]
    fn test_cli_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["smarthome-device", "toaster"]).is_err());
    }

    #[test]
    fn test_client_id_is_per_resource() {
        let settings = ResourceSettings::new(ResourceKind::Led);
        let config = Config::default().for_resource(&settings);
        assert_eq!(config.mqtt.client_id, "smarthome-device-led");
    }
}
