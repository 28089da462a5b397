use std::time::Duration;

use serde_derive::Deserialize;

use crate::error::{BridgeError, Result};

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub accessory: AccessoryConfig,
    pub rpc: Option<RpcConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub publisher_id: Option<String>,
    pub topic_path: Option<String>,
    pub keep_alive_seconds: Option<u64>,
}

/// Accessory options as written in the config file; see [`AccessorySettings`].
#[derive(Deserialize, Debug, Default, Clone)]
pub struct AccessoryConfig {
    pub address: Option<String>,
    pub token: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub show_air_quality: bool,
    #[serde(default)]
    pub show_temperature: bool,
    #[serde(default)]
    pub show_humidity: bool,
    pub name_air_quality: Option<String>,
    pub name_temperature: Option<String>,
    pub name_humidity: Option<String>,
}

/// Where RPC frames for the miio gateway are exchanged.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct RpcConfig {
    pub topic_path: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl RpcConfig {
    pub fn topic_path(&self) -> String {
        self.topic_path.clone().unwrap_or("miio".to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(5))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCredentials {
    pub address: String,
    pub token: String,
}

/// Validated accessory options with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorySettings {
    pub device: DeviceCredentials,
    pub name: String,
    pub air_quality: Option<String>,
    pub temperature: Option<String>,
    pub humidity: Option<String>,
}

fn required(value: &Option<String>, what: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(BridgeError::Configuration(format!(
            "you must provide the {what} of the air purifier"
        ))),
    }
}

fn sensor_name(shown: bool, name: &Option<String>, default: &str) -> Option<String> {
    shown.then(|| name.clone().unwrap_or(default.to_string()))
}

impl AccessorySettings {
    pub fn from_config(config: &AccessoryConfig) -> Result<Self> {
        let device = DeviceCredentials {
            address: required(&config.address, "address")?,
            token: required(&config.token, "token")?,
        };

        Ok(AccessorySettings {
            device,
            name: config.name.clone().unwrap_or("Air Purifier".to_string()),
            air_quality: sensor_name(
                config.show_air_quality,
                &config.name_air_quality,
                "Air Quality",
            ),
            temperature: sensor_name(
                config.show_temperature,
                &config.name_temperature,
                "Temperature",
            ),
            humidity: sensor_name(config.show_humidity, &config.name_humidity, "Humidity"),
        })
    }
}
