//! Settings file
//!
//! One JSON document configures a deployment:
//!
//! ```json
//! {
//!   "preset": "pet_tracker",
//!   "device_id": "PochiGuard_Noah",
//!   "home": { "latitude": 33.581452, "longitude": 130.3423642 },
//!   "topics": { "alert": "care/alert" },
//!   "mqtt": { "host": "broker.hivemq.com", "port": 1883 },
//!   "line": { "channel_access_token": "...", "user_id": "..." }
//! }
//! ```
//!
//! `engine` may hold a complete engine configuration instead of a preset;
//! missing fields in it take the fire-unit defaults. `device_id` and `home`
//! are applied on top of either. The resulting engine configuration is
//! validated before it is handed out.

use std::{fs, path::Path};

use careguard_core::{ConfigError, EngineConfig, GeoPoint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Topics;

/// Settings loading errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Cannot read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid engine configuration: {0}")]
    Engine(ConfigError),
}

impl From<ConfigError> for SettingsError {
    fn from(err: ConfigError) -> Self {
        SettingsError::Engine(err)
    }
}

/// Device preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Care room monitor
    Eldercare,
    /// All-sensor unit
    #[default]
    FireUnit,
    /// Pet collar
    PetTracker,
}

impl Preset {
    /// Engine configuration for the preset
    pub fn config(self) -> EngineConfig {
        match self {
            Preset::Eldercare => EngineConfig::eldercare(),
            Preset::FireUnit => EngineConfig::fire_unit(),
            Preset::PetTracker => EngineConfig::pet_tracker(),
        }
    }
}

/// Deployment settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Preset used when `engine` is absent
    pub preset: Preset,
    /// Full engine configuration, overrides `preset`
    pub engine: Option<EngineConfig>,
    /// Device id override
    pub device_id: Option<String>,
    /// Home anchor override
    pub home: Option<GeoPoint>,
    /// Topic layout
    pub topics: Topics,
    /// Broker settings; no MQTT link when absent
    #[cfg(feature = "mqtt")]
    pub mqtt: Option<crate::mqtt::MqttConfig>,
    /// Push settings; no LINE notifications when absent
    #[cfg(feature = "http")]
    pub line: Option<crate::line::LineConfig>,
}

impl Settings {
    /// Parse from a JSON string
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&text)?;
        log::info!("settings loaded from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Validated engine configuration
    pub fn engine_config(&self) -> Result<EngineConfig, SettingsError> {
        let mut config = self.engine.clone().unwrap_or_else(|| self.preset.config());
        if let Some(id) = &self.device_id {
            config = config.with_device_id(id)?;
        }
        if let Some(home) = self.home {
            config = config.with_home(home.latitude, home.longitude);
        }
        config.validate()?;
        Ok(config)
    }

    /// Broker settings with the client id defaulted to the device id
    #[cfg(feature = "mqtt")]
    pub fn mqtt_config(&self) -> Result<Option<crate::mqtt::MqttConfig>, SettingsError> {
        let Some(mut mqtt) = self.mqtt.clone() else {
            return Ok(None);
        };
        if mqtt.client_id.is_empty() {
            mqtt.client_id = self.engine_config()?.device.device_id.to_string();
        }
        Ok(Some(mqtt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careguard_core::config::SensorSet;

    #[test]
    fn empty_document_is_a_fire_unit() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings.engine_config().unwrap(), EngineConfig::fire_unit());
        assert_eq!(settings.topics, Topics::default());
    }

    #[test]
    fn preset_with_overrides() {
        let settings = Settings::from_json(
            r#"{"preset":"pet_tracker","device_id":"collar-7","home":{"latitude":35.0,"longitude":139.0}}"#,
        )
        .unwrap();
        let config = settings.engine_config().unwrap();
        assert_eq!(config.device.device_id.as_str(), "collar-7");
        assert_eq!(config.geofence.home, GeoPoint::new(35.0, 139.0));
        assert!(!config.device.sensors.proximity);
    }

    #[test]
    fn engine_section_overrides_preset() {
        let settings = Settings::from_json(
            r#"{"preset":"pet_tracker","engine":{"device":{"sensors":{"motion":true,"proximity":false,"location":false,"environment":true}}}}"#,
        )
        .unwrap();
        let config = settings.engine_config().unwrap();
        assert_eq!(
            config.device.sensors,
            SensorSet { motion: true, proximity: false, location: false, environment: true }
        );
    }

    #[test]
    fn invalid_thresholds_are_reported() {
        let settings = Settings::from_json(r#"{"engine":{"proximity":{"near_mm":3000.0}}}"#).unwrap();
        assert!(matches!(settings.engine_config(), Err(SettingsError::Engine(ConfigError::ThresholdOrder { .. }))));

        let long_id = "x".repeat(64);
        let settings = Settings { device_id: Some(long_id), ..Settings::default() };
        assert!(matches!(settings.engine_config(), Err(SettingsError::Engine(ConfigError::DeviceIdTooLong { .. }))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(Settings::from_json("{preset:"), Err(SettingsError::Parse(_))));
        assert!(matches!(Settings::load("/nonexistent/careguard.json"), Err(SettingsError::Io(_))));
    }
}
