// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use crate::services::SensorEndpoints;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which repository backend to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Firestore { project_id: String },
}

/// MQTT broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Shared secret expected in `x-device-key` on poll requests
    pub device_secret: String,
    /// Repository backend
    pub storage: StorageBackend,
    /// Sensor endpoint URLs
    pub sensors: SensorEndpoints,
    /// Per-sensor request timeout
    pub sensor_timeout: Duration,
    /// Per storage call timeout
    pub storage_timeout: Duration,
    /// Per publish timeout
    pub publish_timeout: Duration,
    /// Broker settings; `None` publishes to the log only
    pub mqtt: Option<MqttConfig>,
}

impl Config {
    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            device_secret: "test_device_secret".to_string(),
            storage: StorageBackend::Memory,
            sensors: SensorEndpoints {
                gps: "http://sensors.test/gps".to_string(),
                battery: "http://sensors.test/battery".to_string(),
                temperature: "http://sensors.test/temperature".to_string(),
            },
            sensor_timeout: Duration::from_millis(200),
            storage_timeout: Duration::from_secs(2),
            publish_timeout: Duration::from_millis(200),
            mqtt: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "firestore" => StorageBackend::Firestore {
                project_id: env::var("GCP_PROJECT_ID")
                    .map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?,
            },
            _ => return Err(ConfigError::Invalid("STORAGE_BACKEND")),
        };

        let mqtt = match env::var("MQTT_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(MqttConfig {
                host: host.trim().to_string(),
                port: parse_or("MQTT_PORT", 1883)?,
                client_id: env::var("MQTT_CLIENT_ID")
                    .unwrap_or_else(|_| "runner-tracker".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            device_secret: device_secret()?,
            storage,
            sensors: SensorEndpoints {
                gps: env::var("SENSOR_GPS_URL")
                    .unwrap_or_else(|_| "http://sensor_gps:5683/gps".to_string()),
                battery: env::var("SENSOR_BATTERY_URL")
                    .unwrap_or_else(|_| "http://sensor_battery:5683/battery".to_string()),
                temperature: env::var("SENSOR_TEMPERATURE_URL").unwrap_or_else(|_| {
                    "http://sensor_temperature:5683/temperature".to_string()
                }),
            },
            sensor_timeout: Duration::from_millis(parse_or("SENSOR_TIMEOUT_MS", 2000)?),
            storage_timeout: Duration::from_millis(parse_or("STORAGE_TIMEOUT_MS", 5000)?),
            publish_timeout: Duration::from_millis(parse_or("PUBLISH_TIMEOUT_MS", 1000)?),
            mqtt,
        })
    }
}

/// The poll shared secret. An empty secret would match an empty header.
fn device_secret() -> Result<String, ConfigError> {
    let secret = env::var("DEVICE_SECRET")
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing("DEVICE_SECRET"))?;
    if secret.is_empty() {
        return Err(ConfigError::Invalid("DEVICE_SECRET"));
    }
    Ok(secret)
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "DEVICE_SECRET",
        "PORT",
        "STORAGE_BACKEND",
        "GCP_PROJECT_ID",
        "MQTT_HOST",
        "MQTT_PORT",
        "SENSOR_TIMEOUT_MS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env();
        env::set_var("DEVICE_SECRET", "  THREAD_SECRET_2026 ");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.device_secret, "THREAD_SECRET_2026");
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.sensor_timeout, Duration::from_millis(2000));
        assert!(config.mqtt.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_requires_device_secret() {
        clear_env();
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("DEVICE_SECRET"))
        ));
    }

    #[test]
    #[serial]
    fn test_config_rejects_blank_device_secret() {
        clear_env();
        for blank in ["", "   "] {
            env::set_var("DEVICE_SECRET", blank);
            assert!(matches!(
                Config::from_env(),
                Err(ConfigError::Invalid("DEVICE_SECRET"))
            ));
        }
        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_rejects_bad_number() {
        clear_env();
        env::set_var("DEVICE_SECRET", "secret");
        env::set_var("SENSOR_TIMEOUT_MS", "soon");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("SENSOR_TIMEOUT_MS"))
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_firestore_and_mqtt() {
        clear_env();
        env::set_var("DEVICE_SECRET", "secret");
        env::set_var("STORAGE_BACKEND", "firestore");
        env::set_var("GCP_PROJECT_ID", "tracker-prod");
        env::set_var("MQTT_HOST", "mqtt");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(
            config.storage,
            StorageBackend::Firestore {
                project_id: "tracker-prod".to_string()
            }
        );
        let mqtt = config.mqtt.expect("MQTT configured");
        assert_eq!(mqtt.host, "mqtt");
        assert_eq!(mqtt.port, 1883);
        clear_env();
    }
}
