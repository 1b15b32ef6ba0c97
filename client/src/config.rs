use std::fs::File;
use std::io::prelude::*;
use std::path::Path;
use std::time::Duration;

use common::sensors::reference_sensors;
use common::wire::{DEFAULT_PORT, SENSOR_DATA_PATH};
use common::{SensorDefinition, SensorTable};

use crate::error::Result;
use crate::session::SessionSettings;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub collector_url: String,
    pub send_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub stop_grace_ms: u64,
    pub log_level: String,
    pub sensors: Vec<SensorDefinition>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            collector_url: format!("http://localhost:{}{}", DEFAULT_PORT, SENSOR_DATA_PATH),
            send_interval_ms: 10_000,
            request_timeout_ms: 5_000,
            stop_grace_ms: 3_000,
            log_level: "info".into(),
            sensors: reference_sensors(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn session_settings(&self) -> Result<SessionSettings> {
        Ok(SessionSettings {
            sensors: SensorTable::new(self.sensors.clone())?,
            interval: Duration::from_millis(self.send_interval_ms),
            stop_grace: Duration::from_millis(self.stop_grace_ms),
        })
    }
}

pub fn read_config(config_path: &Path) -> Result<Config> {
    let mut file = File::open(config_path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}
