use std::path::Path;

use std::fs::File;
use std::io::prelude::*;

use toml;

use common::wire::DEFAULT_PORT;

use crate::data_handler::IngestMode;
use crate::error::Result;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub http_port: u16,
    pub http_address: String,
    pub ingest_mode: IngestMode,
    pub max_body_bytes: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            http_port: DEFAULT_PORT,
            http_address: "0.0.0.0".into(),
            ingest_mode: IngestMode::Permissive,
            max_body_bytes: 1 << 20,
            log_level: "info".into(),
        }
    }
}

pub fn read_config(config_path: &Path) -> Result<Config> {
    let mut file = File::open(config_path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;

    Ok(toml::from_str(&content)?)
}
