use common::{InvalidSubject, SensorTableError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid sensor table: {0}")]
    Sensors(#[from] SensorTableError),
    #[error(transparent)]
    InvalidSubject(#[from] InvalidSubject),
    #[error("failed to spawn sampling thread: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
