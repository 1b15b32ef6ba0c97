use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to listen on {address}: {reason}")]
    Bind { address: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a submission body is turned away.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("body is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),
    #[error("body is not a list of sensor readings: {0}")]
    InvalidReadings(serde_json::Error),
}
