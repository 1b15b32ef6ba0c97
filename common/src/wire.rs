//! Constants and response bodies of the submission protocol.

/// The only resource the collector exposes.
pub const SENSOR_DATA_PATH: &str = "/api/sensor-data";
pub const DEFAULT_PORT: u16 = 5050;
pub const JSON_CONTENT_TYPE: &str = "application/json";

pub const INVALID_JSON: &str = "Invalid JSON";
pub const INVALID_SENSOR_DATA: &str = "Invalid sensor data";
pub const NOT_FOUND: &str = "Not found";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub const PAYLOAD_TOO_LARGE: &str = "Payload too large";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StatusBody {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl StatusBody {
    pub fn ok() -> Self {
        StatusBody {
            status: "ok".into(),
            message: None,
        }
    }

    pub fn error(message: &str) -> Self {
        StatusBody {
            status: "error".into(),
            message: Some(message.into()),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Two string fields, serialization cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }
}
