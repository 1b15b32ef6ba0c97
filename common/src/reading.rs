use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// One sensor observation as it travels over the wire.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Reading {
    pub sensor_name: String,
    #[serde(rename = "ES_ID")]
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
}

/// All readings taken during a single tick. Encoded as a plain JSON array.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(transparent)]
pub struct Batch {
    readings: Vec<Reading>,
}

impl Batch {
    pub fn new(readings: Vec<Reading>) -> Self {
        Batch { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn into_readings(self) -> Vec<Reading> {
        self.readings
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("subject identifier must not be empty")]
pub struct InvalidSubject;

/// Identifier of the monitored subject. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(raw: &str) -> Result<Self, InvalidSubject> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidSubject);
        }
        Ok(SubjectId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
