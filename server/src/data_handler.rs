use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use serde_json::Value;

use common::Reading;

use crate::error::IngestError;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Any well formed JSON is accepted.
    Permissive,
    /// The body must be an array of complete reading records.
    Strict,
}

impl Default for IngestMode {
    fn default() -> Self {
        IngestMode::Permissive
    }
}

/// A decoded submission waiting to be shown to the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Readings(Vec<Reading>),
    Raw(Value),
}

impl Submission {
    pub fn render(&self) -> String {
        let pretty = match self {
            Submission::Readings(readings) => serde_json::to_string_pretty(readings),
            Submission::Raw(value) => serde_json::to_string_pretty(value),
        };
        pretty.unwrap_or_else(|e| format!("<unprintable submission: {}>", e))
    }
}

pub fn decode_submission(body: &[u8], mode: IngestMode) -> Result<Submission, IngestError> {
    let value: Value = serde_json::from_slice(body).map_err(IngestError::InvalidJson)?;

    match mode {
        IngestMode::Permissive => Ok(Submission::Raw(value)),
        IngestMode::Strict => serde_json::from_value(value)
            .map(Submission::Readings)
            .map_err(IngestError::InvalidReadings),
    }
}

/// Prints every accepted submission. A single thread owns stdout so
/// concurrent submissions never interleave.
pub fn run_observer(rx: Receiver<Submission>) -> JoinHandle<()> {
    thread::spawn(move || {
        for submission in rx.iter() {
            println!("\n--- Received Sensor Data ---");
            println!("{}", submission.render());
            println!("----------------------------\n");
        }
        debug!("Observer channel closed");
    })
}
