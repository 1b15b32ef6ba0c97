use std::time::Duration;

use thiserror::Error;

use common::wire::JSON_CONTENT_TYPE;
use common::Batch;

#[derive(Error, Debug)]
pub enum DeliveryFailure {
    #[error("could not encode batch: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not reach collector: {0}")]
    Transport(String),
    #[error("collector answered with status {0}")]
    Status(u16),
}

pub type TransmitResult = Result<(), DeliveryFailure>;

/// Delivers one batch to the collector.
pub trait Transmit {
    fn transmit(&self, batch: &Batch) -> TransmitResult;
}

/// Posts batches as JSON over HTTP.
pub struct HttpTransmitter {
    agent: ureq::Agent,
    url: String,
}

impl HttpTransmitter {
    pub fn new(url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        HttpTransmitter {
            agent,
            url: url.to_string(),
        }
    }
}

impl Transmit for HttpTransmitter {
    fn transmit(&self, batch: &Batch) -> TransmitResult {
        let payload = serde_json::to_string(batch)?;

        let result = self
            .agent
            .post(&self.url)
            .set("Content-Type", JSON_CONTENT_TYPE)
            .send_string(&payload);

        match result {
            Ok(response) if (200..300).contains(&response.status()) => Ok(()),
            Ok(response) => Err(DeliveryFailure::Status(response.status())),
            Err(ureq::Error::Status(code, _)) => Err(DeliveryFailure::Status(code)),
            Err(ureq::Error::Transport(e)) => Err(DeliveryFailure::Transport(e.to_string())),
        }
    }
}
