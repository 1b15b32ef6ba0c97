//! Background sampling loop and the token used to stop it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{after, bounded, select, Receiver, RecvTimeoutError, Sender};

use common::{SensorTable, SubjectId};

use crate::error::{Error, Result};
use crate::sampler::generate_batch;
use crate::transmit::Transmit;

/// One-way stop signal shared between the control surface and the loop.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

struct TokenState {
    cancelled: AtomicBool,
    // Dropping the sender wakes every waiter at once
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        CancellationToken {
            inner: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            match self.inner.trigger.lock() {
                Ok(mut trigger) => drop(trigger.take()),
                Err(poisoned) => drop(poisoned.into_inner().take()),
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Sleeps for `timeout` or until cancelled, whichever comes first.
    /// Returns true if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let signal = &self.inner.signal;
        select! {
            recv(signal) -> _ => true,
            recv(after(timeout)) -> _ => self.is_cancelled(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        CancellationToken::new()
    }
}

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub sensors: SensorTable,
    pub interval: Duration,
    pub stop_grace: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            sensors: SensorTable::reference(),
            interval: Duration::from_secs(10),
            stop_grace: Duration::from_secs(3),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// The sampling thread finished within the grace period.
    Joined,
    /// The sampling thread was still busy and has been left to finish alone.
    TimedOut,
}

pub struct Session {
    subject: SubjectId,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    finished: Receiver<()>,
    stop_grace: Duration,
    outcome: Option<StopOutcome>,
}

impl Session {
    pub fn start<T>(subject: &str, settings: SessionSettings, transmitter: T) -> Result<Session>
    where
        T: Transmit + Send + 'static,
    {
        let subject = SubjectId::new(subject)?;
        let token = CancellationToken::new();
        let (done_tx, finished) = bounded(1);

        let handle = {
            let subject = subject.clone();
            let token = token.clone();
            let sensors = settings.sensors;
            let interval = settings.interval;
            thread::Builder::new()
                .name(format!("sampler-{}", subject))
                .spawn(move || {
                    run_sampling_loop(&subject, &sensors, &transmitter, interval, &token);
                    let _ = done_tx.send(());
                })
                .map_err(Error::Spawn)?
        };

        info!("Started sampling for {}", subject);

        Ok(Session {
            subject,
            token,
            handle: Some(handle),
            finished,
            stop_grace: settings.stop_grace,
            outcome: None,
        })
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.outcome.is_none()
    }

    /// Signals the loop and waits up to the grace period for it to exit.
    /// Calling this again returns the outcome of the first call.
    pub fn stop(&mut self) -> StopOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        self.token.cancel();

        let outcome = match self.finished.recv_timeout(self.stop_grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        error!("Sampling thread for {} panicked", self.subject);
                    }
                }
                StopOutcome::Joined
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Sampling thread for {} did not stop within {:?}",
                    self.subject, self.stop_grace
                );
                StopOutcome::TimedOut
            }
        };

        self.outcome = Some(outcome);
        outcome
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Sample, transmit, wait. Delivery failures are logged and never end the loop.
pub fn run_sampling_loop<T: Transmit>(
    subject: &SubjectId,
    sensors: &SensorTable,
    transmitter: &T,
    interval: Duration,
    token: &CancellationToken,
) {
    while !token.is_cancelled() {
        let batch = generate_batch(sensors, subject);
        info!("Sending {} sensor readings", batch.len());

        match transmitter.transmit(&batch) {
            Ok(()) => debug!("Batch for {} delivered", subject),
            Err(e) => error!("Delivery failed: {}", e),
        }

        if token.wait_timeout(interval) {
            break;
        }
    }
    debug!("Sampling loop for {} stopped", subject);
}
