//! End system: samples synthetic vital signs for one subject and pushes them
//! to the collector on a fixed interval.

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;

pub mod config;
pub mod control;
pub mod error;
pub mod sampler;
pub mod session;
pub mod transmit;

pub use error::{Error, Result};
