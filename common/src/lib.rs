//! Types shared between the end system client and the collecting server.

#[macro_use]
extern crate serde_derive;

pub mod reading;
pub mod sensors;
pub mod wire;

pub use reading::{Batch, InvalidSubject, Reading, SubjectId};
pub use sensors::{SensorDefinition, SensorTable, SensorTableError};
