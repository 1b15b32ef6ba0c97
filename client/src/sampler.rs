use chrono::{DateTime, Utc};
use rand::Rng;

use common::{Batch, Reading, SensorDefinition, SensorTable, SubjectId};

/// Take one reading from every configured sensor, stamped with the current time.
pub fn generate_batch(sensors: &SensorTable, subject: &SubjectId) -> Batch {
    generate_batch_with(sensors, subject, Utc::now(), &mut rand::rng())
}

pub fn generate_batch_with<R: Rng>(
    sensors: &SensorTable,
    subject: &SubjectId,
    timestamp: DateTime<Utc>,
    rng: &mut R,
) -> Batch {
    let readings = sensors
        .iter()
        .map(|sensor| Reading {
            sensor_name: sensor.name.clone(),
            subject_id: subject.as_str().to_string(),
            timestamp,
            value: sample_value(sensor, rng),
            unit: sensor.unit.clone(),
        })
        .collect();

    Batch::new(readings)
}

/// Uniform draw over the values in `[min, max]` that have one decimal digit.
fn sample_value<R: Rng>(sensor: &SensorDefinition, rng: &mut R) -> f64 {
    let (low, high) = sensor.tenths_range();
    rng.random_range(low..=high) as f64 / 10.
}
