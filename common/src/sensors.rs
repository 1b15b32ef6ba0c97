use std::collections::HashSet;

use thiserror::Error;

/// Bounds beyond this magnitude cannot be counted in tenths exactly.
pub const MAX_BOUND: f64 = 1e14;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SensorDefinition {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub unit: String,
}

impl SensorDefinition {
    pub fn new(name: &str, min: f64, max: f64, unit: &str) -> Self {
        SensorDefinition {
            name: name.into(),
            min,
            max,
            unit: unit.into(),
        }
    }

    /// Smallest and largest value in `[min, max]` expressed in tenths.
    /// Saturates for bounds outside `MAX_BOUND`, which tables reject.
    pub fn tenths_range(&self) -> (i64, i64) {
        let mut low = (self.min * 10.).round() as i64;
        if (low as f64) / 10. < self.min {
            low = low.saturating_add(1);
        }
        let mut high = (self.max * 10.).round() as i64;
        if (high as f64) / 10. > self.max {
            high = high.saturating_sub(1);
        }
        (low, high)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorTableError {
    #[error("sensor table is empty")]
    Empty,
    #[error("sensor definition without a name")]
    MissingName,
    #[error("sensor {0} is defined more than once")]
    Duplicate(String),
    #[error("sensor {0} has a non-finite bound")]
    NonFinite(String),
    #[error("sensor {0} has a bound larger than {}", MAX_BOUND)]
    BoundTooLarge(String),
    #[error("sensor {name}: min {min} is greater than max {max}")]
    InvertedRange { name: String, min: f64, max: f64 },
    #[error("sensor {0} has no value with one decimal digit inside its range")]
    NoRepresentableValue(String),
}

/// Ordered, validated list of sensors sampled on every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorTable {
    sensors: Vec<SensorDefinition>,
}

impl SensorTable {
    pub fn new(sensors: Vec<SensorDefinition>) -> Result<Self, SensorTableError> {
        if sensors.is_empty() {
            return Err(SensorTableError::Empty);
        }

        let mut seen = HashSet::new();
        for sensor in &sensors {
            if sensor.name.is_empty() {
                return Err(SensorTableError::MissingName);
            }
            if !seen.insert(sensor.name.as_str()) {
                return Err(SensorTableError::Duplicate(sensor.name.clone()));
            }
            if !sensor.min.is_finite() || !sensor.max.is_finite() {
                return Err(SensorTableError::NonFinite(sensor.name.clone()));
            }
            if sensor.min.abs() > MAX_BOUND || sensor.max.abs() > MAX_BOUND {
                return Err(SensorTableError::BoundTooLarge(sensor.name.clone()));
            }
            if sensor.min > sensor.max {
                return Err(SensorTableError::InvertedRange {
                    name: sensor.name.clone(),
                    min: sensor.min,
                    max: sensor.max,
                });
            }
            let (low, high) = sensor.tenths_range();
            if low > high {
                return Err(SensorTableError::NoRepresentableValue(sensor.name.clone()));
            }
        }

        Ok(SensorTable { sensors })
    }

    /// Heart rate, blood oxygen and body temperature.
    pub fn reference() -> Self {
        SensorTable {
            sensors: reference_sensors(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorDefinition> {
        self.sensors.iter()
    }

    pub fn get(&self, name: &str) -> Option<&SensorDefinition> {
        self.sensors.iter().find(|sensor| sensor.name == name)
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

impl Default for SensorTable {
    fn default() -> Self {
        SensorTable::reference()
    }
}

pub fn reference_sensors() -> Vec<SensorDefinition> {
    vec![
        SensorDefinition::new("heart_rate", 60., 100., "bpm"),
        SensorDefinition::new("blood_oxygen", 94., 100., "%"),
        SensorDefinition::new("body_temperature", 36.1, 37.2, "°C"),
    ]
}
