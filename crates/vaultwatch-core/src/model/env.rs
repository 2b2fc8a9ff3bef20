// ── Environmental telemetry ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One environmental sample from the room sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvReading {
    pub timestamp: DateTime<Utc>,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    /// Light level (lux or raw ADC, depending on the sensor).
    pub light: f64,
    /// MQ gas sensor air-quality index.
    pub air_quality: f64,
    pub fire: bool,

    pub record_id: Option<String>,
    pub seq: usize,
}

/// Which environmental metric a chart series plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvMetric {
    Temperature,
    Humidity,
    Light,
    AirQuality,
}

impl EnvReading {
    pub fn metric(&self, metric: EnvMetric) -> f64 {
        match metric {
            EnvMetric::Temperature => self.temperature,
            EnvMetric::Humidity => self.humidity,
            EnvMetric::Light => self.light,
            EnvMetric::AirQuality => self.air_quality,
        }
    }
}
