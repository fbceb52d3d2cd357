//! Simple data models for the monitoring pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// One complete sample from a particulate sensor.
///
/// Field names follow the Plantower register layout: `*_cf1` values use the
/// factory calibration (CF=1), `*_std` values are atmospheric ("environmental")
/// units, and `grXXum` are particle counts beyond the given diameter per 0.1 L.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    // ---
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    pub pm10_cf1: u16,
    pub pm25_cf1: u16,
    pub pm100_cf1: u16,

    pub pm10_std: u16,
    pub pm25_std: u16,
    pub pm100_std: u16,

    pub gr03um: u16,
    pub gr05um: u16,
    pub gr10um: u16,
    pub gr25um: u16,
    pub gr50um: u16,
    pub gr100um: u16,
}

/// Particle-count bin labels, in the order of [`Sample::particle_counts`].
pub const PARTICLE_SIZES: [&str; 6] = [">0.3um", ">0.5um", ">1.0um", ">2.5um", ">5.0um", ">10um"];

impl Sample {
    // ---
    /// Sample with every concentration and count set to zero.
    pub fn zeroed(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            pm10_cf1: 0,
            pm25_cf1: 0,
            pm100_cf1: 0,
            pm10_std: 0,
            pm25_std: 0,
            pm100_std: 0,
            gr03um: 0,
            gr05um: 0,
            gr10um: 0,
            gr25um: 0,
            gr50um: 0,
            gr100um: 0,
        }
    }

    /// The PM2.5 reading that feeds the AQI window.
    pub fn to_reading(&self) -> Reading {
        Reading {
            timestamp: self.timestamp,
            concentration: f64::from(self.pm25_cf1),
        }
    }

    pub fn particle_counts(&self) -> [u16; 6] {
        [
            self.gr03um,
            self.gr05um,
            self.gr10um,
            self.gr25um,
            self.gr50um,
            self.gr100um,
        ]
    }
}

/// A single PM2.5 concentration at a point in time (µg/m³).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub concentration: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, concentration: f64) -> Self {
        Self {
            timestamp,
            concentration,
        }
    }
}
