use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::SensorError;
use crate::motion::Waypoint;

/// One power spectrum: linear power per bin and the bin frequencies in MHz,
/// ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpectrumSample {
    pub power: Vec<f64>,
    pub frequencies_mhz: Vec<f64>,
}

impl SpectrumSample {
    pub fn new(power: Vec<f64>, frequencies_mhz: Vec<f64>) -> Result<Self, SensorError> {
        if power.len() != frequencies_mhz.len() {
            return Err(SensorError::Mismatch {
                power: power.len(),
                frequencies: frequencies_mhz.len(),
            });
        }
        Ok(Self {
            power,
            frequencies_mhz,
        })
    }

    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    /// Per-bin power in dB. Empty bins come out as negative infinity.
    pub fn to_db(&self) -> Vec<f64> {
        self.power.iter().map(|p| 10.0 * p.log10()).collect()
    }
}

/// A candidate signal cut out of one spectrum sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Detection {
    pub start_mhz: f64,
    pub end_mhz: f64,
    pub peak_mhz: f64,
    pub peak_power_db: f64,
    /// Where the antenna pointed when the sample was taken.
    pub position: Option<Waypoint>,
}

impl Detection {
    pub fn located_at(mut self, position: Waypoint) -> Self {
        self.position = Some(position);
        self
    }

    /// Whether the peak lies inside `[start, end]`.
    pub fn peak_within(&self, start_mhz: f64, end_mhz: f64) -> bool {
        self.peak_mhz >= start_mhz && self.peak_mhz <= end_mhz
    }
}
