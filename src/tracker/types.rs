use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::channel::ChannelLabel;
use crate::motion::Waypoint;
use crate::spectrum::Detection;

pub type TrackId = u64;

/// Where a track was heard and how loud.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PositionSample {
    pub position: Waypoint,
    pub power_db: f64,
}

/// One emitter followed across measurements.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Track {
    pub id: TrackId,
    pub start_mhz: f64,
    pub end_mhz: f64,
    pub peak_mhz: f64,
    pub peak_power_db: f64,
    /// Position of the strongest reading so far.
    pub best_position: Waypoint,
    pub channel: Option<ChannelLabel>,
    /// One bucket per sweep, indexed by sweep number.
    pub history: Vec<Vec<PositionSample>>,
    pub hits: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Track {
    pub(crate) fn seed(id: TrackId, detection: &Detection, position: Waypoint, sweep: usize) -> Self {
        let now = Utc::now();
        let mut track = Self {
            id,
            start_mhz: detection.start_mhz,
            end_mhz: detection.end_mhz,
            peak_mhz: detection.peak_mhz,
            peak_power_db: detection.peak_power_db,
            best_position: position,
            channel: None,
            history: Vec::new(),
            hits: 1,
            first_seen: now,
            last_seen: now,
        };
        track.align_history(sweep);
        track.history[sweep].push(PositionSample {
            position,
            power_db: detection.peak_power_db,
        });
        track
    }

    pub(crate) fn align_history(&mut self, sweep: usize) {
        if self.history.len() < sweep + 1 {
            self.history.resize_with(sweep + 1, Vec::new);
        }
    }

    /// All three frequencies within `tolerance` of the detection's.
    pub fn matches(&self, detection: &Detection, tolerance_mhz: f64) -> bool {
        (self.peak_mhz - detection.peak_mhz).abs() <= tolerance_mhz
            && (self.start_mhz - detection.start_mhz).abs() <= tolerance_mhz
            && (self.end_mhz - detection.end_mhz).abs() <= tolerance_mhz
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct IngestOutcome {
    pub new_ids: Vec<TrackId>,
    pub updated_ids: Vec<TrackId>,
}
