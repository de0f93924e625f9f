use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::channel::ChannelLabel;
use crate::motion::{Telemetry, Waypoint};
use crate::spectrum::{Detection, SpectrumSample};
use crate::tracker::{Track, TrackId};

/// Everything the engine can be asked to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, strum_macros::Display)]
#[serde(tag = "action", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanCommand {
    FullSweep,
    HorizontalSweep {
        points: usize,
        elevation: i32,
        /// Number of back and forth passes. Runs until stopped when absent.
        #[serde(default)]
        passes: Option<u32>,
    },
    SectionSweep {
        start: i32,
        end: i32,
        points: usize,
        elevation: i32,
        #[serde(default)]
        passes: Option<u32>,
    },
    SingleScan,
    RefineTrack {
        track_id: TrackId,
        #[serde(default)]
        radius: Option<i32>,
    },
    Forward,
    Calibrate,
    ClearTracks,
    /// Pins the detection threshold, or returns to the adaptive estimate
    /// when `threshold_db` is absent.
    SetThreshold {
        #[serde(default)]
        threshold_db: Option<f64>,
    },
    Stop,
}

impl ScanCommand {
    /// Commands that move the gimbal and produce a run. The others take
    /// effect immediately, even while a run is in progress.
    pub fn is_run(&self) -> bool {
        !matches!(
            self,
            ScanCommand::ClearTracks | ScanCommand::SetThreshold { .. } | ScanCommand::Stop
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LabelledDetection {
    pub detection: Detection,
    pub channel: ChannelLabel,
}

/// Result of one measurement at one position.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScanReport {
    pub run_id: Uuid,
    /// Counts measurements within a run, from zero.
    pub sequence: u64,
    pub position: Waypoint,
    pub sweep: usize,
    pub threshold_db: f64,
    pub detections: Vec<LabelledDetection>,
    pub tracks: Vec<Track>,
    pub sample: SpectrumSample,
    pub telemetry_azimuth: Option<Telemetry>,
    pub telemetry_elevation: Option<Telemetry>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    Started {
        run_id: Uuid,
        command: ScanCommand,
    },
    Measurement(Box<ScanReport>),
    Refined {
        run_id: Uuid,
        track_id: TrackId,
        position: Waypoint,
        peak_mhz: f64,
        peak_power_db: f64,
        improved: bool,
    },
    Finished {
        run_id: Uuid,
        outcome: RunOutcome,
    },
    Failed {
        run_id: Uuid,
        error: String,
    },
    TracksCleared,
}
