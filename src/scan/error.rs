use thiserror::Error;

use crate::motion::MotionError;
use crate::spectrum::SensorError;
use crate::tracker::TrackId;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("motion error: {0}")]
    Motion(#[from] MotionError),
    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),
    #[error("unknown track {0}")]
    UnknownTrack(TrackId),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("scan engine is not running")]
    EngineStopped,
}

impl ScanError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Motion(MotionError::UserCancelled))
    }
}
