use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A gimbal axis, identified on the wire by its servo id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Axis {
    Azimuth,
    Elevation,
}

impl Axis {
    pub fn id(self) -> u8 {
        match self {
            Axis::Azimuth => 1,
            Axis::Elevation => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Axis::Azimuth),
            2 => Some(Axis::Elevation),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Axis::Azimuth => 0,
            Axis::Elevation => 1,
        }
    }
}

/// Inclusive position range of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, position: i32) -> bool {
        position >= self.min && position <= self.max
    }

    pub fn clamp(&self, position: i32) -> i32 {
        position.clamp(self.min, self.max)
    }

    pub fn span(&self) -> i32 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AxisLimits {
    /// Full turn of the pan servo.
    pub azimuth: AxisRange,
    /// Positions the tilt servo may ever be commanded to.
    pub elevation_safety: AxisRange,
    /// Horizon to zenith, used by the sweep planners.
    pub elevation_scan: AxisRange,
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self {
            azimuth: AxisRange::new(0, 4096),
            elevation_safety: AxisRange::new(700, 2072),
            elevation_scan: AxisRange::new(1024, 2048),
        }
    }
}

impl AxisLimits {
    /// Converts a gimbal position to degrees: azimuth relative to the middle of
    /// the turn (-180..180), elevation above the horizon (0..90).
    pub fn bearing(&self, at: Waypoint) -> Bearing {
        let half_turn = f64::from(self.azimuth.span()) / 2.0;
        let middle = f64::from(self.azimuth.min) + half_turn;
        let horizontal = (f64::from(at.azimuth) - middle) / half_turn * 180.0;
        let vertical = f64::from(at.elevation - self.elevation_scan.min)
            / f64::from(self.elevation_scan.span())
            * 90.0;
        Bearing {
            horizontal_deg: round3(horizontal),
            vertical_deg: round3(vertical),
        }
    }
}

/// Target (azimuth, elevation) pair visited during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Waypoint {
    pub azimuth: i32,
    pub elevation: i32,
}

impl Waypoint {
    pub const fn new(azimuth: i32, elevation: i32) -> Self {
        Self { azimuth, elevation }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Bearing {
    pub horizontal_deg: f64,
    pub vertical_deg: f64,
}

/// Speed and acceleration sent with every move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveProfile {
    pub speed: u32,
    pub acceleration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Telemetry {
    pub axis: Axis,
    pub position: i32,
    pub speed: i32,
    pub load: i32,
    pub voltage: i32,
    pub temperature: i32,
    pub moving: bool,
    pub current: i32,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
