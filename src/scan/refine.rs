use super::error::ScanError;
use crate::motion::{AxisLimits, Waypoint};
use crate::planner::{circular_search_points, CIRCLE_POINTS};
use crate::spectrum::Detection;

/// Where a local search starts: a coarse hit and the envelope it must stay in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchStart {
    pub position: Waypoint,
    pub peak_mhz: f64,
    pub peak_power_db: f64,
    pub start_mhz: f64,
    pub end_mhz: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefineResult {
    pub position: Waypoint,
    pub peak_mhz: f64,
    pub peak_power_db: f64,
    pub improved: bool,
    pub measurements: usize,
}

/// Hill climb on a shrinking ring. Each ring measures [`CIRCLE_POINTS`]
/// positions around the current best; the search only moves to a strictly
/// stronger reading and halves the radius each time it does. It stops when a
/// ring brings no improvement or the radius falls below the minimum.
#[derive(Debug, Clone)]
pub struct PositionRefiner {
    limits: AxisLimits,
    min_radius: i32,
}

impl PositionRefiner {
    pub fn new(limits: AxisLimits, min_radius: i32) -> Self {
        Self {
            limits,
            min_radius: min_radius.max(1),
        }
    }

    /// `listen` points the antenna at a position and returns what it heard.
    pub fn refine<F>(&self, start: SearchStart, radius: i32, mut listen: F) -> Result<RefineResult, ScanError>
    where
        F: FnMut(Waypoint) -> Result<Vec<Detection>, ScanError>,
    {
        let mut best = RefineResult {
            position: start.position,
            peak_mhz: start.peak_mhz,
            peak_power_db: start.peak_power_db,
            improved: false,
            measurements: 0,
        };
        let mut radius = radius;

        while radius >= self.min_radius {
            let mut moved = false;
            for point in circular_search_points(best.position, radius, CIRCLE_POINTS, &self.limits) {
                let detections = listen(point)?;
                best.measurements += 1;
                let strongest = detections
                    .iter()
                    .filter(|d| d.peak_within(start.start_mhz, start.end_mhz))
                    .max_by(|a, b| a.peak_power_db.total_cmp(&b.peak_power_db));
                if let Some(detection) = strongest {
                    if detection.peak_power_db > best.peak_power_db {
                        best.position = point;
                        best.peak_mhz = detection.peak_mhz;
                        best.peak_power_db = detection.peak_power_db;
                        best.improved = true;
                        moved = true;
                    }
                }
            }
            if !moved {
                break;
            }
            log::debug!(
                "refined to ({}, {}) at {:.1} dB, radius {}",
                best.position.azimuth,
                best.position.elevation,
                best.peak_power_db,
                radius
            );
            radius /= 2;
        }
        Ok(best)
    }
}
