//! Pure geometry for scan patterns. Nothing in here talks to hardware.

mod pattern;
mod waypoints;

pub use pattern::{full_area_passes, SweepCursor};
pub use waypoints::{circular_search_points, horizontal_waypoints, section_waypoints, CIRCLE_POINTS};
