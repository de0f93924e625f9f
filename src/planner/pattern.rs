use super::waypoints::{horizontal_waypoints, vertical_bands};
use crate::motion::AxisLimits;

/// One horizontal pass of a full-area sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    pub elevation: i32,
    pub azimuths: Vec<i32>,
}

/// Full-area sweep: one pass per elevation band, horizon first. Each band gets
/// `point_counts[i]` azimuth stops and every other band is walked in reverse
/// so the pan servo never has to swing back to the start.
pub fn full_area_passes(
    limits: &AxisLimits,
    point_counts: &[usize],
    circumference: i32,
    start_angle: f64,
) -> Vec<Pass> {
    if point_counts.is_empty() {
        return Vec::new();
    }
    let bands = vertical_bands(limits.elevation_scan, point_counts.len() - 1);
    bands
        .into_iter()
        .zip(point_counts)
        .enumerate()
        .map(|(i, (elevation, &points))| {
            let mut azimuths: Vec<i32> = horizontal_waypoints(points, circumference, start_angle)
                .into_iter()
                .map(|(_, position)| limits.azimuth.clamp(position))
                .collect();
            if i % 2 == 1 {
                azimuths.reverse();
            }
            Pass {
                elevation,
                azimuths,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorStep {
    pub position: i32,
    /// Zero based pass number.
    pub pass: u32,
    pub starts_pass: bool,
}

/// Walks a fixed set of stops back and forth. Each pass reverses direction and
/// skips the stop the previous pass ended on, since it was just measured.
#[derive(Debug, Clone)]
pub struct SweepCursor {
    stops: Vec<i32>,
    max_passes: Option<u32>,
    pass: u32,
    index: usize,
    reverse: bool,
}

impl SweepCursor {
    /// `max_passes` of `None` keeps sweeping until the caller stops.
    pub fn new(stops: Vec<i32>, max_passes: Option<u32>) -> Self {
        Self {
            stops,
            max_passes,
            pass: 0,
            index: 0,
            reverse: false,
        }
    }

    fn first_index(&self) -> usize {
        // A single stop has nothing to skip to.
        if self.pass > 0 && self.stops.len() > 1 {
            1
        } else {
            0
        }
    }
}

impl Iterator for SweepCursor {
    type Item = CursorStep;

    fn next(&mut self) -> Option<CursorStep> {
        if self.stops.is_empty() {
            return None;
        }
        if self.index >= self.stops.len() {
            self.pass += 1;
            self.reverse = !self.reverse;
            self.index = self.first_index();
        }
        if self.max_passes.is_some_and(|max| self.pass >= max) {
            return None;
        }

        let starts_pass = self.index == self.first_index();
        let slot = if self.reverse {
            self.stops.len() - 1 - self.index
        } else {
            self.index
        };
        self.index += 1;

        Some(CursorStep {
            position: self.stops[slot],
            pass: self.pass,
            starts_pass,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_area_is_denser_near_horizon() {
        let passes = full_area_passes(&AxisLimits::default(), &[12, 12, 10, 8, 6, 4, 1], 4096, 0.0);
        assert_eq!(passes.len(), 7);
        let counts: Vec<usize> = passes.iter().map(|p| p.azimuths.len()).collect();
        assert_eq!(counts, vec![12, 12, 10, 8, 6, 4, 1]);
        assert_eq!(passes[0].elevation, 1024);
        assert_eq!(passes[6].elevation, 2048);
        assert!(passes.windows(2).all(|w| w[0].elevation < w[1].elevation));
    }

    #[test]
    fn full_area_alternates_direction() {
        let passes = full_area_passes(&AxisLimits::default(), &[4, 4, 1], 4096, 0.0);
        assert_eq!(passes[0].azimuths, vec![0, 1024, 2048, 3072]);
        assert_eq!(passes[1].azimuths, vec![3072, 2048, 1024, 0]);
        assert_eq!(passes[2].azimuths, vec![0]);
    }

    #[test]
    fn cursor_reverses_and_skips_turnaround() {
        let cursor = SweepCursor::new(vec![0, 1, 2, 3], Some(3));
        let steps: Vec<CursorStep> = cursor.collect();
        let positions: Vec<i32> = steps.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 2, 1, 0, 1, 2, 3]);

        let starts: Vec<(i32, u32)> = steps
            .iter()
            .filter(|s| s.starts_pass)
            .map(|s| (s.position, s.pass))
            .collect();
        assert_eq!(starts, vec![(0, 0), (2, 1), (1, 2)]);
    }

    #[test]
    fn single_stop_repeats() {
        let positions: Vec<i32> = SweepCursor::new(vec![7], Some(3)).map(|s| s.position).collect();
        assert_eq!(positions, vec![7, 7, 7]);
    }

    #[test]
    fn unlimited_cursor_keeps_going() {
        let mut cursor = SweepCursor::new(vec![0, 10], None);
        let positions: Vec<i32> = cursor.by_ref().take(5).map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 10, 0, 10, 0]);
        assert_eq!(cursor.next().map(|s| (s.position, s.pass)), Some((10, 4)));
    }

    #[test]
    fn empty_cursor_ends() {
        assert_eq!(SweepCursor::new(Vec::new(), None).next(), None);
    }
}
