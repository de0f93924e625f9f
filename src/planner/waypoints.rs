use std::f64::consts::PI;

use crate::motion::{AxisLimits, AxisRange, Waypoint};

/// Number of points measured around a refinement circle.
pub const CIRCLE_POINTS: usize = 8;

/// `count + 1` elevations from the bottom to the top of `range`, both ends
/// included and strictly increasing. `count` is capped at the span, so a
/// request finer than one unit per band yields every position once.
pub fn vertical_bands(range: AxisRange, count: usize) -> Vec<i32> {
    let span = i64::from(range.span());
    let count = (count.max(1) as i64).min(span.max(1));
    (0..=count)
        .map(|i| range.min + (i * span / count) as i32)
        .collect()
}

/// Splits a full turn into `point_count` steps starting at `start_angle`.
/// Returns `(angle in degrees, azimuth position)` pairs.
pub fn horizontal_waypoints(point_count: usize, circumference: i32, start_angle: f64) -> Vec<(f64, i32)> {
    if point_count == 0 {
        return Vec::new();
    }
    let increment = 360.0 / point_count as f64;
    (0..point_count)
        .map(|i| {
            let angle = (start_angle + i as f64 * increment).rem_euclid(360.0);
            let position = (angle / 360.0 * f64::from(circumference)) as i32;
            (angle, position)
        })
        .collect()
}

/// Splits the half open interval `[start, end)` into `point_count` steps.
pub fn section_waypoints(start: i32, end: i32, point_count: usize) -> Vec<i32> {
    if point_count == 0 {
        return Vec::new();
    }
    let step = (end - start) / point_count as i32;
    (0..point_count as i32).map(|i| start + i * step).collect()
}

/// Evenly spaced points on a circle around `center`. Points that would leave
/// an axis range are pulled onto its boundary, never dropped.
pub fn circular_search_points(
    center: Waypoint,
    radius: i32,
    point_count: usize,
    limits: &AxisLimits,
) -> Vec<Waypoint> {
    (0..point_count)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / point_count as f64;
            let azimuth = f64::from(center.azimuth) + f64::from(radius) * angle.cos();
            let elevation = f64::from(center.elevation) + f64::from(radius) * angle.sin();
            Waypoint {
                azimuth: limits.azimuth.clamp(saturate(azimuth)),
                elevation: limits.elevation_safety.clamp(saturate(elevation)),
            }
        })
        .collect()
}

fn saturate(value: f64) -> i32 {
    value.trunc().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_bands_span_scan_range() {
        let range = AxisRange::new(1024, 2048);
        for count in [1, 2, 6, 7, 100, 1024] {
            let bands = vertical_bands(range, count);
            assert_eq!(bands.len(), count + 1);
            assert_eq!(bands[0], 1024);
            assert_eq!(*bands.last().unwrap(), 2048);
            assert!(bands.windows(2).all(|w| w[0] < w[1]));
        }
        assert_eq!(
            vertical_bands(range, 4),
            vec![1024, 1280, 1536, 1792, 2048]
        );
    }

    #[test]
    fn vertical_bands_never_repeat_in_a_narrow_range() {
        let range = AxisRange::new(1000, 1004);
        let bands = vertical_bands(range, 50);
        assert_eq!(bands, vec![1000, 1001, 1002, 1003, 1004]);
        assert!(bands.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn four_horizontal_points_are_quarter_turns() {
        let points = horizontal_waypoints(4, 4096, 0.0);
        let angles: Vec<f64> = points.iter().map(|p| p.0).collect();
        let positions: Vec<i32> = points.iter().map(|p| p.1).collect();
        assert_eq!(angles, vec![0.0, 90.0, 180.0, 270.0]);
        assert_eq!(positions, vec![0, 1024, 2048, 3072]);
    }

    #[test]
    fn horizontal_offset_wraps_around() {
        let points = horizontal_waypoints(4, 4096, 270.0);
        let positions: Vec<i32> = points.iter().map(|p| p.1).collect();
        assert_eq!(positions, vec![3072, 0, 1024, 2048]);
    }

    #[test]
    fn section_excludes_end() {
        assert_eq!(section_waypoints(1792, 2304, 4), vec![1792, 1920, 2048, 2176]);
        assert!(section_waypoints(0, 100, 0).is_empty());
    }

    #[test]
    fn circle_points_are_always_clamped() {
        let limits = AxisLimits::default();
        let centers = [
            Waypoint::new(0, 700),
            Waypoint::new(4096, 2072),
            Waypoint::new(2048, 1024),
            Waypoint::new(-500, 5000),
        ];
        for center in centers {
            for radius in [0, 25, 256, 5000] {
                let points = circular_search_points(center, radius, CIRCLE_POINTS, &limits);
                assert_eq!(points.len(), CIRCLE_POINTS);
                for p in points {
                    assert!(limits.azimuth.contains(p.azimuth), "{p:?}");
                    assert!(limits.elevation_safety.contains(p.elevation), "{p:?}");
                }
            }
        }
    }

    #[test]
    fn circle_edge_point_is_pulled_to_boundary() {
        let limits = AxisLimits::default();
        let points = circular_search_points(Waypoint::new(4000, 1024), 256, CIRCLE_POINTS, &limits);
        assert_eq!(points[0], Waypoint::new(4096, 1024));
        assert_eq!(points[4], Waypoint::new(3744, 1024));
    }
}
