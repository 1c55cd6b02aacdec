//! Pure geometry helpers for route rendering.

use geo::{BoundingRect, MultiPoint, Point};
use trackcast_env::{Bounds, LatLng};

use crate::model::TrackPoint;

/// Initial bearing in degrees `[0, 360)` from `from` to `to`.
///
/// Uses the planar `atan2(Δlon, Δlat)` approximation, which is what the
/// direction arrows need at route scale. Coincident points yield 0.
pub fn bearing_degrees(from: LatLng, to: LatLng) -> f64 {
    let d_lat = to.lat - from.lat;
    let d_lon = to.lon - from.lon;
    if d_lat == 0.0 && d_lon == 0.0 {
        return 0.0;
    }
    let degrees = d_lon.atan2(d_lat).to_degrees();
    let normalized = (degrees + 360.0) % 360.0;
    // (-tiny + 360.0) can round up to exactly 360.0
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Indices `0, stride, 2·stride, …` strictly below `count - 1`.
///
/// The last point is never sampled because it has no successor to aim at.
pub fn sample_indices(count: usize, stride: usize) -> Vec<usize> {
    (0..count.saturating_sub(1)).step_by(stride.max(1)).collect()
}

/// Stride that yields roughly `target` samples along `count` points.
pub fn direction_stride(count: usize, target: usize) -> usize {
    let target = target.max(1);
    ((count as f64 / target as f64).round() as usize).max(1)
}

/// Projects track points to polyline input, in order.
pub fn to_polyline(points: &[TrackPoint]) -> Vec<LatLng> {
    points.iter().map(TrackPoint::position).collect()
}

/// Bounds of a coordinate set, `None` when empty.
pub fn bounds_of(points: &[LatLng]) -> Option<Bounds> {
    let cloud: MultiPoint<f64> = points.iter().map(|p| Point::new(p.lon, p.lat)).collect();
    cloud.bounding_rect().map(|rect| Bounds {
        south_west: LatLng::new(rect.min().y, rect.min().x),
        north_east: LatLng::new(rect.max().y, rect.max().x),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_cardinal_bearings() {
        let origin = LatLng::new(0.0, 0.0);
        assert_relative_eq!(bearing_degrees(origin, LatLng::new(1.0, 0.0)), 0.0);
        assert_relative_eq!(bearing_degrees(origin, LatLng::new(0.0, 1.0)), 90.0);
        assert_relative_eq!(bearing_degrees(origin, LatLng::new(-1.0, 0.0)), 180.0);
        assert_relative_eq!(bearing_degrees(origin, LatLng::new(0.0, -1.0)), 270.0);
        assert_relative_eq!(bearing_degrees(origin, LatLng::new(1.0, 1.0)), 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_coincident_points() {
        let p = LatLng::new(52.0, 7.0);
        assert_eq!(bearing_degrees(p, p), 0.0);
    }

    #[test]
    fn test_sample_indices_excludes_last_point() {
        assert_eq!(sample_indices(10, 3), vec![0, 3, 6]);
        assert_eq!(sample_indices(10, 1), (0..9).collect::<Vec<_>>());
        assert_eq!(sample_indices(3, 1), vec![0, 1]);
        assert!(sample_indices(1, 1).is_empty());
        assert!(sample_indices(0, 5).is_empty());
    }

    #[test]
    fn test_sample_indices_zero_stride() {
        assert_eq!(sample_indices(4, 0), vec![0, 1, 2]);
    }

    #[test]
    fn test_direction_stride() {
        assert_eq!(direction_stride(3, 10), 1);
        assert_eq!(direction_stride(15, 10), 2);
        assert_eq!(direction_stride(100, 10), 10);
        assert_eq!(direction_stride(1004, 10), 100);
    }

    #[test]
    fn test_bounds_of() {
        let pts = [LatLng::new(52.0, 7.0), LatLng::new(52.2, 7.2), LatLng::new(52.1, 7.1)];
        let bounds = bounds_of(&pts).unwrap();
        assert_relative_eq!(bounds.south_west.lat, 52.0);
        assert_relative_eq!(bounds.south_west.lon, 7.0);
        assert_relative_eq!(bounds.north_east.lat, 52.2);
        assert_relative_eq!(bounds.north_east.lon, 7.2);
        assert!(bounds_of(&[]).is_none());
    }

    fn coord() -> impl Strategy<Value = LatLng> {
        (-89.0f64..89.0, -179.0f64..179.0).prop_map(|(lat, lon)| LatLng::new(lat, lon))
    }

    proptest! {
        #[test]
        fn prop_bearing_in_range(a in coord(), b in coord()) {
            let bearing = bearing_degrees(a, b);
            prop_assert!((0.0..360.0).contains(&bearing));
        }

        #[test]
        fn prop_reverse_bearing_differs_by_180(a in coord(), b in coord()) {
            prop_assume!(a != b);
            let forward = bearing_degrees(a, b);
            let back = bearing_degrees(b, a);
            let diff = (forward - back).rem_euclid(360.0);
            prop_assert!((diff - 180.0).abs() < 1e-9, "forward={} back={}", forward, back);
        }

        #[test]
        fn prop_sampled_indices_have_successor(count in 0usize..500, stride in 1usize..60) {
            let sampled = sample_indices(count, stride);
            prop_assert!(sampled.iter().all(|&i| i + 1 < count));
            prop_assert!(sampled.windows(2).all(|w| w[1] - w[0] == stride));
            prop_assert_eq!(sampled.len(), count.saturating_sub(1).div_ceil(stride));
        }
    }
}
