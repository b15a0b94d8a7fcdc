//! Synthetic GPS traces for seeding example data.
//!
//! Legs between two points are drawn as a quadratic Bézier curve whose single
//! control point is pushed sideways off the straight line, then sampled with a
//! little random jitter. The result looks like a road-following trace without
//! needing a road network.
//!
//! Randomness is injected, so a seeded generator reproduces the same trace.

use crate::config::SyntheticConfig;
use crate::geo_utils::{haversine_distance, meters_to_degrees};
use crate::{Coordinate, Observation, ObservationMetadata, PlannedStop, DELIVERY_COMPLETED_EVENT};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

pub const CLOCK_IN_EVENT: &str = "clock_in";
pub const CLOCK_OUT_EVENT: &str = "clock_out";
pub const LOCATION_UPDATE_EVENT: &str = "location_update";

type Ping = (Coordinate, &'static str, ObservationMetadata);

fn sample<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if lo.is_finite() && hi.is_finite() && lo < hi {
        rng.gen_range(lo..hi)
    } else if lo.is_finite() {
        lo
    } else {
        0.0
    }
}

/// Generate interior points of a curved, road-like path from `start` to `end`.
///
/// `distance_km` is the straight-line distance between the endpoints. The leg
/// is split into one segment per `km_per_segment` (clamped to
/// `min_segments..=max_segments`) and the curve is sampled at every interior
/// segment boundary, so the default configuration yields 1 to 9 points.
/// Endpoints are not included.
///
/// Degenerate input (leg shorter than `min_distance_km`, coincident endpoints,
/// any non-finite value) returns an empty vector. Every returned point is a
/// valid coordinate.
///
/// # Example
/// ```
/// use route_tracker::{generate_road_like_path, Coordinate, SyntheticConfig};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let start = Coordinate::new(-6.2088, 106.8456);
/// let end = Coordinate::new(-6.2500, 106.8900);
/// let points = generate_road_like_path(start, end, 6.7, &SyntheticConfig::default(), &mut rng);
/// assert_eq!(points.len(), 3);
/// ```
pub fn generate_road_like_path<R: Rng + ?Sized>(
    start: Coordinate,
    end: Coordinate,
    distance_km: f64,
    config: &SyntheticConfig,
    rng: &mut R,
) -> Vec<Coordinate> {
    if !start.is_valid() || !end.is_valid() || start == end {
        return Vec::new();
    }
    if !distance_km.is_finite() || distance_km < config.min_distance_km {
        return Vec::new();
    }

    let dx = end.longitude - start.longitude;
    let dy = end.latitude - start.latitude;
    let len = dx.hypot(dy);
    if !len.is_finite() || len == 0.0 {
        return Vec::new();
    }

    let min_segments = config.min_segments.max(2);
    let max_segments = config.max_segments.max(min_segments);
    let segments = ((distance_km / config.km_per_segment).floor() as usize).clamp(min_segments, max_segments);

    // Unit vector perpendicular to the chord, in (lng, lat) degrees
    let (perp_lng, perp_lat) = (-dy / len, dx / len);

    let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let offset = side
        * sample(rng, config.min_curve_fraction, config.max_curve_fraction)
        * config.curve_scale_degrees;

    let mid_lat = (start.latitude + end.latitude) / 2.0;
    let mid_lng = (start.longitude + end.longitude) / 2.0;
    let control = Coordinate::new(mid_lat + perp_lat * offset, mid_lng + perp_lng * offset);

    let jitter = meters_to_degrees(config.jitter_meters.abs(), mid_lat);

    (1..segments)
        .filter_map(|i| {
            let t = i as f64 / segments as f64;
            let u = 1.0 - t;
            let lat = u * u * start.latitude + 2.0 * u * t * control.latitude + t * t * end.latitude;
            let lng = u * u * start.longitude + 2.0 * u * t * control.longitude + t * t * end.longitude;
            let point = Coordinate::new(
                lat + sample(rng, -jitter, jitter),
                lng + sample(rng, -jitter, jitter),
            );
            point.is_valid().then_some(point)
        })
        .collect()
}

/// Generate a full work-day of observations visiting `stops` in visit order.
///
/// The trace starts with a clock-in ping at `origin`, follows a road-like
/// curve to each stop where it records a delivery-completed ping tagged
/// `is_at_customer`, and returns to `origin` for a clock-out ping.
/// Timestamps are spread evenly from `start` to `end` and strictly increase
/// (if the window is too short for the number of pings, they are spaced 1 ms
/// apart and run past `end`).
///
/// Stops with invalid coordinates are skipped; an invalid origin yields no
/// observations.
pub fn generate_day_trace<R: Rng + ?Sized>(
    origin: Coordinate,
    stops: &[PlannedStop],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: &SyntheticConfig,
    rng: &mut R,
) -> Vec<Observation> {
    if !origin.is_valid() {
        return Vec::new();
    }

    let mut ordered: Vec<&PlannedStop> = stops.iter().filter(|s| s.coordinate().is_valid()).collect();
    ordered.sort_by_key(|s| s.visit_order);

    let mut pings: Vec<Ping> = vec![(
        origin,
        CLOCK_IN_EVENT,
        ObservationMetadata {
            is_start: true,
            ..Default::default()
        },
    )];

    let mut travel = |pings: &mut Vec<Ping>, from: Coordinate, to: Coordinate| {
        let distance_km = haversine_distance(&from, &to) / 1000.0;
        for point in generate_road_like_path(from, to, distance_km, config, rng) {
            pings.push((point, LOCATION_UPDATE_EVENT, ObservationMetadata::default()));
        }
    };

    let mut previous = origin;
    for stop in &ordered {
        travel(&mut pings, previous, stop.coordinate());
        pings.push((
            stop.coordinate(),
            DELIVERY_COMPLETED_EVENT,
            ObservationMetadata {
                is_at_customer: true,
                sequence_number: Some(stop.visit_order),
                description: Some(stop.customer_id.clone()),
                ..Default::default()
            },
        ));
        previous = stop.coordinate();
    }

    travel(&mut pings, previous, origin);
    pings.push((
        origin,
        CLOCK_OUT_EVENT,
        ObservationMetadata {
            is_end: true,
            ..Default::default()
        },
    ));

    let gaps = (pings.len() - 1).max(1) as i64;
    let step_ms = ((end - start).num_milliseconds() / gaps).max(1);

    pings
        .into_iter()
        .enumerate()
        .map(|(i, (point, event, metadata))| {
            let timestamp = start + Duration::milliseconds(step_ms * i as i64);
            Observation::new(point.latitude, point.longitude, timestamp)
                .with_event(event)
                .with_metadata(metadata)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{verify_visits, VerificationConfig};
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn jakarta() -> Coordinate {
        Coordinate::new(-6.2088, 106.8456)
    }

    #[test]
    fn test_degenerate_inputs_yield_nothing() {
        let config = SyntheticConfig::default();
        let mut rng = rng();
        let a = jakarta();
        let b = Coordinate::new(-6.25, 106.9);

        assert!(generate_road_like_path(a, b, 0.05, &config, &mut rng).is_empty());
        assert!(generate_road_like_path(a, a, 5.0, &config, &mut rng).is_empty());
        assert!(generate_road_like_path(a, b, f64::NAN, &config, &mut rng).is_empty());
        assert!(generate_road_like_path(Coordinate::new(f64::NAN, 106.8), b, 5.0, &config, &mut rng).is_empty());
        assert!(generate_road_like_path(a, Coordinate::new(-6.2, f64::INFINITY), 5.0, &config, &mut rng).is_empty());
    }

    #[test]
    fn test_point_count_clamped() {
        let config = SyntheticConfig::default();
        let mut rng = rng();
        let a = jakarta();
        let b = Coordinate::new(-6.9175, 107.6191);

        // (distance_km, expected interior points)
        for (km, expected) in [(0.1, 1), (2.9, 1), (3.0, 1), (4.5, 2), (7.6, 4), (15.0, 9), (116.0, 9)] {
            let points = generate_road_like_path(a, b, km, &config, &mut rng);
            assert_eq!(points.len(), expected, "distance {} km", km);
            assert!(points.iter().all(Coordinate::is_valid));
        }
    }

    #[test]
    fn test_curve_bends_off_the_chord() {
        let config = SyntheticConfig {
            jitter_meters: 0.0,
            ..Default::default()
        };
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 0.1); // due east, ~11 km
        let points = generate_road_like_path(a, b, 11.1, &config, &mut rng());

        assert_eq!(points.len(), 6);
        // Control point offset is 0.001..0.003 deg sideways; the midpoint of
        // the curve sits at half of that.
        let max_offset = points.iter().map(|p| p.latitude.abs()).fold(0.0, f64::max);
        assert!(max_offset >= 0.0005 && max_offset <= 0.0015, "offset {}", max_offset);
        // Points progress monotonically from start to end
        for pair in points.windows(2) {
            assert!(pair[1].longitude > pair[0].longitude);
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let config = SyntheticConfig::default();
        let a = jakarta();
        let b = Coordinate::new(-6.3, 106.9);
        let first = generate_road_like_path(a, b, 12.0, &config, &mut StdRng::seed_from_u64(1));
        let second = generate_road_like_path(a, b, 12.0, &config, &mut StdRng::seed_from_u64(1));
        assert_eq!(first, second);
    }

    #[test]
    fn test_day_trace_structure() {
        let origin = jakarta();
        let stops = vec![
            PlannedStop::new("d2", "c2", -6.2300, 106.8200, 2),
            PlannedStop::new("d1", "c1", -6.1900, 106.8700, 1),
            PlannedStop::new("d3", "c3", -6.2600, 106.8600, 3),
        ];
        let start = Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 6, 17, 0, 0).unwrap();

        let trace = generate_day_trace(origin, &stops, start, end, &SyntheticConfig::default(), &mut rng());

        let first = trace.first().unwrap();
        let last = trace.last().unwrap();
        assert!(first.metadata.is_start);
        assert_eq!(first.event_name, CLOCK_IN_EVENT);
        assert_eq!(first.timestamp, start);
        assert!(last.metadata.is_end);
        assert_eq!(last.coordinate(), origin);
        assert!(last.timestamp <= end);

        let visits: Vec<u32> = trace
            .iter()
            .filter(|o| o.metadata.is_at_customer)
            .filter_map(|o| o.metadata.sequence_number)
            .collect();
        assert_eq!(visits, vec![1, 2, 3]);

        for pair in trace.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
        assert!(trace.iter().all(|o| o.coordinate().is_valid()));
        assert!(trace.len() > 5);

        let checks = verify_visits(&stops, &trace, &VerificationConfig::default()).unwrap();
        assert!(checks.iter().all(|c| c.verified));
    }

    #[test]
    fn test_day_trace_without_stops() {
        let start = Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap();
        let trace = generate_day_trace(jakarta(), &[], start, start, &SyntheticConfig::default(), &mut rng());
        // Clock in and out at the same place
        assert_eq!(trace.len(), 2);
        assert!(trace[1].timestamp > trace[0].timestamp);
        assert!(generate_day_trace(
            Coordinate::new(f64::NAN, 0.0),
            &[],
            start,
            start,
            &SyntheticConfig::default(),
            &mut rng()
        )
        .is_empty());
    }
}
