//! Waypoint selection and batch partitioning.
//!
//! A work-day produces hundreds of GPS pings, far more than a routing request
//! accepts. Selection keeps every semantically significant ping plus enough
//! ordinary pings to follow the worker's movement, skipping those that sit
//! within a few meters of the previous waypoint (stationary jitter).

use crate::geo_utils::haversine_distance;
use crate::{Observation, Waypoint};
use log::debug;

/// Thin an ordered observation sequence into routing waypoints.
///
/// - The first observation is always the first waypoint.
/// - An interior observation is kept when it is significant (customer visit,
///   start/end of day, delivery completion) or lies at least
///   `min_spacing_meters` from the last kept waypoint.
/// - The last observation is always the final waypoint unless it repeats the
///   last kept waypoint exactly.
///
/// Observations with invalid coordinates are skipped. Output preserves input
/// order and never repeats a coordinate consecutively. No cap is applied here;
/// oversized outputs are split by [`partition_batches`].
///
/// # Example
/// ```
/// use route_tracker::{select_waypoints, Observation};
/// use chrono::{TimeZone, Utc};
///
/// let t = Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap();
/// let observations = vec![
///     Observation::new(-6.2000, 106.8, t),
///     Observation::new(-6.2001, 106.8, t), // ~11 m, dropped
///     Observation::new(-6.2010, 106.8, t), // ~111 m, kept
///     Observation::new(-6.2020, 106.8, t),
/// ];
/// assert_eq!(select_waypoints(&observations, 30.0).len(), 3);
/// ```
pub fn select_waypoints(observations: &[Observation], min_spacing_meters: f64) -> Vec<Waypoint> {
    let valid: Vec<&Observation> = observations
        .iter()
        .filter(|o| o.coordinate().is_valid())
        .collect();

    if valid.len() < observations.len() {
        debug!(
            "[Waypoints] Skipped {} observations with invalid coordinates",
            observations.len() - valid.len()
        );
    }

    let (first, rest) = match valid.split_first() {
        Some(split) => split,
        None => return Vec::new(),
    };

    let mut waypoints = vec![first.coordinate()];

    let Some((last, interior)) = rest.split_last() else {
        return waypoints;
    };

    for obs in interior {
        let point = obs.coordinate();
        let previous = waypoints[waypoints.len() - 1];
        if point == previous {
            continue;
        }
        if obs.is_significant() || haversine_distance(&previous, &point) >= min_spacing_meters {
            waypoints.push(point);
        }
    }

    let end = last.coordinate();
    if waypoints[waypoints.len() - 1] != end {
        waypoints.push(end);
    }

    debug!(
        "[Waypoints] Selected {} of {} observations",
        waypoints.len(),
        observations.len()
    );

    waypoints
}

/// Split waypoints into overlapping batches of at most `batch_size`.
///
/// Each batch after the first starts at the last waypoint of the previous one,
/// so routed batches join without gaps. Every batch has at least two
/// waypoints; fewer than two waypoints in total yields no batches.
///
/// # Example
/// ```
/// use route_tracker::{partition_batches, Coordinate};
///
/// let waypoints: Vec<Coordinate> = (0..9).map(|i| Coordinate::new(0.0, i as f64 * 0.01)).collect();
/// let batches = partition_batches(&waypoints, 5);
/// assert_eq!(batches.len(), 2);
/// assert_eq!(batches[0].last(), batches[1].first());
/// ```
pub fn partition_batches(waypoints: &[Waypoint], batch_size: usize) -> Vec<&[Waypoint]> {
    let batch_size = batch_size.max(2);
    let mut batches = Vec::new();
    let mut start = 0;

    while start + 1 < waypoints.len() {
        let end = (start + batch_size).min(waypoints.len());
        batches.push(&waypoints[start..end]);
        start = end - 1;
    }

    batches
}
