//! Proximity-based visit verification.
//!
//! A planned stop counts as visited when any observation of the work-day came
//! within the proximity threshold of the customer's coordinates. Each stop is
//! checked against every observation (O(stops x observations)), which is
//! cheap at one worker's daily ping volume.

use crate::config::VerificationConfig;
use crate::error::{check_threshold, Result};
use crate::geo_utils::haversine_distance;
use crate::{Coordinate, Observation, PlannedStop, VisitVerification};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Minimum great-circle distance from `target` to any valid observation.
///
/// Returns `None` when there is no valid observation or the target itself is
/// invalid.
pub fn nearest_distance(target: &Coordinate, observations: &[Observation]) -> Option<f64> {
    if !target.is_valid() {
        return None;
    }

    observations
        .iter()
        .map(Observation::coordinate)
        .filter(Coordinate::is_valid)
        .map(|c| haversine_distance(target, &c))
        .fold(None, |min: Option<f64>, d| Some(min.map_or(d, |m| m.min(d))))
}

fn verify_stop(stop: &PlannedStop, observations: &[Observation], threshold: f64) -> VisitVerification {
    let nearest = nearest_distance(&stop.coordinate(), observations);
    VisitVerification {
        stop_id: stop.stop_id.clone(),
        verified: nearest.map_or(false, |d| d <= threshold),
        nearest_distance_meters: nearest.unwrap_or(f64::INFINITY),
    }
}

/// Verify each stop against the day's observations.
///
/// Results are returned in the same order as `stops`. A stop exactly at the
/// threshold is verified. Stops with no valid observation to compare against
/// are unverified with an infinite nearest distance.
///
/// Fails only when the configured threshold is negative or not finite.
///
/// # Example
/// ```
/// use route_tracker::{verify_visits, Observation, PlannedStop, VerificationConfig};
/// use chrono::{TimeZone, Utc};
///
/// let t = Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap();
/// let observations = vec![Observation::new(-6.2000, 106.8000, t)];
/// let stops = vec![
///     PlannedStop::new("d1", "c1", -6.2005, 106.8000, 1), // ~56 m away
///     PlannedStop::new("d2", "c2", -6.2100, 106.8000, 2), // ~1.1 km away
/// ];
///
/// let checks = verify_visits(&stops, &observations, &VerificationConfig::default()).unwrap();
/// assert!(checks[0].verified);
/// assert!(!checks[1].verified);
/// ```
pub fn verify_visits(
    stops: &[PlannedStop],
    observations: &[Observation],
    config: &VerificationConfig,
) -> Result<Vec<VisitVerification>> {
    let threshold = check_threshold("proximity_threshold_meters", config.proximity_threshold_meters)?;

    Ok(stops
        .iter()
        .map(|stop| verify_stop(stop, observations, threshold))
        .collect())
}

/// Parallel version of [`verify_visits`]; produces identical output.
#[cfg(feature = "parallel")]
pub fn verify_visits_parallel(
    stops: &[PlannedStop],
    observations: &[Observation],
    config: &VerificationConfig,
) -> Result<Vec<VisitVerification>> {
    let threshold = check_threshold("proximity_threshold_meters", config.proximity_threshold_meters)?;

    Ok(stops
        .par_iter()
        .map(|stop| verify_stop(stop, observations, threshold))
        .collect())
}
