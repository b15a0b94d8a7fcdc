//! # Geographic Utilities
//!
//! Core geographic computations shared by waypoint selection, visit
//! verification and synthetic trace generation.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two coordinates |
//! | [`polyline_length`] | Total length of a path in meters |
//! | [`compute_bounds`] | Bounding box of a set of coordinates |
//! | [`compute_center`] | Centroid of a set of coordinates |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! ## Example
//!
//! ```rust
//! use route_tracker::{Coordinate, geo_utils};
//!
//! let jakarta = Coordinate::new(-6.2088, 106.8456);
//! let bandung = Coordinate::new(-6.9175, 107.6191);
//!
//! let dist = geo_utils::haversine_distance(&jakarta, &bandung);
//! println!("Jakarta to Bandung: {:.0} km", dist / 1000.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances assume a spherical Earth with radius [`EARTH_RADIUS_METERS`]
//! (6,371,000 m). Ellipsoidal flattening is ignored, which is well below GPS
//! noise at the scale of a delivery route.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)
//!
//! ### Coordinate System
//!
//! All functions expect WGS84 latitude/longitude in degrees.

use geo::{BoundingRect, Centroid, MultiPoint, Point};
use crate::{Bounds, Coordinate};

/// Mean Earth radius used for all great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two coordinates using the
/// Haversine formula.
///
/// Returns the distance in meters. The result is symmetric and exactly `0.0`
/// for identical inputs. Non-finite input yields a non-finite result; callers
/// filter invalid coordinates before measuring.
///
/// # Example
///
/// ```rust
/// use route_tracker::{Coordinate, geo_utils};
///
/// let london = Coordinate::new(51.5074, -0.1278);
/// let paris = Coordinate::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_500.0).abs() < 2000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = (p2.latitude - p1.latitude).to_radians();
    let dlng = (p2.longitude - p1.longitude).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlng = (dlng / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    // Rounding can push h fractionally above 1 for antipodal points
    2.0 * EARTH_RADIUS_METERS * h.min(1.0).sqrt().asin()
}

/// Calculate the total length of a path in meters.
///
/// Sums the haversine distance between consecutive points. Empty or
/// single-point paths return 0.0.
pub fn polyline_length(points: &[Coordinate]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale (the smaller of the two) so the result is a
/// conservative upper bound for both axes. Near the poles the cosine is
/// clamped to avoid division blow-up.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Bounding Box / Center Functions
// =============================================================================

fn to_multi_point(points: &[Coordinate]) -> MultiPoint<f64> {
    points
        .iter()
        .filter(|p| p.is_valid())
        .map(|p| Point::new(p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .into()
}

/// Compute the bounding box of a set of coordinates.
///
/// Invalid coordinates are ignored. Returns `None` when nothing valid remains.
///
/// # Example
///
/// ```rust
/// use route_tracker::{Coordinate, geo_utils};
///
/// let points = vec![
///     Coordinate::new(-6.20, 106.80),
///     Coordinate::new(-6.25, 106.85),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&points).unwrap();
/// assert_eq!(bounds.min_lat, -6.25);
/// assert_eq!(bounds.max_lng, 106.85);
/// ```
pub fn compute_bounds(points: &[Coordinate]) -> Option<Bounds> {
    let rect = to_multi_point(points).bounding_rect()?;
    Some(Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

/// Compute the centroid of a set of coordinates.
///
/// Simple planar mean, adequate for city-scale routes. Routes crossing the
/// antimeridian are not handled. Returns `None` when no valid coordinate is
/// given.
pub fn compute_center(points: &[Coordinate]) -> Option<Coordinate> {
    to_multi_point(points)
        .centroid()
        .map(|c| Coordinate::new(c.y(), c.x()))
}

// =============================================================================
// Unit Tests
// =============================================================================
