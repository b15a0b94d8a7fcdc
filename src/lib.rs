//! # Route Tracker
//!
//! Road-path reconstruction and visit verification for sales-force GPS tracking.
//!
//! This library provides:
//! - Waypoint selection that thins a day of GPS pings into a routing request
//! - Road-following path reconstruction against a rate-limited routing service,
//!   degrading batch by batch to straight lines when the service fails
//! - Proximity-based verification that each planned stop was actually visited
//! - Synthetic GPS traces for seeding example data
//!
//! ## Features
//!
//! - **`parallel`** - Verify stops in parallel with rayon
//! - **`http`** - Enable the Mapbox Directions routing client
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use route_tracker::{select_waypoints, verify_visits, Coordinate, Observation, PlannedStop, VerificationConfig};
//! use chrono::{TimeZone, Utc};
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap();
//! let observations: Vec<Observation> = (0..10)
//!     .map(|i| Observation::new(-6.2088 + i as f64 * 0.001, 106.8456, t0 + chrono::Duration::minutes(i)))
//!     .collect();
//!
//! let waypoints = select_waypoints(&observations, 30.0);
//! assert_eq!(waypoints.first(), Some(&Coordinate::new(-6.2088, 106.8456)));
//!
//! let stop = PlannedStop::new("delivery-1", "customer-1", -6.2058, 106.8456, 1);
//! let checks = verify_visits(&[stop], &observations, &VerificationConfig::default()).unwrap();
//! assert!(checks[0].verified);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TrackingError};

// Geographic utilities (distance, bounds, center calculations)
pub mod geo_utils;

// Explicit configuration (no ambient environment state)
pub mod config;
pub use config::{ReconstructionConfig, RoutingConfig, SyntheticConfig, TrackerConfig, VerificationConfig};

// Waypoint selection and batch partitioning
pub mod waypoints;
pub use waypoints::{partition_batches, select_waypoints};

// Routing service contract
pub mod routing;
pub use routing::{OfflineRouting, Profile, RouteResponse, RoutingError, RoutingService};

// Road-path reconstruction
pub mod reconstruct;
pub use reconstruct::{BatchOutcome, FallbackReason, PathSource, RoadPathReconstructor, Reconstruction};

// Visit verification
pub mod verification;
#[cfg(feature = "parallel")]
pub use verification::verify_visits_parallel;
pub use verification::{nearest_distance, verify_visits};

// Synthetic GPS traces for seeding
pub mod synthetic;
pub use synthetic::{generate_day_trace, generate_road_like_path};

// Observation store contract
pub mod store;
pub use store::{sort_by_timestamp, InMemoryStore, ObservationStore};

// Route overview orchestration
pub mod tracking;
pub use tracking::{planned_path, validate_visit_order, DeliveryProgress, RouteOverview, RouteTracker};

// HTTP routing client
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::MapboxDirections;

/// Event name a device reports when a delivery is completed at a customer.
pub const DELIVERY_COMPLETED_EVENT: &str = "delivery_completed";

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate with latitude and longitude in degrees.
///
/// Waypoints and path vertices are plain coordinates; the `(lng, lat)` order
/// used on the wire is produced by [`Coordinate::to_lng_lat`].
///
/// # Example
/// ```
/// use route_tracker::Coordinate;
/// let point = Coordinate::new(-6.2088, 106.8456); // Jakarta
/// assert_eq!(point.to_lng_lat(), [106.8456, -6.2088]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// A coordinate selected from observations to submit to a routing service.
pub type Waypoint = Coordinate;

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Build a coordinate from a GeoJSON-style `[lng, lat]` pair.
    pub fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self::new(pair[1], pair[0])
    }

    /// GeoJSON-style `[lng, lat]` pair.
    pub fn to_lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Check if the coordinate is finite and within WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box used to frame a route on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Semantic tags a device attaches to an observation.
///
/// Only this fixed set of flags is ever read; unknown keys in stored
/// metadata are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationMetadata {
    /// First ping of the work-day (clock in)
    pub is_start: bool,
    /// Last ping of the work-day (clock out)
    pub is_end: bool,
    /// Ping taken while at a customer location
    pub is_at_customer: bool,
    /// Visit order of the stop this ping belongs to
    pub sequence_number: Option<u32>,
    /// Free-form note from the device
    pub description: Option<String>,
}

/// A single reported position from a tracked worker's device.
///
/// Observations for one (worker, day) are processed in ascending
/// `timestamp` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(alias = "created_at")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "eventName", deserialize_with = "null_as_default")]
    pub event_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ObservationMetadata,
}

impl Observation {
    /// Create a plain location ping with no event or tags.
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            event_name: String::new(),
            metadata: ObservationMetadata::default(),
        }
    }

    /// Set the event name.
    pub fn with_event(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = event_name.into();
        self
    }

    /// Replace the metadata tags.
    pub fn with_metadata(mut self, metadata: ObservationMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Position of this observation.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Significant observations are always kept as waypoints: customer
    /// visits, the start and end of the day, and delivery completions.
    pub fn is_significant(&self) -> bool {
        self.metadata.is_at_customer
            || self.metadata.is_start
            || self.metadata.is_end
            || self.event_name == DELIVERY_COMPLETED_EVENT
    }
}

/// Delivery state of a planned stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Delivered,
}

/// One scheduled delivery location on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStop {
    /// Identifier of the delivery record (used to key verifications)
    pub stop_id: String,
    pub customer_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Strictly positive, unique within a route. Checked by
    /// [`validate_visit_order`] when a route is loaded for an overview.
    pub visit_order: u32,
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
}

impl PlannedStop {
    /// Create a pending stop.
    pub fn new(
        stop_id: impl Into<String>,
        customer_id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        visit_order: u32,
    ) -> Self {
        Self {
            stop_id: stop_id.into(),
            customer_id: customer_id.into(),
            latitude,
            longitude,
            visit_order,
            delivery_status: DeliveryStatus::Pending,
        }
    }

    /// Set the delivery status.
    pub fn with_status(mut self, status: DeliveryStatus) -> Self {
        self.delivery_status = status;
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn is_delivered(&self) -> bool {
        self.delivery_status == DeliveryStatus::Delivered
    }
}

/// An ordered polyline ready for map rendering.
///
/// A path with fewer than two coordinates is "nothing to draw", not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePath {
    pub coordinates: Vec<Coordinate>,
}

impl RoutePath {
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        Self { coordinates }
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// True when the path has at least two points and can be drawn as a line.
    pub fn is_drawable(&self) -> bool {
        self.coordinates.len() >= 2
    }

    /// Path length in meters.
    pub fn length_meters(&self) -> f64 {
        geo_utils::polyline_length(&self.coordinates)
    }

    /// GeoJSON `LineString` coordinates (`[lng, lat]` pairs).
    pub fn to_lng_lat(&self) -> Vec<[f64; 2]> {
        self.coordinates.iter().map(Coordinate::to_lng_lat).collect()
    }
}

impl From<RoutePath> for geo::LineString<f64> {
    fn from(path: RoutePath) -> Self {
        path.coordinates
            .iter()
            .map(|c| geo::Coord { x: c.longitude, y: c.latitude })
            .collect()
    }
}

/// Proximity check of one planned stop against a day of observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitVerification {
    pub stop_id: String,
    /// True iff `nearest_distance_meters` is within the proximity threshold
    pub verified: bool,
    /// Minimum great-circle distance from any observation to the stop.
    /// Infinite when there were no valid observations (`null` in JSON).
    #[serde(with = "infinite_as_null")]
    pub nearest_distance_meters: f64,
}

/// JSON has no infinity: write it as `null` and read `null` back as infinity.
mod infinite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Tests
// ============================================================================
