//! Contract for the external routing service.
//!
//! A routing service turns an ordered list of waypoints into a road-following
//! geometry. Failures are returned as [`RoutingError`] values, never panics,
//! so the reconstructor can degrade a single batch to straight lines.

use crate::Coordinate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Travel mode requested from the routing service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    #[default]
    Driving,
    DrivingTraffic,
    Walking,
    Cycling,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Driving => "driving",
            Profile::DrivingTraffic => "driving-traffic",
            Profile::Walking => "walking",
            Profile::Cycling => "cycling",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully routed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    /// Road-following polyline, first to last waypoint
    pub geometry: Vec<Coordinate>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// Why a routing request produced no usable geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingError {
    /// No credential configured or service disabled
    Unavailable,
    /// Rejected locally before any I/O (too many or too few waypoints)
    InvalidRequest { message: String },
    /// Non-success HTTP status
    Status { status_code: u16 },
    /// Still rate limited after all retries
    RateLimited { attempts: u32 },
    /// Service answered but found no route (e.g. `NoRoute`, `NoSegment`)
    NoRoute { code: String },
    /// Response body could not be interpreted
    Malformed { message: String },
    /// Network failure or timeout
    Transport { message: String },
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::Unavailable => write!(f, "Routing service unavailable"),
            RoutingError::InvalidRequest { message } => write!(f, "Invalid routing request: {}", message),
            RoutingError::Status { status_code } => write!(f, "Routing service returned HTTP {}", status_code),
            RoutingError::RateLimited { attempts } => {
                write!(f, "Routing service rate limited after {} attempts", attempts)
            }
            RoutingError::NoRoute { code } => write!(f, "No route found ({})", code),
            RoutingError::Malformed { message } => write!(f, "Malformed routing response: {}", message),
            RoutingError::Transport { message } => write!(f, "Routing transport error: {}", message),
        }
    }
}

impl std::error::Error for RoutingError {}

/// An external service that routes waypoints along roads.
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// False when the service cannot be used at all (e.g. no credential).
    /// Checked once per reconstruction, before any request is issued.
    fn is_available(&self) -> bool {
        true
    }

    /// Route through `waypoints` in order.
    async fn route(&self, waypoints: &[Coordinate], profile: Profile) -> Result<RouteResponse, RoutingError>;
}

#[async_trait]
impl<S: RoutingService + ?Sized> RoutingService for Arc<S> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    async fn route(&self, waypoints: &[Coordinate], profile: Profile) -> Result<RouteResponse, RoutingError> {
        (**self).route(waypoints, profile).await
    }
}

/// A routing service that is never available.
///
/// Used when no credential is configured; reconstruction then returns the
/// raw observation path without attempting any request.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRouting;

#[async_trait]
impl RoutingService for OfflineRouting {
    fn is_available(&self) -> bool {
        false
    }

    async fn route(&self, _waypoints: &[Coordinate], _profile: Profile) -> Result<RouteResponse, RoutingError> {
        Err(RoutingError::Unavailable)
    }
}
