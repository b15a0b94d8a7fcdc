//! Configuration for reconstruction, verification, routing and seeding.
//!
//! Every component receives its configuration explicitly. Defaults carry the
//! production constants; a full [`TrackerConfig`] can also be loaded from JSON,
//! with any omitted field falling back to its default.

use crate::error::{check_threshold, Result, TrackingError};
use crate::routing::Profile;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for waypoint selection and batched routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Maximum waypoints the routing service accepts in one request.
    /// Default: 25
    pub max_waypoints_per_request: usize,

    /// Waypoints per batch when the route does not fit in one request.
    /// Consecutive batches share one waypoint. Default: 5
    pub batch_size: usize,

    /// Pause between sequential batch requests, in milliseconds.
    /// Default: 50
    pub batch_delay_ms: u64,

    /// Minimum distance from the last selected waypoint before an ordinary
    /// observation becomes a new waypoint. Default: 30.0 meters
    pub min_waypoint_spacing_meters: f64,

    /// Routing profile requested from the service. Default: driving
    pub profile: Profile,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            max_waypoints_per_request: 25,
            batch_size: 5,
            batch_delay_ms: 50,
            min_waypoint_spacing_meters: 30.0,
            profile: Profile::Driving,
        }
    }
}

impl ReconstructionConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_waypoints_per_request < 2 {
            return Err(TrackingError::Config {
                message: format!(
                    "max_waypoints_per_request must be at least 2 (got {})",
                    self.max_waypoints_per_request
                ),
            });
        }
        if self.batch_size < 2 || self.batch_size > self.max_waypoints_per_request {
            return Err(TrackingError::Config {
                message: format!(
                    "batch_size must be between 2 and {} (got {})",
                    self.max_waypoints_per_request, self.batch_size
                ),
            });
        }
        check_threshold("min_waypoint_spacing_meters", self.min_waypoint_spacing_meters)?;
        Ok(())
    }
}

/// Configuration for visit verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// A stop is verified when some observation came within this distance.
    /// The boundary itself counts as verified. Default: 200.0 meters
    pub proximity_threshold_meters: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_meters: 200.0,
        }
    }
}

impl VerificationConfig {
    pub fn validate(&self) -> Result<()> {
        check_threshold("proximity_threshold_meters", self.proximity_threshold_meters)?;
        Ok(())
    }
}

/// Endpoint and credential for the routing service.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Base URL of the directions API. Default: `https://api.mapbox.com`
    pub base_url: String,
    /// Access token. Routing is skipped entirely when absent or blank.
    pub access_token: Option<String>,
    /// Per-request timeout in seconds. Default: 30
    pub request_timeout_secs: u64,
    /// Retries on HTTP 429 or transport failure. Default: 3
    pub max_retries: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            access_token: None,
            request_timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl RoutingConfig {
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// True when a non-blank access token is configured.
    pub fn has_credential(&self) -> bool {
        self.access_token
            .as_deref()
            .map_or(false, |t| !t.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Keep the token out of logs
impl std::fmt::Debug for RoutingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Parameters for synthetic road-like traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Legs shorter than this produce no interior points. Default: 0.1 km
    pub min_distance_km: f64,
    /// Straight-line distance covered by each curve segment. Default: 1.5 km
    pub km_per_segment: f64,
    /// Segment count clamp. Defaults: 2 and 10
    pub min_segments: usize,
    pub max_segments: usize,
    /// Perpendicular control-point offset, as a fraction of `curve_scale_degrees`.
    /// Defaults: 0.1 to 0.3
    pub min_curve_fraction: f64,
    pub max_curve_fraction: f64,
    /// Default: 0.01 degrees (~1.1 km)
    pub curve_scale_degrees: f64,
    /// Maximum random displacement added to each sampled point. Default: 15.0 meters
    pub jitter_meters: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            min_distance_km: 0.1,
            km_per_segment: 1.5,
            min_segments: 2,
            max_segments: 10,
            min_curve_fraction: 0.1,
            max_curve_fraction: 0.3,
            curve_scale_degrees: 0.01,
            jitter_meters: 15.0,
        }
    }
}

/// Complete configuration for a [`crate::RouteTracker`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub reconstruction: ReconstructionConfig,
    pub verification: VerificationConfig,
    pub routing: RoutingConfig,
}

impl TrackerConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Example
    /// ```
    /// use route_tracker::TrackerConfig;
    ///
    /// let config = TrackerConfig::from_json(r#"{ "verification": { "proximity_threshold_meters": 150.0 } }"#).unwrap();
    /// assert_eq!(config.verification.proximity_threshold_meters, 150.0);
    /// assert_eq!(config.reconstruction.batch_size, 5);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.reconstruction.validate()?;
        self.verification.validate()?;
        Ok(())
    }
}
