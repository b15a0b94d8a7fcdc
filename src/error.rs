//! Unified error handling for the route-tracker library.
//!
//! Geometry functions never fail: degenerate input produces a degenerate
//! result. The errors here are reserved for caller misuse (bad thresholds,
//! invalid configuration) and for collaborators that cannot be reached
//! (observation store, HTTP client construction).
//!
//! Per-batch routing failures are *not* represented here; they are recovered
//! inside the reconstructor and recorded as [`crate::routing::RoutingError`].

use std::fmt;

/// Unified error type for route-tracker operations.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingError {
    /// A distance threshold was negative or not finite
    InvalidThreshold { name: String, value: f64 },
    /// Configuration could not be parsed or failed validation
    Config { message: String },
    /// The observation store failed to answer a query
    Store { message: String },
    /// Planned stops break the visit-order rules (zero or duplicated order)
    InvalidRoute { message: String },
    /// HTTP client setup or transport error
    Http {
        message: String,
        status_code: Option<u16>,
    },
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::InvalidThreshold { name, value } => {
                write!(
                    f,
                    "Threshold '{}' must be a finite, non-negative distance (got {})",
                    name, value
                )
            }
            TrackingError::Config { message } => {
                write!(f, "Configuration error: {}", message)
            }
            TrackingError::Store { message } => {
                write!(f, "Observation store error: {}", message)
            }
            TrackingError::InvalidRoute { message } => {
                write!(f, "Invalid route: {}", message)
            }
            TrackingError::Http {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for TrackingError {}

impl From<serde_json::Error> for TrackingError {
    fn from(err: serde_json::Error) -> Self {
        TrackingError::Config {
            message: err.to_string(),
        }
    }
}

/// Result type alias for route-tracker operations.
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Reject negative or non-finite distance thresholds.
pub(crate) fn check_threshold(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(TrackingError::InvalidThreshold {
            name: name.to_string(),
            value,
        })
    }
}
