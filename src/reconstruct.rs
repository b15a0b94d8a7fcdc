//! # Road-Path Reconstruction
//!
//! Turns a sparse stream of GPS pings into a road-following polyline.
//!
//! ## Algorithm
//! 1. Select waypoints from the observations ([`select_waypoints`]).
//! 2. If the routing service is unavailable, return the raw observation path.
//! 3. If the waypoints fit in one request, route them in one call and return
//!    the geometry verbatim.
//! 4. Otherwise split them into overlapping batches and route each batch
//!    sequentially, pausing between requests to respect the service's rate
//!    limit. A failed batch contributes its raw waypoints instead, so only
//!    that stretch degrades to straight lines.
//! 5. If nothing was accumulated, return the raw observation path.
//!
//! Whenever at least one valid observation exists the result is non-empty.

use crate::config::ReconstructionConfig;
use crate::routing::{RouteResponse, RoutingError, RoutingService};
use crate::waypoints::{partition_batches, select_waypoints};
use crate::{Coordinate, Observation, RoutePath};
use log::{debug, info, warn};
use std::time::Instant;

/// Where the reconstructed path came from.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSource {
    /// No valid observations; the path is empty
    Empty,
    /// Every request succeeded
    Routed,
    /// Batched, with at least one batch degraded to straight lines
    Degraded { fallback_batches: usize },
    /// Straight lines through the raw observations
    RawObservations(FallbackReason),
}

/// Why the whole path fell back to raw observations.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// Service disabled or not configured; no request was attempted
    ServiceUnavailable,
    /// Fewer than two distinct waypoints, nothing to route
    TooFewWaypoints,
    /// The single request covering the whole route failed
    RoutingFailed(RoutingError),
    /// Batches ran but produced no coordinates
    NothingAccumulated,
}

/// Result of routing one request (the whole route or one batch).
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Routed {
        index: usize,
        waypoint_count: usize,
        geometry_len: usize,
        distance_meters: f64,
        duration_seconds: f64,
    },
    Fallback {
        index: usize,
        waypoint_count: usize,
        reason: RoutingError,
    },
}

impl BatchOutcome {
    pub fn is_routed(&self) -> bool {
        matches!(self, BatchOutcome::Routed { .. })
    }
}

/// A reconstructed path plus a record of how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub path: RoutePath,
    pub source: PathSource,
    /// Number of waypoints selected from the observations
    pub waypoint_count: usize,
    /// One entry per routing request issued, in order
    pub batches: Vec<BatchOutcome>,
}

impl Reconstruction {
    fn raw(observations: &[Observation], waypoint_count: usize, reason: FallbackReason) -> Self {
        Self {
            path: raw_path(observations),
            source: PathSource::RawObservations(reason),
            waypoint_count,
            batches: Vec::new(),
        }
    }
}

/// Reconstructs road-following paths through a [`RoutingService`].
pub struct RoadPathReconstructor<S> {
    service: S,
    config: ReconstructionConfig,
}

impl<S: RoutingService> RoadPathReconstructor<S> {
    /// Create a reconstructor, rejecting a configuration that would exceed
    /// the per-request waypoint limit or carries an invalid spacing.
    pub fn new(service: S, config: ReconstructionConfig) -> crate::error::Result<Self> {
        config.validate()?;
        Ok(Self { service, config })
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Reconstruct the traveled path for observations sorted by timestamp.
    pub async fn reconstruct(&self, observations: &[Observation]) -> Reconstruction {
        let start = Instant::now();

        let waypoints = select_waypoints(observations, self.config.min_waypoint_spacing_meters);

        if waypoints.is_empty() {
            return Reconstruction {
                path: RoutePath::default(),
                source: PathSource::Empty,
                waypoint_count: 0,
                batches: Vec::new(),
            };
        }

        if !self.service.is_available() {
            info!(
                "[Reconstruct] Routing unavailable, drawing {} observations as straight lines",
                observations.len()
            );
            return Reconstruction::raw(observations, waypoints.len(), FallbackReason::ServiceUnavailable);
        }

        if waypoints.len() < 2 {
            return Reconstruction::raw(observations, waypoints.len(), FallbackReason::TooFewWaypoints);
        }

        let result = if waypoints.len() <= self.config.max_waypoints_per_request {
            self.route_single(observations, &waypoints).await
        } else {
            self.route_batched(observations, &waypoints).await
        };

        info!(
            "[Reconstruct] {} observations -> {} waypoints -> {} path points via {} requests ({:?}) in {:?}",
            observations.len(),
            waypoints.len(),
            result.path.len(),
            result.batches.len(),
            result.source,
            start.elapsed()
        );

        result
    }

    async fn route_single(&self, observations: &[Observation], waypoints: &[Coordinate]) -> Reconstruction {
        let outcome = self.service.route(waypoints, self.config.profile).await;

        match usable_geometry(outcome) {
            Ok(response) => Reconstruction {
                batches: vec![BatchOutcome::Routed {
                    index: 0,
                    waypoint_count: waypoints.len(),
                    geometry_len: response.geometry.len(),
                    distance_meters: response.distance_meters,
                    duration_seconds: response.duration_seconds,
                }],
                path: RoutePath::new(response.geometry),
                source: PathSource::Routed,
                waypoint_count: waypoints.len(),
            },
            Err(reason) => {
                warn!("[Reconstruct] Single request failed: {}", reason);
                let mut result = Reconstruction::raw(
                    observations,
                    waypoints.len(),
                    FallbackReason::RoutingFailed(reason.clone()),
                );
                result.batches.push(BatchOutcome::Fallback {
                    index: 0,
                    waypoint_count: waypoints.len(),
                    reason,
                });
                result
            }
        }
    }

    async fn route_batched(&self, observations: &[Observation], waypoints: &[Coordinate]) -> Reconstruction {
        let batches = partition_batches(waypoints, self.config.batch_size);
        debug!(
            "[Reconstruct] {} waypoints exceed {} per request, routing {} batches of up to {}",
            waypoints.len(),
            self.config.max_waypoints_per_request,
            batches.len(),
            self.config.batch_size
        );

        let mut path: Vec<Coordinate> = Vec::new();
        let mut outcomes = Vec::with_capacity(batches.len());

        for (index, batch) in batches.iter().enumerate() {
            if index > 0 && self.config.batch_delay_ms > 0 {
                tokio::time::sleep(self.config.batch_delay()).await;
            }

            match usable_geometry(self.service.route(batch, self.config.profile).await) {
                Ok(response) => {
                    debug!(
                        "[Reconstruct] Batch {}/{}: {} waypoints -> {} points",
                        index + 1,
                        batches.len(),
                        batch.len(),
                        response.geometry.len()
                    );
                    outcomes.push(BatchOutcome::Routed {
                        index,
                        waypoint_count: batch.len(),
                        geometry_len: response.geometry.len(),
                        distance_meters: response.distance_meters,
                        duration_seconds: response.duration_seconds,
                    });
                    append_joined(&mut path, &response.geometry);
                }
                Err(reason) => {
                    warn!(
                        "[Reconstruct] Batch {}/{} failed ({}), using straight lines",
                        index + 1,
                        batches.len(),
                        reason
                    );
                    outcomes.push(BatchOutcome::Fallback {
                        index,
                        waypoint_count: batch.len(),
                        reason,
                    });
                    append_joined(&mut path, batch);
                }
            }
        }

        if path.is_empty() {
            let mut result = Reconstruction::raw(observations, waypoints.len(), FallbackReason::NothingAccumulated);
            result.batches = outcomes;
            return result;
        }

        let fallback_batches = outcomes.iter().filter(|o| !o.is_routed()).count();
        let source = if fallback_batches == 0 {
            PathSource::Routed
        } else {
            PathSource::Degraded { fallback_batches }
        };

        Reconstruction {
            path: RoutePath::new(path),
            source,
            waypoint_count: waypoints.len(),
            batches: outcomes,
        }
    }
}

/// Treat an empty geometry as a failure so the batch falls back.
fn usable_geometry(outcome: Result<RouteResponse, RoutingError>) -> Result<RouteResponse, RoutingError> {
    let response = outcome?;
    if response.geometry.is_empty() {
        return Err(RoutingError::Malformed {
            message: "empty geometry".to_string(),
        });
    }
    Ok(response)
}

/// Append `segment` to `path`, dropping its first point when it repeats the
/// current end of the path.
fn append_joined(path: &mut Vec<Coordinate>, segment: &[Coordinate]) {
    let skip = match (path.last(), segment.first()) {
        (Some(end), Some(first)) if end == first => 1,
        _ => 0,
    };
    path.extend_from_slice(&segment[skip..]);
}

/// Straight-line path through the valid observations, in order.
fn raw_path(observations: &[Observation]) -> RoutePath {
    RoutePath::new(
        observations
            .iter()
            .map(Observation::coordinate)
            .filter(Coordinate::is_valid)
            .collect(),
    )
}
