//! Per-route tracking overview.
//!
//! Ties the pieces together for one (worker, day, route): fetch the day's
//! observations and the planned stops, then reconstruct the traveled path and
//! verify each stop against the same sorted observations. Verification never
//! depends on the routing result.

use crate::config::{ReconstructionConfig, TrackerConfig, VerificationConfig};
use crate::error::{Result, TrackingError};
use crate::geo_utils::{compute_bounds, compute_center};
use crate::reconstruct::{RoadPathReconstructor, Reconstruction};
use crate::routing::RoutingService;
use crate::store::{sort_by_timestamp, ObservationStore};
use crate::verification::verify_visits;
use crate::{Bounds, Coordinate, Observation, PlannedStop, RoutePath, VisitVerification};
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Delivered vs. planned stops for a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryProgress {
    pub delivered: usize,
    pub total: usize,
    /// `delivered / total * 100`, or 0 for a route without stops
    pub percent: f64,
}

impl DeliveryProgress {
    pub fn from_stops(stops: &[PlannedStop]) -> Self {
        let total = stops.len();
        let delivered = stops.iter().filter(|s| s.is_delivered()).count();
        let percent = if total == 0 {
            0.0
        } else {
            delivered as f64 / total as f64 * 100.0
        };
        Self {
            delivered,
            total,
            percent,
        }
    }
}

/// Check that every stop has a strictly positive visit order and that no
/// two stops share one.
pub fn validate_visit_order(stops: &[PlannedStop]) -> Result<()> {
    let mut seen = HashSet::with_capacity(stops.len());
    for stop in stops {
        if stop.visit_order == 0 {
            return Err(TrackingError::InvalidRoute {
                message: format!("stop {} has visit order 0", stop.stop_id),
            });
        }
        if !seen.insert(stop.visit_order) {
            return Err(TrackingError::InvalidRoute {
                message: format!("stop {} repeats visit order {}", stop.stop_id, stop.visit_order),
            });
        }
    }
    Ok(())
}

/// Straight-line path through the stops in visit order.
///
/// Stops with invalid coordinates are skipped. Fewer than two usable stops
/// give an empty path.
pub fn planned_path(stops: &[PlannedStop]) -> RoutePath {
    let mut ordered: Vec<&PlannedStop> = stops.iter().filter(|s| s.coordinate().is_valid()).collect();
    if ordered.len() < 2 {
        return RoutePath::default();
    }
    ordered.sort_by_key(|s| s.visit_order);
    RoutePath::new(ordered.iter().map(|s| s.coordinate()).collect())
}

/// Everything needed to render one route for one worker and day.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOverview {
    pub worker_id: String,
    pub date: NaiveDate,
    pub route_id: String,
    pub planned_path: RoutePath,
    pub actual_path: Reconstruction,
    /// One entry per planned stop, in visit order
    pub verifications: Vec<VisitVerification>,
    pub progress: DeliveryProgress,
    /// Frame over every planned stop and observation
    pub bounds: Option<Bounds>,
    pub center: Option<Coordinate>,
    pub observation_count: usize,
}

impl RouteOverview {
    pub fn verified_count(&self) -> usize {
        self.verifications.iter().filter(|v| v.verified).count()
    }
}

/// Builds [`RouteOverview`]s from an [`ObservationStore`] and a [`RoutingService`].
pub struct RouteTracker<St, S> {
    store: St,
    reconstructor: RoadPathReconstructor<S>,
    verification: VerificationConfig,
}

impl<St: ObservationStore, S: RoutingService> RouteTracker<St, S> {
    /// Create a tracker, validating both configurations.
    pub fn new(
        store: St,
        service: S,
        reconstruction: ReconstructionConfig,
        verification: VerificationConfig,
    ) -> Result<Self> {
        verification.validate()?;
        Ok(Self {
            store,
            reconstructor: RoadPathReconstructor::new(service, reconstruction)?,
            verification,
        })
    }

    /// Create a tracker from a complete [`TrackerConfig`].
    ///
    /// The routing section is not used here; it configures the service the
    /// caller constructs.
    pub fn from_config(store: St, service: S, config: &TrackerConfig) -> Result<Self> {
        Self::new(
            store,
            service,
            config.reconstruction.clone(),
            config.verification.clone(),
        )
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn reconstructor(&self) -> &RoadPathReconstructor<S> {
        &self.reconstructor
    }

    /// Build the overview of `route_id` as driven by `worker_id` on `date`.
    ///
    /// Fails when the store fails or the route's visit orders are invalid
    /// (see [`validate_visit_order`]); routing problems degrade the
    /// reconstructed path instead.
    pub async fn overview(&self, worker_id: &str, date: NaiveDate, route_id: &str) -> Result<RouteOverview> {
        let mut observations = self.store.list_observations(worker_id, date).await?;
        sort_by_timestamp(&mut observations);

        let mut stops = self.store.list_planned_stops(route_id).await?;
        validate_visit_order(&stops)?;
        stops.sort_by_key(|s| s.visit_order);

        let verifications = verify_visits(&stops, &observations, &self.verification)?;
        let actual_path = self.reconstructor.reconstruct(&observations).await;

        let framing = framing_points(&stops, &observations);
        let overview = RouteOverview {
            worker_id: worker_id.to_string(),
            date,
            route_id: route_id.to_string(),
            planned_path: planned_path(&stops),
            actual_path,
            progress: DeliveryProgress::from_stops(&stops),
            bounds: compute_bounds(&framing),
            center: compute_center(&framing),
            observation_count: observations.len(),
            verifications,
        };

        info!(
            "[Tracker] {} on {} route {}: {} observations, {}/{} stops verified, {}/{} delivered",
            worker_id,
            date,
            route_id,
            overview.observation_count,
            overview.verified_count(),
            stops.len(),
            overview.progress.delivered,
            overview.progress.total
        );

        Ok(overview)
    }
}

fn framing_points(stops: &[PlannedStop], observations: &[Observation]) -> Vec<Coordinate> {
    stops
        .iter()
        .map(PlannedStop::coordinate)
        .chain(observations.iter().map(Observation::coordinate))
        .collect()
}
