//! Observation store contract and an in-memory implementation.
//!
//! The tracker reads two things from persistence: a worker's observations for
//! one calendar day, and the planned stops of a route. Anything that can
//! answer those two queries can back a [`crate::RouteTracker`].

use crate::error::Result;
use crate::{Observation, PlannedStop};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read access to recorded observations and planned routes.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// All observations recorded by `worker_id` on `date` (UTC calendar day).
    /// Order is not guaranteed; callers sort with [`sort_by_timestamp`].
    async fn list_observations(&self, worker_id: &str, date: NaiveDate) -> Result<Vec<Observation>>;

    /// Planned stops of `route_id`. An unknown route has no stops.
    async fn list_planned_stops(&self, route_id: &str) -> Result<Vec<PlannedStop>>;
}

#[async_trait]
impl<T: ObservationStore + ?Sized> ObservationStore for Arc<T> {
    async fn list_observations(&self, worker_id: &str, date: NaiveDate) -> Result<Vec<Observation>> {
        (**self).list_observations(worker_id, date).await
    }

    async fn list_planned_stops(&self, route_id: &str) -> Result<Vec<PlannedStop>> {
        (**self).list_planned_stops(route_id).await
    }
}

/// Sort observations ascending by timestamp.
///
/// The sort is stable: observations sharing a timestamp keep their recorded
/// order.
pub fn sort_by_timestamp(observations: &mut [Observation]) {
    observations.sort_by_key(|o| o.timestamp);
}

#[derive(Debug, Default)]
struct StoreData {
    observations: HashMap<(String, NaiveDate), Vec<Observation>>,
    routes: HashMap<String, Vec<PlannedStop>>,
}

/// Thread-safe in-memory [`ObservationStore`].
///
/// Observations are bucketed by worker and the UTC date of their timestamp.
/// Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: Arc<RwLock<StoreData>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record observations for a worker; each lands in the bucket of its own day.
    pub async fn record_observations(&self, worker_id: &str, observations: impl IntoIterator<Item = Observation>) {
        let mut data = self.data.write().await;
        for obs in observations {
            let key = (worker_id.to_string(), obs.timestamp.date_naive());
            data.observations.entry(key).or_default().push(obs);
        }
    }

    /// Replace the planned stops of a route.
    pub async fn set_route(&self, route_id: &str, stops: Vec<PlannedStop>) {
        self.data.write().await.routes.insert(route_id.to_string(), stops);
    }
}

#[async_trait]
impl ObservationStore for InMemoryStore {
    async fn list_observations(&self, worker_id: &str, date: NaiveDate) -> Result<Vec<Observation>> {
        let data = self.data.read().await;
        Ok(data
            .observations
            .get(&(worker_id.to_string(), date))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_planned_stops(&self, route_id: &str) -> Result<Vec<PlannedStop>> {
        let data = self.data.read().await;
        Ok(data.routes.get(route_id).cloned().unwrap_or_default())
    }
}
