//! Full work-day scenarios through `RouteTracker`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use route_tracker::geo_utils::EARTH_RADIUS_METERS;
use route_tracker::{
    generate_day_trace, Coordinate, DeliveryStatus, FallbackReason, InMemoryStore, Observation, OfflineRouting,
    PathSource, PlannedStop, Profile, ReconstructionConfig, RouteResponse, RouteTracker, RoutingError,
    RoutingService, SyntheticConfig, TrackerConfig, VerificationConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};

const TRACE_LAT: f64 = -6.1997; // ~33 m north of stops 1 and 3

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, hour, minute, 0).unwrap()
}

/// 09:00 to 17:00, one ping every 10 minutes, heading east along `TRACE_LAT`.
fn day_trace() -> Vec<Observation> {
    let start = at(9, 0);
    (0..=48)
        .map(|i| {
            let lng = 106.80 + i as f64 * (0.1 / 48.0);
            Observation::new(TRACE_LAT, lng, start + Duration::minutes(10 * i))
        })
        .collect()
}

fn three_stops() -> Vec<PlannedStop> {
    let five_km_south = TRACE_LAT - (5000.0 / EARTH_RADIUS_METERS).to_degrees();
    vec![
        PlannedStop::new("delivery-1", "customer-1", -6.2000, 106.80, 1).with_status(DeliveryStatus::Delivered),
        PlannedStop::new("delivery-2", "customer-2", five_km_south, 106.80 + 24.0 * (0.1 / 48.0), 2),
        PlannedStop::new("delivery-3", "customer-3", -6.2000, 106.90, 3).with_status(DeliveryStatus::Delivered),
    ]
}

async fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.record_observations("worker-1", day_trace()).await;
    store.set_route("route-1", three_stops()).await;
    store
}

/// Densifies each request with midpoints; fails every request when `fail` is set.
struct CountingRouting {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingRouting {
    fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }
}

#[async_trait]
impl RoutingService for CountingRouting {
    async fn route(&self, waypoints: &[Coordinate], _profile: Profile) -> Result<RouteResponse, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RoutingError::Status { status_code: 503 });
        }
        let mut geometry = Vec::new();
        for pair in waypoints.windows(2) {
            geometry.push(pair[0]);
            geometry.push(Coordinate::new(
                (pair[0].latitude + pair[1].latitude) / 2.0,
                (pair[0].longitude + pair[1].longitude) / 2.0,
            ));
        }
        if let Some(last) = waypoints.last() {
            geometry.push(*last);
        }
        Ok(RouteResponse {
            geometry,
            distance_meters: 0.0,
            duration_seconds: 0.0,
        })
    }
}

#[tokio::test]
async fn test_three_stop_day_verification() {
    let tracker = RouteTracker::from_config(seeded_store().await, OfflineRouting, &TrackerConfig::default()).unwrap();
    let overview = tracker.overview("worker-1", day(), "route-1").await.unwrap();

    let checks = &overview.verifications;
    assert_eq!(checks.len(), 3);

    assert_eq!(checks[0].stop_id, "delivery-1");
    assert!(checks[0].verified);
    assert!(checks[0].nearest_distance_meters < 50.0);

    assert_eq!(checks[1].stop_id, "delivery-2");
    assert!(!checks[1].verified);
    assert!(
        (checks[1].nearest_distance_meters - 5000.0).abs() < 1.0,
        "nearest {}",
        checks[1].nearest_distance_meters
    );

    assert_eq!(checks[2].stop_id, "delivery-3");
    assert!(checks[2].verified);
    assert!(checks[2].nearest_distance_meters < 50.0);

    assert_eq!(overview.progress.delivered, 2);
    assert_eq!(overview.progress.total, 3);
    assert_eq!(overview.planned_path.len(), 3);
}

#[tokio::test]
async fn test_offline_path_is_raw_trace() {
    let tracker = RouteTracker::from_config(seeded_store().await, OfflineRouting, &TrackerConfig::default()).unwrap();
    let overview = tracker.overview("worker-1", day(), "route-1").await.unwrap();

    let raw: Vec<Coordinate> = day_trace().iter().map(Observation::coordinate).collect();
    assert_eq!(overview.actual_path.path.coordinates, raw);
    assert_eq!(
        overview.actual_path.source,
        PathSource::RawObservations(FallbackReason::ServiceUnavailable)
    );
    assert!(overview.actual_path.batches.is_empty());
}

#[tokio::test]
async fn test_failing_service_degrades_every_batch() {
    let service = CountingRouting::new(true);
    let config = ReconstructionConfig {
        batch_delay_ms: 0,
        ..Default::default()
    };
    let tracker = RouteTracker::new(seeded_store().await, service, config, VerificationConfig::default()).unwrap();
    let overview = tracker.overview("worker-1", day(), "route-1").await.unwrap();

    // 49 pings ~230 m apart: all kept, so the route is batched
    let reconstruction = &overview.actual_path;
    assert_eq!(reconstruction.waypoint_count, 49);
    assert_eq!(reconstruction.batches.len(), 12);
    assert!(reconstruction.batches.iter().all(|b| !b.is_routed()));
    assert_eq!(
        reconstruction.source,
        PathSource::Degraded {
            fallback_batches: 12
        }
    );

    // Straight lines through the waypoints, which here are the raw pings
    let raw: Vec<Coordinate> = day_trace().iter().map(Observation::coordinate).collect();
    assert_eq!(reconstruction.path.coordinates, raw);
    assert_eq!(tracker.reconstructor().service().calls.load(Ordering::SeqCst), 12);

    // Verification is unaffected by routing
    assert_eq!(overview.verified_count(), 2);
}

#[tokio::test]
async fn test_routed_batches_join_without_duplicates() {
    let config = ReconstructionConfig {
        batch_delay_ms: 0,
        ..Default::default()
    };
    let tracker = RouteTracker::new(
        seeded_store().await,
        CountingRouting::new(false),
        config,
        VerificationConfig::default(),
    )
    .unwrap();
    let overview = tracker.overview("worker-1", day(), "route-1").await.unwrap();
    let reconstruction = &overview.actual_path;

    assert_eq!(reconstruction.source, PathSource::Routed);
    for pair in reconstruction.path.coordinates.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }

    // 12 batches of up to 5 waypoints, 2 points per gap plus 1: each join drops one
    let naive: usize = reconstruction
        .batches
        .iter()
        .map(|b| match b {
            route_tracker::BatchOutcome::Routed { geometry_len, .. } => *geometry_len,
            _ => 0,
        })
        .sum();
    assert_eq!(reconstruction.path.len(), naive - (reconstruction.batches.len() - 1));
    assert_eq!(reconstruction.path.len(), 97);
}

#[tokio::test]
async fn test_generated_day_is_fully_verified() {
    let origin = Coordinate::new(-6.2088, 106.8456);
    let stops = vec![
        PlannedStop::new("d1", "c1", -6.1900, 106.8700, 1),
        PlannedStop::new("d2", "c2", -6.2300, 106.8200, 2),
        PlannedStop::new("d3", "c3", -6.2600, 106.8600, 3),
        PlannedStop::new("d4", "c4", -6.1750, 106.8250, 4),
    ];
    let mut rng = StdRng::seed_from_u64(2024);
    let trace = generate_day_trace(origin, &stops, at(9, 0), at(17, 0), &SyntheticConfig::default(), &mut rng);

    let store = InMemoryStore::new();
    store.record_observations("worker-2", trace.clone()).await;
    store.set_route("route-2", stops).await;

    let tracker = RouteTracker::from_config(store, OfflineRouting, &TrackerConfig::default()).unwrap();
    let overview = tracker.overview("worker-2", day(), "route-2").await.unwrap();

    assert_eq!(overview.observation_count, trace.len());
    assert_eq!(overview.verified_count(), 4);
    assert_eq!(overview.actual_path.path.len(), trace.len());
    assert!(overview.bounds.is_some());
}
