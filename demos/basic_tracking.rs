//! Track one generated work-day without a routing service.
//!
//! Run with: RUST_LOG=debug cargo run --example basic_tracking

use chrono::{NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use route_tracker::{
    generate_day_trace, Coordinate, DeliveryStatus, InMemoryStore, OfflineRouting, PlannedStop, RouteTracker,
    SyntheticConfig, TrackerConfig,
};

#[tokio::main]
async fn main() -> route_tracker::Result<()> {
    env_logger::init();

    // Depot and four customers (Jakarta)
    let depot = Coordinate::new(-6.2088, 106.8456);
    let stops = vec![
        PlannedStop::new("delivery-1", "Toko Sinar Jaya", -6.1900, 106.8700, 1).with_status(DeliveryStatus::Delivered),
        PlannedStop::new("delivery-2", "Warung Bu Sri", -6.2300, 106.8200, 2).with_status(DeliveryStatus::Delivered),
        PlannedStop::new("delivery-3", "Apotek Sehat", -6.2600, 106.8600, 3),
        PlannedStop::new("delivery-4", "Minimarket 24", -6.1750, 106.8250, 4),
    ];

    let start = Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 5, 6, 17, 0, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    // Visit only the first three customers
    let trace = generate_day_trace(depot, &stops[..3], start, end, &SyntheticConfig::default(), &mut rng);

    let store = InMemoryStore::new();
    store.record_observations("worker-1", trace).await;
    store.set_route("route-1", stops).await;

    let config = TrackerConfig::from_json(r#"{ "verification": { "proximity_threshold_meters": 200.0 } }"#)?;
    let tracker = RouteTracker::from_config(store, OfflineRouting, &config)?;

    let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    let overview = tracker.overview("worker-1", date, "route-1").await?;

    println!("Route overview for {} on {}\n", overview.worker_id, overview.date);
    println!(
        "Progress: {}/{} delivered ({:.0}%)",
        overview.progress.delivered, overview.progress.total, overview.progress.percent
    );
    println!(
        "Actual path: {} points, {:.2} km ({:?})",
        overview.actual_path.path.len(),
        overview.actual_path.path.length_meters() / 1000.0,
        overview.actual_path.source
    );
    println!(
        "Planned path: {} points, {:.2} km\n",
        overview.planned_path.len(),
        overview.planned_path.length_meters() / 1000.0
    );

    for check in &overview.verifications {
        println!(
            "  {} {:<12} nearest {:>8.0} m",
            if check.verified { "✓" } else { "✗" },
            check.stop_id,
            check.nearest_distance_meters
        );
    }

    if let Some(center) = overview.center {
        println!("\nMap center: {:.5}, {:.5}", center.latitude, center.longitude);
    }

    Ok(())
}
