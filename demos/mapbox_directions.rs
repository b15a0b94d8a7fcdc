//! Reconstruct a day's path against the Mapbox Directions API.
//!
//! Run with: MAPBOX_ACCESS_TOKEN=pk... RUST_LOG=info cargo run --example mapbox_directions --features http
//!
//! Without a token the reconstructor falls back to straight lines.

use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use route_tracker::{
    generate_day_trace, BatchOutcome, Coordinate, MapboxDirections, PlannedStop, RoadPathReconstructor,
    ReconstructionConfig, RoutingConfig, SyntheticConfig,
};

#[tokio::main]
async fn main() -> route_tracker::Result<()> {
    env_logger::init();

    let mut routing = RoutingConfig::default();
    if let Ok(token) = std::env::var("MAPBOX_ACCESS_TOKEN") {
        routing = routing.with_access_token(token);
    }
    println!("Routing config: {:?}\n", routing);

    let depot = Coordinate::new(-6.2088, 106.8456);
    let stops = vec![
        PlannedStop::new("delivery-1", "customer-1", -6.1900, 106.8700, 1),
        PlannedStop::new("delivery-2", "customer-2", -6.2300, 106.8200, 2),
        PlannedStop::new("delivery-3", "customer-3", -6.2600, 106.8600, 3),
    ];
    let start = Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 5, 6, 17, 0, 0).unwrap();
    let trace = generate_day_trace(
        depot,
        &stops,
        start,
        end,
        &SyntheticConfig::default(),
        &mut StdRng::seed_from_u64(11),
    );

    let reconstructor = RoadPathReconstructor::new(MapboxDirections::new(routing)?, ReconstructionConfig::default())?;
    let result = reconstructor.reconstruct(&trace).await;

    println!(
        "{} observations -> {} waypoints -> {} path points ({:?})",
        trace.len(),
        result.waypoint_count,
        result.path.len(),
        result.source
    );

    for batch in &result.batches {
        match batch {
            BatchOutcome::Routed {
                index,
                waypoint_count,
                distance_meters,
                duration_seconds,
                ..
            } => println!(
                "  batch {:>2}: {} waypoints, {:.1} km, {:.0} min",
                index,
                waypoint_count,
                distance_meters / 1000.0,
                duration_seconds / 60.0
            ),
            BatchOutcome::Fallback {
                index,
                waypoint_count,
                reason,
            } => println!("  batch {:>2}: {} waypoints, straight lines ({})", index, waypoint_count, reason),
        }
    }

    Ok(())
}
