//! Compare sequential and parallel verification on a large route.
//!
//! Run with: cargo run --release --example parallel_verification --features parallel

use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use route_tracker::{
    generate_day_trace, verify_visits, verify_visits_parallel, Coordinate, PlannedStop, SyntheticConfig,
    VerificationConfig,
};
use std::time::Instant;

fn main() -> route_tracker::Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let depot = Coordinate::new(-6.2088, 106.8456);

    let stops: Vec<PlannedStop> = (1..=400)
        .map(|i| {
            PlannedStop::new(
                format!("delivery-{}", i),
                format!("customer-{}", i),
                depot.latitude + rng.gen_range(-0.15..0.15),
                depot.longitude + rng.gen_range(-0.15..0.15),
                i,
            )
        })
        .collect();

    let start = Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 5, 6, 20, 0, 0).unwrap();
    // Trace visits every other stop
    let visited: Vec<PlannedStop> = stops.iter().step_by(2).cloned().collect();
    let trace = generate_day_trace(depot, &visited, start, end, &SyntheticConfig::default(), &mut rng);

    println!("{} stops, {} observations\n", stops.len(), trace.len());

    let config = VerificationConfig::default();

    let t = Instant::now();
    let sequential = verify_visits(&stops, &trace, &config)?;
    let sequential_time = t.elapsed();

    let t = Instant::now();
    let parallel = verify_visits_parallel(&stops, &trace, &config)?;
    let parallel_time = t.elapsed();

    assert_eq!(sequential, parallel);

    let verified = parallel.iter().filter(|v| v.verified).count();
    println!("Verified: {}/{}", verified, stops.len());
    println!("Sequential: {:?}", sequential_time);
    println!("Parallel:   {:?}", parallel_time);
    println!(
        "Speedup:    {:.1}x",
        sequential_time.as_secs_f64() / parallel_time.as_secs_f64().max(f64::EPSILON)
    );

    Ok(())
}
