//! Three drivers on a six-node city, three dispatch waves with a strategy swap
//! before each, one passenger cancellation and one driver cancellation.
//!
//! Run with: cargo run -p dispatch_core --example scenario_run
//! Set RUST_LOG=debug for per-trip detail.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dispatch_core::order::Order;
use dispatch_core::strategy::StrategyKind;
use dispatch_core::{
    DispatchConfig, DispatchCoordinator, DispatchError, LoggingSurgeObserver, WeightedGraph,
};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<(), DispatchError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(env_filter).try_init();

    let graph = Arc::new(WeightedGraph::from_edges(
        6,
        &[(0, 1, 5), (1, 2, 3), (2, 3, 4), (1, 4, 2), (4, 5, 6)],
    ));
    let coordinator = DispatchCoordinator::new(DispatchConfig::default())?;
    coordinator.spawn_driver(401, 0)?;
    let second = coordinator.spawn_driver(402, 3)?;
    coordinator.spawn_driver(403, 5)?;
    coordinator.add_observer(Arc::new(LoggingSurgeObserver));

    coordinator.set_strategy(StrategyKind::NearestDistance.build());
    coordinator.submit_order(Order::new(5001, 4, 5, 12.0))?;
    coordinator.submit_order(Order::new(5002, 2, 3, 8.0))?;
    coordinator.submit_order(Order::new(5003, 1, 5, 10.0))?;
    coordinator.run_dispatch_pass(&graph);
    thread::sleep(Duration::from_secs(4));

    // More demand than drivers
    coordinator.submit_order(Order::new(6001, 0, 2, 9.0))?;
    coordinator.submit_order(Order::new(6002, 2, 5, 11.0))?;
    coordinator.submit_order(Order::new(6003, 3, 0, 7.0))?;
    coordinator.submit_order(Order::new(6004, 1, 4, 6.0))?;
    coordinator.set_strategy(StrategyKind::LoadBalanced.build());
    coordinator.run_dispatch_pass(&graph);
    thread::sleep(Duration::from_secs(2));

    coordinator.cancel_order(6003);
    thread::sleep(Duration::from_secs(2));

    second.request_cancel_current();
    thread::sleep(Duration::from_secs(6));

    coordinator.set_strategy(StrategyKind::RatingPriority.build());
    coordinator.submit_order(Order::new(7001, 2, 0, 10.0))?;
    coordinator.submit_order(Order::new(7002, 5, 1, 9.0))?;
    coordinator.run_dispatch_pass(&graph);
    thread::sleep(Duration::from_secs(6));

    // Anything requeued by driver cancellations goes out in a last pass.
    coordinator.run_dispatch_pass(&graph);
    thread::sleep(Duration::from_secs(4));
    coordinator.shutdown();

    let telemetry = coordinator.telemetry();
    println!("--- Scenario run (3 drivers, 9 orders) ---");
    println!("Orders submitted: {}", telemetry.orders_submitted);
    println!("Assignments made: {}", telemetry.orders_dispatched);
    println!("Completed trips: {}", telemetry.completed_count());
    println!("Passenger cancellations: {}", telemetry.passenger_cancellations);
    println!("Driver cancellations: {}", telemetry.driver_cancellations);
    println!("Surge notifications: {}", telemetry.surge_notifications);
    println!("Gross fares: {:.2}", telemetry.gross_fares());
    for record in &telemetry.completed_trips {
        println!(
            "  order={} driver={} rating={} fare={:.2} x{:.3}  time_to_assign={} ms  time_to_complete={} ms",
            record.order_id,
            record.driver_id,
            record.rating,
            record.base_fare,
            record.surge_multiplier,
            record.time_to_assign().as_millis(),
            record.time_to_complete().as_millis(),
        );
    }
    let unserved = coordinator.pending_orders();
    if !unserved.is_empty() {
        println!("Still pending: {:?}", unserved.iter().map(|order| order.id).collect::<Vec<_>>());
    }
    Ok(())
}
