mod support;

use std::sync::Arc;

use dispatch_core::driver::{AssignedTrip, TripPhase};
use dispatch_core::error::DispatchError;
use dispatch_core::graph::WeightedGraph;
use dispatch_core::order::{Order, OrderStatus};
use dispatch_core::strategy::StrategyKind;
use dispatch_core::test_helpers::slow_worker_config;
use support::coordinator::{wait_until, TestCoordinatorBuilder, WAIT};

fn line_graph() -> Arc<WeightedGraph> {
    Arc::new(WeightedGraph::from_edges(
        4,
        &[(0, 1, 1), (1, 2, 1), (2, 3, 1)],
    ))
}

#[test]
fn unregistered_driver_rejects_new_work() {
    let graph = line_graph();
    let coordinator = TestCoordinatorBuilder::new().with_driver(1, 0).build();
    let driver = coordinator.driver(1).expect("driver");
    assert!(driver.is_active());

    assert!(coordinator.unregister_driver(1));
    assert!(!driver.is_active());
    assert!(!coordinator.unregister_driver(1));
    assert_eq!(coordinator.driver_count(), 0);

    assert!(matches!(
        coordinator.assign_order(1, Order::new(1, 0, 1, 5.0), &graph),
        Err(DispatchError::UnknownDriver { driver_id: 1 })
    ));
    assert!(matches!(
        driver.assign_task(AssignedTrip::new(Order::new(2, 0, 1, 5.0), Arc::clone(&graph))),
        Err(DispatchError::WorkerStopped { driver_id: 1 })
    ));
    assert!(matches!(
        driver.start(),
        Err(DispatchError::WorkerStopped { driver_id: 1 })
    ));
}

#[test]
fn unregister_requeues_current_and_queued_orders_in_order() {
    let graph = line_graph();
    let coordinator = TestCoordinatorBuilder::new()
        .with_worker(slow_worker_config())
        .with_driver(1, 0)
        .build();
    let driver = coordinator.driver(1).expect("driver");

    for (id, fare) in [(10, 11.0), (20, 21.0), (30, 31.0)] {
        coordinator
            .assign_order(1, Order::new(id, 2, 3, fare), &graph)
            .expect("assign");
    }
    assert!(wait_until(WAIT, || {
        driver.current_order() == Some(10) && driver.pending_count() == 2
    }));
    assert_eq!(driver.trip_phase(), TripPhase::EnRoutePickup);
    assert_eq!(coordinator.in_flight_count(), 3);

    assert!(coordinator.unregister_driver(1));

    let pending = coordinator.pending_orders();
    let ids: Vec<u64> = pending.iter().map(|order| order.id).collect();
    assert_eq!(ids, vec![10, 20, 30]);
    for order in &pending {
        assert_eq!(order.status, OrderStatus::Queued);
        assert_eq!((order.pickup, order.dropoff), (2, 3));
        assert_eq!(order.fare, order.id as f64 + 1.0);
    }
    assert_eq!(coordinator.in_flight_count(), 0);
    assert_eq!(driver.location(), 0);
}

#[test]
fn shutdown_stops_every_driver_and_keeps_orders() {
    let graph = line_graph();
    let coordinator = TestCoordinatorBuilder::new()
        .with_worker(slow_worker_config())
        .with_driver(1, 0)
        .with_driver(2, 3)
        .build();
    let drivers = [
        coordinator.driver(1).expect("driver 1"),
        coordinator.driver(2).expect("driver 2"),
    ];

    coordinator.assign_order(1, Order::new(1, 1, 2, 5.0), &graph).expect("assign");
    coordinator.assign_order(2, Order::new(2, 2, 1, 5.0), &graph).expect("assign");
    coordinator.submit_order(Order::new(3, 0, 3, 5.0)).expect("submit");
    assert!(wait_until(WAIT, || drivers.iter().all(|driver| driver.is_busy())));

    coordinator.shutdown();

    assert_eq!(coordinator.driver_count(), 0);
    assert!(drivers.iter().all(|driver| !driver.is_active()));
    assert_eq!(coordinator.in_flight_count(), 0);
    let mut ids: Vec<u64> = coordinator.pending_orders().iter().map(|order| order.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(coordinator.surge_multiplier(), 1.0);
}

#[test]
fn driver_cancel_withdraws_queued_task() {
    let graph = line_graph();
    let coordinator = TestCoordinatorBuilder::new()
        .with_worker(slow_worker_config())
        .with_driver(1, 0)
        .with_driver(2, 0)
        .build();
    let driver = coordinator.driver(1).expect("driver");

    assert_eq!(coordinator.request_driver_cancel(1), None);
    assert_eq!(coordinator.request_driver_cancel(99), None);

    coordinator.assign_order(1, Order::new(1, 1, 2, 5.0), &graph).expect("assign");
    coordinator.assign_order(1, Order::new(2, 3, 0, 8.0), &graph).expect("assign");
    assert!(wait_until(WAIT, || {
        driver.current_order() == Some(1) && driver.pending_count() == 1
    }));

    assert_eq!(coordinator.request_driver_cancel(1), Some(2));
    assert_eq!(driver.current_order(), Some(1));
    assert_eq!(driver.pending_count(), 0);
    assert_eq!(coordinator.order_status(1), Some(OrderStatus::Assigned));
    assert_eq!(coordinator.order_status(2), Some(OrderStatus::Queued));
    let pending = coordinator.pending_orders();
    assert_eq!(pending.len(), 1);
    assert_eq!((pending[0].pickup, pending[0].dropoff, pending[0].fare), (3, 0, 8.0));
    assert_eq!(coordinator.telemetry().driver_cancellations, 1);

    coordinator.shutdown();
}

#[test]
fn dropping_coordinator_releases_registered_drivers() {
    let coordinator = TestCoordinatorBuilder::new().with_driver(1, 0).build();
    let driver = coordinator.driver(1).expect("driver");
    assert_eq!(Arc::strong_count(&driver), 2);
    drop(coordinator);
    assert_eq!(Arc::strong_count(&driver), 1);
    assert!(driver.is_active());
    // Dropping the last handle stops and joins the loop.
    drop(driver);
}

#[test]
fn misdirected_cancellation_does_not_hand_order_to_second_driver() {
    let graph = line_graph();
    let coordinator = TestCoordinatorBuilder::new()
        .with_worker(slow_worker_config())
        .with_strategy(StrategyKind::NearestDistance)
        .with_driver(1, 0)
        .with_driver(2, 3)
        .build();
    let owner = coordinator.driver(1).expect("driver 1");
    let other = coordinator.driver(2).expect("driver 2");

    coordinator.assign_order(1, Order::new(5, 2, 3, 9.0), &graph).expect("assign");
    assert!(wait_until(WAIT, || owner.current_order() == Some(5)));

    coordinator.report_cancellation(5, 2);
    assert_eq!(coordinator.run_dispatch_pass(&graph), 0);
    assert_eq!(owner.current_order(), Some(5));
    assert_eq!(other.current_order(), None);
    assert_eq!(other.pending_count(), 0);
    assert_eq!(coordinator.in_flight_count(), 1);
    coordinator.shutdown();
}

#[test]
fn driver_stopped_through_its_handle_is_evicted_on_next_pass() {
    let graph = line_graph();
    let coordinator = TestCoordinatorBuilder::new()
        .with_worker(slow_worker_config())
        .with_driver(1, 0)
        .with_driver(2, 3)
        .build();
    let stopped = coordinator.driver(1).expect("driver 1");
    let survivor = coordinator.driver(2).expect("driver 2");

    coordinator.assign_order(1, Order::new(1, 1, 2, 5.0), &graph).expect("assign");
    coordinator.assign_order(1, Order::new(2, 2, 1, 6.0), &graph).expect("assign");
    assert!(wait_until(WAIT, || {
        stopped.current_order() == Some(1) && stopped.pending_count() == 1
    }));

    // The interrupted trip comes back right away; the queued one stays on the
    // stopped worker until the coordinator notices.
    stopped.stop();
    assert_eq!(coordinator.driver_count(), 2);
    let ids: Vec<u64> = coordinator.pending_orders().iter().map(|order| order.id).collect();
    assert_eq!(ids, vec![1]);

    coordinator.set_strategy(StrategyKind::NearestDistance.build());
    assert_eq!(coordinator.run_dispatch_pass(&graph), 2);
    assert_eq!(coordinator.driver_ids(), vec![2]);
    assert_eq!(stopped.pending_count(), 0);
    assert!(wait_until(WAIT, || {
        survivor.current_order() == Some(1) && survivor.pending_count() == 1
    }));
    assert!(matches!(
        coordinator.assign_order(1, Order::new(3, 0, 1, 5.0), &graph),
        Err(DispatchError::UnknownDriver { driver_id: 1 })
    ));
    coordinator.shutdown();
}

#[test]
fn direct_assignment_to_stopped_driver_evicts_it() {
    let graph = line_graph();
    let coordinator = TestCoordinatorBuilder::new().with_driver(1, 0).build();
    let driver = coordinator.driver(1).expect("driver");
    driver.stop();

    assert!(matches!(
        coordinator.assign_order(1, Order::new(1, 0, 1, 5.0), &graph),
        Err(DispatchError::WorkerStopped { driver_id: 1 })
    ));
    assert_eq!(coordinator.driver_count(), 0);
    assert_eq!(coordinator.in_flight_count(), 0);
}
