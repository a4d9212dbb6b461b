//! Dispatch coordinator: owns the driver registry, the pending queue, the active
//! strategy and the surge signal.
//!
//! Every operation runs under one coordinator lock. The coordinator may call into
//! a worker while holding it; workers call back through [`TripReporter`] without
//! holding their own lock. Joining a worker thread always happens with the
//! coordinator lock released, since the worker may be waiting on it to report.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::config::DispatchConfig;
use crate::driver::{AssignedTrip, DriverWorker, TripReporter};
use crate::error::DispatchError;
use crate::graph::WeightedGraph;
use crate::order::{DriverId, NodeId, Order, OrderId, OrderStatus};
use crate::pricing::SurgeState;
use crate::strategy::{Assignment, AssignmentStrategy, DriverSnapshot};
use crate::telemetry::{CompletedTripRecord, DispatchTelemetry};

/// Receives surge multiplier changes.
///
/// Called synchronously while the coordinator lock is held: implementations must
/// not call back into the coordinator.
pub trait SurgeObserver: Send + Sync {
    fn on_surge_update(&self, multiplier: f64);
}

impl<F> SurgeObserver for F
where
    F: Fn(f64) + Send + Sync,
{
    fn on_surge_update(&self, multiplier: f64) {
        self(multiplier)
    }
}

/// Observer that writes every surge update to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSurgeObserver;

impl SurgeObserver for LoggingSurgeObserver {
    fn on_surge_update(&self, multiplier: f64) {
        tracing::info!(multiplier, "Surge multiplier now: x{:.3}", multiplier);
    }
}

/// An assigned order kept until it completes or returns to the queue, so a
/// requeue restores the original route and fare.
#[derive(Debug, Clone)]
struct InFlightOrder {
    order: Order,
    driver_id: DriverId,
    assigned_at: SystemTime,
    surge_multiplier: f64,
}

/// Final statuses of recently resolved orders. Once more than `capacity` are
/// held, the oldest are forgotten.
struct ResolvedHistory {
    capacity: usize,
    statuses: HashMap<OrderId, (OrderStatus, u64)>,
    arrivals: VecDeque<(OrderId, u64)>,
    next_seq: u64,
}

impl ResolvedHistory {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            statuses: HashMap::new(),
            arrivals: VecDeque::new(),
            next_seq: 0,
        }
    }

    fn is_current(&self, order_id: OrderId, seq: u64) -> bool {
        self.statuses
            .get(&order_id)
            .is_some_and(|&(_, current)| current == seq)
    }

    fn insert(&mut self, order_id: OrderId, status: OrderStatus) {
        if self.capacity == 0 {
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.statuses.insert(order_id, (status, seq));
        self.arrivals.push_back((order_id, seq));

        while self.statuses.len() > self.capacity {
            let Some((oldest, seq)) = self.arrivals.pop_front() else {
                break;
            };
            if self.is_current(oldest, seq) {
                self.statuses.remove(&oldest);
            }
        }
        // Drop arrivals superseded by a resubmission or a later resolution.
        if self.arrivals.len() > self.capacity.saturating_mul(2) {
            let mut arrivals = std::mem::take(&mut self.arrivals);
            arrivals.retain(|&(order_id, seq)| self.is_current(order_id, seq));
            self.arrivals = arrivals;
        }
    }

    fn forget(&mut self, order_id: OrderId) {
        self.statuses.remove(&order_id);
    }

    fn get(&self, order_id: OrderId) -> Option<OrderStatus> {
        self.statuses.get(&order_id).map(|&(status, _)| status)
    }
}

struct DispatchState {
    drivers: BTreeMap<DriverId, Arc<DriverWorker>>,
    pending: Vec<Order>,
    in_flight: HashMap<OrderId, InFlightOrder>,
    resolved: ResolvedHistory,
    strategy: Option<Arc<dyn AssignmentStrategy>>,
    observers: Vec<Arc<dyn SurgeObserver>>,
    surge: SurgeState,
    telemetry: DispatchTelemetry,
}

impl DispatchState {
    fn recompute_surge(&mut self) {
        let Some(multiplier) = self.surge.recompute(self.pending.len(), self.drivers.len())
        else {
            return;
        };
        self.telemetry.surge_notifications += 1;
        for observer in &self.observers {
            observer.on_surge_update(multiplier);
        }
        tracing::info!(multiplier, "Surge updated: x{:.3}", multiplier);
    }

    /// Whether `order_id` is in flight on `driver_id`. Reports that fail this
    /// are stale or misdirected and must not touch the order.
    fn is_in_flight_on(&self, order_id: OrderId, driver_id: DriverId) -> bool {
        match self.in_flight.get(&order_id) {
            Some(in_flight) if in_flight.driver_id == driver_id => true,
            Some(in_flight) => {
                tracing::warn!(
                    order_id,
                    driver_id,
                    assigned_driver = in_flight.driver_id,
                    "Order {} is assigned to Driver {}, report from Driver {} ignored",
                    order_id,
                    in_flight.driver_id,
                    driver_id
                );
                false
            }
            None => {
                tracing::warn!(order_id, driver_id, "Order {} is not in flight", order_id);
                false
            }
        }
    }

    fn is_tracked(&self, order_id: OrderId) -> bool {
        self.in_flight.contains_key(&order_id)
            || self.pending.iter().any(|order| order.id == order_id)
    }

    fn enqueue(&mut self, mut order: Order) {
        order.status = OrderStatus::Queued;
        self.resolved.forget(order.id);
        self.pending.push(order);
    }

    fn track_assignment(&mut self, order: Order, driver_id: DriverId) {
        let surge_multiplier = self.surge.current();
        self.telemetry.orders_dispatched += 1;
        self.in_flight.insert(
            order.id,
            InFlightOrder {
                order,
                driver_id,
                assigned_at: SystemTime::now(),
                surge_multiplier,
            },
        );
    }

    /// Remove registered drivers whose loop was stopped through their own handle
    /// and requeue the tasks they still hold. The removed handles are returned so
    /// they are dropped only after the coordinator lock is released.
    fn evict_stopped(&mut self) -> Vec<Arc<DriverWorker>> {
        let stopped: Vec<DriverId> = self
            .drivers
            .values()
            .filter(|driver| !driver.is_active())
            .map(|driver| driver.id())
            .collect();
        let mut evicted = Vec::with_capacity(stopped.len());
        for driver_id in stopped {
            if let Some(driver) = self.drivers.remove(&driver_id) {
                tracing::warn!(
                    driver_id,
                    "Driver {} was stopped while registered, removed",
                    driver_id
                );
                self.readmit(driver.drain_pending());
                evicted.push(driver);
            }
        }
        if !evicted.is_empty() {
            self.recompute_surge();
        }
        evicted
    }

    /// Return orders left on a stopped worker to the pending queue.
    fn readmit(&mut self, leftovers: Vec<Order>) {
        for order in leftovers {
            let order = self
                .in_flight
                .remove(&order.id)
                .map(|in_flight| in_flight.order)
                .unwrap_or(order);
            tracing::info!(order_id = order.id, "Order {} requeued", order.id);
            self.enqueue(order);
        }
    }
}

struct CoordinatorInner {
    config: DispatchConfig,
    state: Mutex<DispatchState>,
}

/// Shared handle to a dispatch coordinator. Clones refer to the same instance.
#[derive(Clone)]
pub struct DispatchCoordinator {
    inner: Arc<CoordinatorInner>,
}

/// Reporter handed to workers; holds the coordinator weakly so drivers do not
/// keep it alive.
struct CoordinatorReporter {
    inner: Weak<CoordinatorInner>,
}

impl CoordinatorReporter {
    fn coordinator(&self) -> Option<DispatchCoordinator> {
        self.inner
            .upgrade()
            .map(|inner| DispatchCoordinator { inner })
    }
}

impl TripReporter for CoordinatorReporter {
    fn trip_started(&self, order_id: OrderId, driver_id: DriverId) {
        if let Some(coordinator) = self.coordinator() {
            coordinator.report_trip_started(order_id, driver_id);
        }
    }

    fn trip_completed(&self, order_id: OrderId, driver_id: DriverId, rating: u8) {
        if let Some(coordinator) = self.coordinator() {
            coordinator.report_completion(order_id, driver_id, rating);
        }
    }

    fn trip_cancelled(&self, order_id: OrderId, driver_id: DriverId) {
        if let Some(coordinator) = self.coordinator() {
            coordinator.report_cancellation(order_id, driver_id);
        }
    }
}

impl Default for DispatchCoordinator {
    fn default() -> Self {
        Self::from_validated(DispatchConfig::default())
    }
}

impl DispatchCoordinator {
    pub fn new(config: DispatchConfig) -> Result<Self, DispatchError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: DispatchConfig) -> Self {
        let surge = SurgeState::new(config.surge);
        let resolved = ResolvedHistory::new(config.status_history);
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                state: Mutex::new(DispatchState {
                    drivers: BTreeMap::new(),
                    pending: Vec::new(),
                    in_flight: HashMap::new(),
                    resolved,
                    strategy: None,
                    observers: Vec::new(),
                    surge,
                    telemetry: DispatchTelemetry::default(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// Callback handle for workers created outside [`Self::spawn_driver`].
    pub fn reporter(&self) -> Arc<dyn TripReporter> {
        Arc::new(CoordinatorReporter {
            inner: Arc::downgrade(&self.inner),
        })
    }

    /// Create a worker wired to this coordinator and register it.
    pub fn spawn_driver(
        &self,
        driver_id: DriverId,
        location: NodeId,
    ) -> Result<Arc<DriverWorker>, DispatchError> {
        let driver = Arc::new(DriverWorker::new(
            driver_id,
            location,
            self.inner.config.worker.clone(),
            self.reporter(),
        ));
        self.register_driver(Arc::clone(&driver))?;
        Ok(driver)
    }

    /// Add a driver to the registry and start its loop.
    pub fn register_driver(&self, driver: Arc<DriverWorker>) -> Result<(), DispatchError> {
        let mut state = self.inner.state.lock();
        let driver_id = driver.id();
        if state.drivers.contains_key(&driver_id) {
            tracing::warn!(driver_id, "Driver {} is already registered", driver_id);
            return Err(DispatchError::DuplicateDriver { driver_id });
        }
        driver.start()?;
        state.drivers.insert(driver_id, driver);
        tracing::info!(driver_id, "Registered Driver {}", driver_id);
        state.recompute_surge();
        Ok(())
    }

    /// Remove a driver and block until its loop has exited. Orders still queued
    /// on it return to the pending queue. Returns `false` if the id is unknown.
    pub fn unregister_driver(&self, driver_id: DriverId) -> bool {
        let driver = {
            let mut state = self.inner.state.lock();
            let Some(driver) = state.drivers.remove(&driver_id) else {
                return false;
            };
            state.recompute_surge();
            driver
        };

        driver.stop();
        let leftovers = driver.drain_pending();

        let mut state = self.inner.state.lock();
        if !leftovers.is_empty() {
            state.readmit(leftovers);
            state.recompute_surge();
        }
        tracing::info!(driver_id, "Unregistered Driver {}", driver_id);
        true
    }

    /// Unregister every driver.
    pub fn shutdown(&self) {
        let drivers: Vec<Arc<DriverWorker>> = {
            let mut state = self.inner.state.lock();
            let drivers = std::mem::take(&mut state.drivers);
            state.recompute_surge();
            drivers.into_values().collect()
        };

        let mut leftovers = Vec::new();
        for driver in &drivers {
            driver.stop();
            leftovers.extend(driver.drain_pending());
        }

        let mut state = self.inner.state.lock();
        if !leftovers.is_empty() {
            state.readmit(leftovers);
            state.recompute_surge();
        }
        tracing::info!(drivers = drivers.len(), "Dispatcher shut down");
    }

    /// Queue an order for the next dispatch pass.
    pub fn submit_order(&self, order: Order) -> Result<(), DispatchError> {
        let mut state = self.inner.state.lock();
        if state.is_tracked(order.id) {
            tracing::warn!(order_id = order.id, "Order {} is already queued or in flight", order.id);
            return Err(DispatchError::DuplicateOrder { order_id: order.id });
        }
        tracing::info!(order_id = order.id, "Order queued {}", order.id);
        state.telemetry.orders_submitted += 1;
        state.enqueue(order);
        state.recompute_surge();
        Ok(())
    }

    /// Passenger cancellation of a still-pending order. Returns `false` if the
    /// order is not pending (unknown, or already assigned).
    pub fn cancel_order(&self, order_id: OrderId) -> bool {
        let mut state = self.inner.state.lock();
        let Some(position) = state.pending.iter().position(|order| order.id == order_id) else {
            tracing::info!(
                order_id,
                "Order {} not found in queue for cancellation",
                order_id
            );
            return false;
        };
        let mut order = state.pending.remove(position);
        order.status = OrderStatus::Cancelled;
        state.resolved.insert(order_id, OrderStatus::Cancelled);
        state.telemetry.passenger_cancellations += 1;
        tracing::info!(order_id, "Passenger cancelled Order {}", order_id);
        state.recompute_surge();
        true
    }

    /// Worker callback: the driver reached pickup.
    pub fn report_trip_started(&self, order_id: OrderId, driver_id: DriverId) {
        let mut state = self.inner.state.lock();
        if !state.is_in_flight_on(order_id, driver_id) {
            return;
        }
        if let Some(in_flight) = state.in_flight.get_mut(&order_id) {
            in_flight.order.status = OrderStatus::InProgress;
            tracing::debug!(order_id, driver_id, "Order {} in progress", order_id);
        }
    }

    /// Worker callback: the driver gave the order back. The order returns to the
    /// pending queue with its original route and fare.
    pub fn report_cancellation(&self, order_id: OrderId, driver_id: DriverId) {
        let mut state = self.inner.state.lock();
        tracing::info!(
            order_id,
            driver_id,
            "Dispatcher received cancellation for Order {} from Driver {}",
            order_id,
            driver_id
        );
        if !state.is_in_flight_on(order_id, driver_id) {
            return;
        }
        let Some(in_flight) = state.in_flight.remove(&order_id) else {
            return;
        };
        state.telemetry.driver_cancellations += 1;
        state.enqueue(in_flight.order);
        state.recompute_surge();
    }

    /// Worker callback: the order was delivered and rated.
    pub fn report_completion(&self, order_id: OrderId, driver_id: DriverId, rating: u8) {
        let mut state = self.inner.state.lock();
        tracing::info!(
            order_id,
            driver_id,
            rating,
            "Order {} completed by Driver {}. Rating={}",
            order_id,
            driver_id,
            rating
        );
        if !state.is_in_flight_on(order_id, driver_id) {
            return;
        }
        let Some(in_flight) = state.in_flight.remove(&order_id) else {
            return;
        };
        state.telemetry.completed_trips.push(CompletedTripRecord {
            order_id,
            driver_id,
            rating,
            base_fare: in_flight.order.fare,
            surge_multiplier: in_flight.surge_multiplier,
            created_at: in_flight.order.created_at,
            assigned_at: in_flight.assigned_at,
            completed_at: SystemTime::now(),
        });
        state.resolved.insert(order_id, OrderStatus::Completed);
        if let Some(driver) = state.drivers.get(&driver_id) {
            driver.add_rating(rating);
        }
        state.recompute_surge();
    }

    pub fn set_strategy(&self, strategy: Arc<dyn AssignmentStrategy>) {
        let mut state = self.inner.state.lock();
        tracing::info!(strategy = strategy.name(), "Strategy updated.");
        state.strategy = Some(strategy);
    }

    pub fn clear_strategy(&self) {
        self.inner.state.lock().strategy = None;
        tracing::info!("Strategy cleared.");
    }

    pub fn strategy_name(&self) -> Option<&'static str> {
        self.inner
            .state
            .lock()
            .strategy
            .as_ref()
            .map(|strategy| strategy.name())
    }

    pub fn add_observer(&self, observer: Arc<dyn SurgeObserver>) {
        self.inner.state.lock().observers.push(observer);
    }

    /// Run the active strategy over the pending queue and hand the resulting
    /// matches to drivers. Returns the number of orders assigned.
    pub fn run_dispatch_pass(&self, graph: &Arc<WeightedGraph>) -> usize {
        let mut evicted = Vec::new();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        evicted.extend(state.evict_stopped());
        let Some(strategy) = state.strategy.clone() else {
            return 0;
        };
        if state.pending.is_empty() || state.drivers.is_empty() {
            return 0;
        }

        let drivers: Vec<Arc<DriverWorker>> = state.drivers.values().cloned().collect();
        let snapshots: Vec<DriverSnapshot> = drivers.iter().map(|driver| driver.snapshot()).collect();
        let assignments = strategy.assign(&state.pending, &snapshots, graph);

        let mut dispatched = 0;
        for Assignment {
            order_id,
            driver_index,
        } in assignments
        {
            let Some(driver) = drivers.get(driver_index) else {
                tracing::warn!(order_id, driver_index, "Assignment names no driver, skipped");
                continue;
            };
            let Some(position) = state.pending.iter().position(|order| order.id == order_id)
            else {
                continue;
            };

            let mut order = state.pending.remove(position);
            order.status = OrderStatus::Assigned;
            match driver.assign_task(AssignedTrip::new(order.clone(), Arc::clone(graph))) {
                Ok(()) => {
                    tracing::info!(
                        order_id,
                        driver_id = driver.id(),
                        "Assigned Order {} -> Driver {}",
                        order_id,
                        driver.id()
                    );
                    state.track_assignment(order, driver.id());
                    dispatched += 1;
                }
                Err(err) => {
                    tracing::warn!(order_id, driver_id = driver.id(), %err, "Hand-off failed");
                    order.status = OrderStatus::Queued;
                    state.pending.insert(position, order);
                    evicted.extend(state.evict_stopped());
                }
            }
        }

        state.recompute_surge();
        dispatched
    }

    /// Hand `order` straight to a registered driver, bypassing the strategy.
    /// A pending order with the same id is taken out of the queue.
    pub fn assign_order(
        &self,
        driver_id: DriverId,
        mut order: Order,
        graph: &Arc<WeightedGraph>,
    ) -> Result<(), DispatchError> {
        let mut evicted = Vec::new();
        let mut state = self.inner.state.lock();
        let Some(driver) = state.drivers.get(&driver_id).cloned() else {
            return Err(DispatchError::UnknownDriver { driver_id });
        };
        if state.in_flight.contains_key(&order.id) {
            return Err(DispatchError::DuplicateOrder { order_id: order.id });
        }

        order.status = OrderStatus::Assigned;
        if let Err(err) = driver.assign_task(AssignedTrip::new(order.clone(), Arc::clone(graph))) {
            evicted.extend(state.evict_stopped());
            return Err(err);
        }
        tracing::info!(
            order_id = order.id,
            driver_id,
            "Assigned Order {} -> Driver {}",
            order.id,
            driver_id
        );
        state.pending.retain(|pending| pending.id != order.id);
        state.resolved.forget(order.id);
        state.track_assignment(order, driver_id);
        state.recompute_surge();
        Ok(())
    }

    /// Ask a driver to give back the task queued behind its current trip. The
    /// coordinator lock is not held while the driver reports back.
    pub fn request_driver_cancel(&self, driver_id: DriverId) -> Option<OrderId> {
        let driver = self.driver(driver_id)?;
        driver.request_cancel_current()
    }

    pub fn driver(&self, driver_id: DriverId) -> Option<Arc<DriverWorker>> {
        self.inner.state.lock().drivers.get(&driver_id).cloned()
    }

    /// Registered driver ids in ascending order.
    pub fn driver_ids(&self) -> Vec<DriverId> {
        self.inner.state.lock().drivers.keys().copied().collect()
    }

    pub fn driver_count(&self) -> usize {
        self.inner.state.lock().drivers.len()
    }

    /// Pending orders in queue order.
    pub fn pending_orders(&self) -> Vec<Order> {
        self.inner.state.lock().pending.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }

    pub fn surge_multiplier(&self) -> f64 {
        self.inner.state.lock().surge.current()
    }

    /// Status of a pending or in-flight order, or of one of the last
    /// `status_history` orders to complete or be cancelled.
    pub fn order_status(&self, order_id: OrderId) -> Option<OrderStatus> {
        let state = self.inner.state.lock();
        if let Some(order) = state.pending.iter().find(|order| order.id == order_id) {
            return Some(order.status);
        }
        if let Some(in_flight) = state.in_flight.get(&order_id) {
            return Some(in_flight.order.status);
        }
        state.resolved.get(order_id)
    }

    pub fn telemetry(&self) -> DispatchTelemetry {
        self.inner.state.lock().telemetry.clone()
    }
}
