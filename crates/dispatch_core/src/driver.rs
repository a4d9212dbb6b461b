//! Driver workers: one thread per driver draining a FIFO task queue.
//!
//! Each worker simulates travel to pickup and dropoff, occasionally abandons a
//! trip after pickup, and reports outcomes through a [`TripReporter`]. The worker
//! never holds its own state lock while calling the reporter, so a reporter may
//! take a lock that is also held while calling [`DriverWorker::assign_task`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::WorkerConfig;
use crate::error::DispatchError;
use crate::graph::WeightedGraph;
use crate::order::{DriverId, NodeId, Order, OrderId};
use crate::strategy::DriverSnapshot;

/// Average reported before a driver has received any rating.
pub const NEUTRAL_RATING: f64 = 5.0;

/// Callbacks a worker uses to report trip outcomes.
pub trait TripReporter: Send + Sync {
    /// The driver reached pickup and the passenger is on board.
    fn trip_started(&self, _order_id: OrderId, _driver_id: DriverId) {}

    fn trip_completed(&self, order_id: OrderId, driver_id: DriverId, rating: u8);

    /// The trip was abandoned or withdrawn and should be offered again.
    fn trip_cancelled(&self, order_id: OrderId, driver_id: DriverId);
}

/// An order handed to a worker, with the graph its travel is measured on.
#[derive(Debug, Clone)]
pub struct AssignedTrip {
    pub order: Order,
    pub graph: Arc<WeightedGraph>,
}

impl AssignedTrip {
    pub fn new(order: Order, graph: Arc<WeightedGraph>) -> Self {
        Self { order, graph }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripPhase {
    Idle,
    EnRoutePickup,
    EnRouteDropoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Ready,
    Running,
    Stopped,
}

struct WorkerState {
    lifecycle: Lifecycle,
    queue: VecDeque<AssignedTrip>,
    current: Option<OrderId>,
    phase: TripPhase,
}

#[derive(Debug, Default, Clone, Copy)]
struct RatingStats {
    sum: u64,
    count: u64,
}

struct DriverShared {
    id: DriverId,
    location: AtomicUsize,
    ratings: Mutex<RatingStats>,
    state: Mutex<WorkerState>,
    wake: Condvar,
    config: WorkerConfig,
    reporter: Arc<dyn TripReporter>,
}

/// Handle to one driver's worker thread and state.
pub struct DriverWorker {
    shared: Arc<DriverShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DriverWorker {
    pub fn new(
        id: DriverId,
        location: NodeId,
        config: WorkerConfig,
        reporter: Arc<dyn TripReporter>,
    ) -> Self {
        Self {
            shared: Arc::new(DriverShared {
                id,
                location: AtomicUsize::new(location),
                ratings: Mutex::new(RatingStats::default()),
                state: Mutex::new(WorkerState {
                    lifecycle: Lifecycle::Ready,
                    queue: VecDeque::new(),
                    current: None,
                    phase: TripPhase::Idle,
                }),
                wake: Condvar::new(),
                config,
                reporter,
            }),
            handle: Mutex::new(None),
        }
    }

    pub fn id(&self) -> DriverId {
        self.shared.id
    }

    pub fn location(&self) -> NodeId {
        self.shared.location.load(Ordering::Acquire)
    }

    /// Spawn the worker loop. Calling again while running is a no-op; a stopped
    /// worker cannot be restarted.
    pub fn start(&self) -> Result<(), DispatchError> {
        let mut handle = self.handle.lock();
        {
            let mut state = self.shared.state.lock();
            match state.lifecycle {
                Lifecycle::Running => return Ok(()),
                Lifecycle::Stopped => {
                    return Err(DispatchError::WorkerStopped {
                        driver_id: self.shared.id,
                    })
                }
                Lifecycle::Ready => state.lifecycle = Lifecycle::Running,
            }
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("driver-{}", self.shared.id))
            .spawn(move || shared.run());
        match spawned {
            Ok(join_handle) => {
                *handle = Some(join_handle);
                Ok(())
            }
            Err(err) => {
                self.shared.state.lock().lifecycle = Lifecycle::Ready;
                Err(err.into())
            }
        }
    }

    /// Signal the loop to exit and block until it has. Tasks still queued stay
    /// queued; see [`DriverWorker::drain_pending`].
    pub fn stop(&self) {
        let mut handle = self.handle.lock();
        {
            let mut state = self.shared.state.lock();
            if state.lifecycle == Lifecycle::Stopped && handle.is_none() {
                return;
            }
            state.lifecycle = Lifecycle::Stopped;
        }
        self.shared.wake.notify_all();

        if let Some(join_handle) = handle.take() {
            // The last handle can be dropped from inside a report callback.
            if join_handle.thread().id() == thread::current().id() {
                return;
            }
            if join_handle.join().is_err() {
                tracing::error!(driver_id = self.shared.id, "Driver worker panicked");
            }
        }
    }

    /// Append a trip to the queue. Fails once the worker has been stopped.
    pub fn assign_task(&self, trip: AssignedTrip) -> Result<(), DispatchError> {
        {
            let mut state = self.shared.state.lock();
            if state.lifecycle == Lifecycle::Stopped {
                return Err(DispatchError::WorkerStopped {
                    driver_id: self.shared.id,
                });
            }
            state.queue.push_back(trip);
        }
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Tasks waiting behind the current trip.
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn is_active(&self) -> bool {
        self.shared.state.lock().lifecycle == Lifecycle::Running
    }

    pub fn is_busy(&self) -> bool {
        self.shared.state.lock().current.is_some()
    }

    pub fn current_order(&self) -> Option<OrderId> {
        self.shared.state.lock().current
    }

    pub fn trip_phase(&self) -> TripPhase {
        self.shared.state.lock().phase
    }

    pub fn add_rating(&self, rating: u8) {
        let mut ratings = self.shared.ratings.lock();
        ratings.sum += u64::from(rating);
        ratings.count += 1;
    }

    /// Running mean of received ratings, [`NEUTRAL_RATING`] before the first one.
    pub fn average_rating(&self) -> f64 {
        let ratings = *self.shared.ratings.lock();
        if ratings.count == 0 {
            return NEUTRAL_RATING;
        }
        ratings.sum as f64 / ratings.count as f64
    }

    pub fn rating_count(&self) -> u64 {
        self.shared.ratings.lock().count
    }

    pub fn snapshot(&self) -> DriverSnapshot {
        DriverSnapshot {
            id: self.shared.id,
            location: self.location(),
            pending_tasks: self.pending_count(),
            average_rating: self.average_rating(),
        }
    }

    /// Withdraw the task queued behind the trip in progress and report it as
    /// cancelled. Best effort: the trip already under way is not interrupted.
    pub fn request_cancel_current(&self) -> Option<OrderId> {
        let withdrawn = {
            let mut state = self.shared.state.lock();
            if state.current.is_some() {
                state.queue.pop_front()
            } else {
                None
            }
        };

        match withdrawn {
            Some(trip) => {
                tracing::info!(
                    driver_id = self.shared.id,
                    order_id = trip.order.id,
                    "Driver {} withdrew order {}",
                    self.shared.id,
                    trip.order.id
                );
                self.shared
                    .reporter
                    .trip_cancelled(trip.order.id, self.shared.id);
                Some(trip.order.id)
            }
            None => {
                tracing::info!(
                    driver_id = self.shared.id,
                    "Driver {} had no active task to cancel",
                    self.shared.id
                );
                None
            }
        }
    }

    /// Remove and return every queued order.
    pub fn drain_pending(&self) -> Vec<Order> {
        let mut state = self.shared.state.lock();
        state.queue.drain(..).map(|trip| trip.order).collect()
    }
}

impl Drop for DriverWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for DriverWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverWorker")
            .field("id", &self.shared.id)
            .field("location", &self.location())
            .field("average_rating", &self.average_rating())
            .finish()
    }
}

impl DriverShared {
    fn run(self: Arc<Self>) {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.id)),
            None => StdRng::from_entropy(),
        };
        tracing::info!(driver_id = self.id, "Driver {} online", self.id);

        while let Some(trip) = self.next_trip() {
            self.execute(trip, &mut rng);
            let mut state = self.state.lock();
            state.current = None;
            state.phase = TripPhase::Idle;
        }

        tracing::info!(driver_id = self.id, "Driver {} stopping", self.id);
    }

    /// Block until a trip is queued or the worker is stopped.
    fn next_trip(&self) -> Option<AssignedTrip> {
        let mut state = self.state.lock();
        loop {
            if state.lifecycle != Lifecycle::Running {
                return None;
            }
            if let Some(trip) = state.queue.pop_front() {
                state.current = Some(trip.order.id);
                state.phase = TripPhase::EnRoutePickup;
                return Some(trip);
            }
            if self
                .wake
                .wait_for(&mut state, self.config.idle_wait())
                .timed_out()
            {
                tracing::trace!(driver_id = self.id, "Idle wake-up");
            }
        }
    }

    fn execute(&self, trip: AssignedTrip, rng: &mut StdRng) {
        let AssignedTrip { order, graph } = trip;
        let from = self.location.load(Ordering::Acquire);
        let to_pickup = graph.distance(from, order.pickup);
        let to_dropoff = graph.distance(order.pickup, order.dropoff);

        tracing::info!(
            driver_id = self.id,
            order_id = order.id,
            "Driver {} heading to pickup for order {}",
            self.id,
            order.id
        );
        if !self.travel(self.config.travel_duration(to_pickup)) {
            self.abandon(order.id);
            return;
        }
        self.arrive(&graph, order.pickup);
        self.state.lock().phase = TripPhase::EnRouteDropoff;
        tracing::info!(
            driver_id = self.id,
            order_id = order.id,
            "Driver {} picked up order {}",
            self.id,
            order.id
        );
        self.reporter.trip_started(order.id, self.id);

        if rng.gen::<f64>() < self.config.cancel_probability {
            tracing::info!(
                driver_id = self.id,
                order_id = order.id,
                "Driver {} cancelled order {}",
                self.id,
                order.id
            );
            self.reporter.trip_cancelled(order.id, self.id);
            return;
        }

        if !self.travel(self.config.travel_duration(to_dropoff)) {
            self.abandon(order.id);
            return;
        }
        self.arrive(&graph, order.dropoff);

        let low = self.config.min_rating.min(self.config.max_rating);
        let high = self.config.min_rating.max(self.config.max_rating);
        let rating = rng.gen_range(low..=high);
        tracing::info!(
            driver_id = self.id,
            order_id = order.id,
            rating,
            "Driver {} delivered order {}",
            self.id,
            order.id
        );
        self.reporter.trip_completed(order.id, self.id, rating);
    }

    fn arrive(&self, graph: &WeightedGraph, node: NodeId) {
        if graph.contains(node) {
            self.location.store(node, Ordering::Release);
        }
    }

    fn abandon(&self, order_id: OrderId) {
        tracing::info!(
            driver_id = self.id,
            order_id,
            "Driver {} stopped mid-trip, releasing order {}",
            self.id,
            order_id
        );
        self.reporter.trip_cancelled(order_id, self.id);
    }

    /// Sleep for `duration` unless stopped first. Returns `false` if stopped.
    fn travel(&self, duration: std::time::Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut state = self.state.lock();
        while state.lifecycle == Lifecycle::Running {
            if Instant::now() >= deadline {
                return true;
            }
            let _ = self.wake.wait_until(&mut state, deadline);
        }
        false
    }
}
