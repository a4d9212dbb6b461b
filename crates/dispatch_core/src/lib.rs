//! Ride-dispatch engine: a coordinator that owns drivers and pending orders,
//! one worker thread per driver, and pluggable assignment strategies scored
//! over shortest-path distances on a weighted graph.

pub mod config;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod graph;
pub mod order;
pub mod pricing;
pub mod strategy;
pub mod telemetry;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use config::{DispatchConfig, SurgeConfig, WorkerConfig};
pub use coordinator::{DispatchCoordinator, LoggingSurgeObserver, SurgeObserver};
pub use driver::{AssignedTrip, DriverWorker, TripPhase, TripReporter};
pub use error::DispatchError;
pub use graph::{WeightedGraph, UNREACHABLE};
pub use order::{DriverId, NodeId, Order, OrderId, OrderStatus, PassengerId};
pub use strategy::{
    Assignment, AssignmentStrategy, DriverSnapshot, LoadBalancedStrategy,
    NearestDistanceStrategy, RatingPriorityStrategy, StrategyKind,
};
