//! Test helpers for common test setup and utilities.
//!
//! Shared by unit tests, integration tests and benches so they build the same
//! graphs and fast worker configurations.

use std::sync::Arc;

use crate::config::{DispatchConfig, WorkerConfig};
use crate::coordinator::DispatchCoordinator;
use crate::graph::WeightedGraph;

/// Edges of the six-node demo city:
///
/// ```text
/// 0 --5-- 1 --3-- 2 --4-- 3
///         |
///         2
///         |
///         4 --6-- 5
/// ```
pub const CITY_EDGES: [(usize, usize, u64); 5] =
    [(0, 1, 5), (1, 2, 3), (2, 3, 4), (1, 4, 2), (4, 5, 6)];

pub fn city_graph() -> Arc<WeightedGraph> {
    Arc::new(WeightedGraph::from_edges(6, &CITY_EDGES))
}

/// A `width x height` grid with unit weights; node id is `row * width + col`.
pub fn grid_graph(width: usize, height: usize) -> WeightedGraph {
    let mut graph = WeightedGraph::new(width * height);
    for row in 0..height {
        for col in 0..width {
            let node = row * width + col;
            if col + 1 < width {
                graph.add_edge(node, node + 1, 1);
            }
            if row + 1 < height {
                graph.add_edge(node, node + width, 1);
            }
        }
    }
    graph
}

/// Worker config with instant travel, no random cancellations and a fixed seed.
pub fn instant_worker_config() -> WorkerConfig {
    WorkerConfig::default()
        .with_travel(0, 0)
        .with_idle_wait_ms(10)
        .with_cancel_probability(0.0)
        .with_seed(42)
}

/// Worker config whose trips take long enough to observe in-flight state.
pub fn slow_worker_config() -> WorkerConfig {
    instant_worker_config().with_travel(10_000, 60_000)
}

pub fn test_coordinator(worker: WorkerConfig) -> DispatchCoordinator {
    DispatchCoordinator::new(DispatchConfig::default().with_worker(worker))
        .expect("test worker config should be valid")
}
