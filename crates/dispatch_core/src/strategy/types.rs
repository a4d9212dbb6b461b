use crate::graph::{WeightedGraph, UNREACHABLE};
use crate::order::{DriverId, NodeId, OrderId};

/// Point-in-time view of one driver, taken by the coordinator before a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSnapshot {
    pub id: DriverId,
    pub location: NodeId,
    /// Tasks queued behind the current trip.
    pub pending_tasks: usize,
    pub average_rating: f64,
}

/// One accepted match: `driver_index` indexes the driver slice handed to the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub order_id: OrderId,
    pub driver_index: usize,
}

/// Shortest distances from every driver's location to every node.
#[derive(Debug, Clone)]
pub struct DistanceTable {
    rows: Vec<Vec<u64>>,
}

impl DistanceTable {
    /// One Dijkstra run per driver.
    pub fn compute(drivers: &[DriverSnapshot], graph: &WeightedGraph) -> Self {
        Self {
            rows: drivers
                .iter()
                .map(|driver| graph.shortest_distances(driver.location))
                .collect(),
        }
    }

    pub fn from_rows(rows: Vec<Vec<u64>>) -> Self {
        Self { rows }
    }

    /// Distance from driver `driver_index` to `node`, or [`UNREACHABLE`].
    pub fn get(&self, driver_index: usize, node: NodeId) -> u64 {
        self.rows
            .get(driver_index)
            .and_then(|row| row.get(node))
            .copied()
            .unwrap_or(UNREACHABLE)
    }
}
