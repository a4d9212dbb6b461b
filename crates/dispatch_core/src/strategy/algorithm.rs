use crate::graph::{WeightedGraph, UNREACHABLE};
use crate::order::Order;

use super::types::{Assignment, DistanceTable, DriverSnapshot};

/// Trait for assignment strategies that match pending orders to drivers.
///
/// A strategy only supplies a score for a (driver, order) pair; lower is better.
/// The provided [`AssignmentStrategy::assign`] runs the shared greedy pass:
///
/// 1. Compute shortest distances from every driver's location once per call
/// 2. Walk orders in queue order (first submitted first)
/// 3. Pick the driver with the lowest score; ties go to the earliest driver in
///    the slice
///
/// Drivers stay candidates after being picked, so several orders in one pass can
/// land on the same driver. Drivers that cannot reach the pickup are skipped, and
/// an order with no reachable driver is left out of the result.
pub trait AssignmentStrategy: Send + Sync {
    /// Short stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Score of handing an order whose pickup is `distance` away to `driver`.
    fn score(&self, distance: u64, driver: &DriverSnapshot) -> f64;

    /// Match `orders` to `drivers`. Returns at most one assignment per order.
    fn assign(
        &self,
        orders: &[Order],
        drivers: &[DriverSnapshot],
        graph: &WeightedGraph,
    ) -> Vec<Assignment> {
        if orders.is_empty() || drivers.is_empty() {
            return Vec::new();
        }
        let distances = DistanceTable::compute(drivers, graph);
        orders
            .iter()
            .filter_map(|order| {
                self.best_driver(order, drivers, &distances)
                    .map(|driver_index| Assignment {
                        order_id: order.id,
                        driver_index,
                    })
            })
            .collect()
    }

    /// Index of the lowest-scoring reachable driver for `order`.
    fn best_driver(
        &self,
        order: &Order,
        drivers: &[DriverSnapshot],
        distances: &DistanceTable,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, driver) in drivers.iter().enumerate() {
            let distance = distances.get(index, order.pickup);
            if distance >= UNREACHABLE {
                continue;
            }
            let score = self.score(distance, driver);
            match best {
                None => best = Some((index, score)),
                Some((_, best_score)) if score < best_score => best = Some((index, score)),
                _ => {}
            }
        }
        best.map(|(index, _)| index)
    }
}
