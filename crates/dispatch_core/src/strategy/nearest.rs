use super::algorithm::AssignmentStrategy;
use super::types::DriverSnapshot;

/// Picks the driver closest to the pickup, ignoring load and rating.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestDistanceStrategy;

impl AssignmentStrategy for NearestDistanceStrategy {
    fn name(&self) -> &'static str {
        "nearest-distance"
    }

    fn score(&self, distance: u64, _driver: &DriverSnapshot) -> f64 {
        distance as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::WeightedGraph;
    use crate::order::Order;
    use crate::strategy::Assignment;

    fn driver(id: u64, location: usize) -> DriverSnapshot {
        DriverSnapshot {
            id,
            location,
            pending_tasks: 0,
            average_rating: 5.0,
        }
    }

    /// Star around node 0: drivers at 1, 2, 3 are 7, 3 and 10 away.
    fn star() -> WeightedGraph {
        WeightedGraph::from_edges(4, &[(0, 1, 7), (0, 2, 3), (0, 3, 10)])
    }

    #[test]
    fn selects_closest_driver() {
        let drivers = vec![driver(1, 1), driver(2, 2), driver(3, 3)];
        let orders = vec![Order::new(10, 0, 1, 8.0)];
        let result = NearestDistanceStrategy.assign(&orders, &drivers, &star());
        assert_eq!(
            result,
            vec![Assignment {
                order_id: 10,
                driver_index: 1
            }]
        );
    }

    #[test]
    fn tie_goes_to_first_driver() {
        let graph = WeightedGraph::from_edges(3, &[(0, 1, 4), (0, 2, 4)]);
        let drivers = vec![driver(1, 2), driver(2, 1)];
        let orders = vec![Order::new(10, 0, 1, 8.0)];
        let result = NearestDistanceStrategy.assign(&orders, &drivers, &graph);
        assert_eq!(result[0].driver_index, 0);
    }

    #[test]
    fn driver_stays_candidate_for_later_orders() {
        let drivers = vec![driver(1, 1), driver(2, 2), driver(3, 3)];
        let orders = vec![Order::new(10, 0, 1, 8.0), Order::new(11, 0, 3, 6.0)];
        let result = NearestDistanceStrategy.assign(&orders, &drivers, &star());
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|a| a.driver_index == 1));
        assert_eq!(result[0].order_id, 10);
        assert_eq!(result[1].order_id, 11);
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        let orders = vec![Order::new(10, 0, 1, 8.0)];
        assert!(NearestDistanceStrategy.assign(&orders, &[], &star()).is_empty());
        assert!(NearestDistanceStrategy
            .assign(&[], &[driver(1, 1)], &star())
            .is_empty());
    }

    #[test]
    fn unreachable_pickup_is_left_pending() {
        let graph = WeightedGraph::from_edges(4, &[(0, 1, 1)]);
        let drivers = vec![driver(1, 0), driver(2, 1)];
        let orders = vec![Order::new(10, 3, 0, 8.0), Order::new(11, 1, 0, 8.0)];
        let result = NearestDistanceStrategy.assign(&orders, &drivers, &graph);
        assert_eq!(
            result,
            vec![Assignment {
                order_id: 11,
                driver_index: 1
            }]
        );
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let drivers = vec![driver(1, 1), driver(2, 2), driver(3, 3)];
        let orders = vec![Order::new(10, 0, 1, 8.0), Order::new(11, 3, 1, 8.0)];
        let graph = star();
        let first = NearestDistanceStrategy.assign(&orders, &drivers, &graph);
        for _ in 0..5 {
            assert_eq!(NearestDistanceStrategy.assign(&orders, &drivers, &graph), first);
        }
    }
}
