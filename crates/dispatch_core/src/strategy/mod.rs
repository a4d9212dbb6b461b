pub mod algorithm;
pub mod types;
pub mod nearest;
pub mod load_balanced;
pub mod rating_priority;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use algorithm::AssignmentStrategy;
pub use load_balanced::LoadBalancedStrategy;
pub use nearest::NearestDistanceStrategy;
pub use rating_priority::RatingPriorityStrategy;
pub use types::{Assignment, DistanceTable, DriverSnapshot};

/// Which assignment strategy to run. Serializable so it can live in config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    #[default]
    NearestDistance,
    LoadBalanced,
    RatingPriority,
}

impl StrategyKind {
    pub fn build(self) -> Arc<dyn AssignmentStrategy> {
        match self {
            StrategyKind::NearestDistance => Arc::new(NearestDistanceStrategy),
            StrategyKind::LoadBalanced => Arc::new(LoadBalancedStrategy::default()),
            StrategyKind::RatingPriority => Arc::new(RatingPriorityStrategy::default()),
        }
    }
}
