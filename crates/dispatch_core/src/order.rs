//! Trip requests and the identifiers shared across the engine.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub type OrderId = u64;
pub type DriverId = u64;
pub type PassengerId = u64;
/// Graph node id used as an abstract location.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Queued,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Completed and cancelled orders never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// A trip request from `pickup` to `dropoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub pickup: NodeId,
    pub dropoff: NodeId,
    /// Base fare before surge.
    pub fare: f64,
    pub passenger_id: PassengerId,
    pub status: OrderStatus,
    pub created_at: SystemTime,
}

impl Order {
    pub fn new(id: OrderId, pickup: NodeId, dropoff: NodeId, fare: f64) -> Self {
        Self {
            id,
            pickup,
            dropoff,
            fare,
            passenger_id: 0,
            status: OrderStatus::Queued,
            created_at: SystemTime::now(),
        }
    }

    pub fn with_passenger(mut self, passenger_id: PassengerId) -> Self {
        self.passenger_id = passenger_id;
        self
    }

    /// Fare charged under the given surge multiplier.
    pub fn surged_fare(&self, multiplier: f64) -> f64 {
        self.fare * multiplier.max(1.0)
    }
}
