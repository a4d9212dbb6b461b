//! Telemetry / KPIs: completed trips and lifecycle counters.

use std::time::{Duration, SystemTime};

use crate::order::{DriverId, OrderId};

/// One completed trip, recorded when the driver reports dropoff.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTripRecord {
    pub order_id: OrderId,
    pub driver_id: DriverId,
    pub rating: u8,
    pub base_fare: f64,
    /// Surge multiplier in force when the order was assigned.
    pub surge_multiplier: f64,
    pub created_at: SystemTime,
    pub assigned_at: SystemTime,
    pub completed_at: SystemTime,
}

impl CompletedTripRecord {
    pub fn charged_fare(&self) -> f64 {
        self.base_fare * self.surge_multiplier
    }

    /// Time from submission to assignment.
    pub fn time_to_assign(&self) -> Duration {
        self.assigned_at
            .duration_since(self.created_at)
            .unwrap_or_default()
    }

    /// Time from assignment to dropoff.
    pub fn time_to_complete(&self) -> Duration {
        self.completed_at
            .duration_since(self.assigned_at)
            .unwrap_or_default()
    }
}

/// Counters and records collected by the coordinator.
#[derive(Debug, Clone, Default)]
pub struct DispatchTelemetry {
    pub completed_trips: Vec<CompletedTripRecord>,
    pub orders_submitted: u64,
    pub orders_dispatched: u64,
    pub passenger_cancellations: u64,
    pub driver_cancellations: u64,
    pub surge_notifications: u64,
}

impl DispatchTelemetry {
    pub fn completed_count(&self) -> usize {
        self.completed_trips.len()
    }

    /// Sum of surged fares over completed trips.
    pub fn gross_fares(&self) -> f64 {
        self.completed_trips
            .iter()
            .map(CompletedTripRecord::charged_fare)
            .sum()
    }
}
