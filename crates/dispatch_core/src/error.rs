//! Errors returned when the engine refuses work.

use thiserror::Error;

use crate::order::{DriverId, OrderId};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Driver {driver_id} is already registered")]
    DuplicateDriver { driver_id: DriverId },

    #[error("Order {order_id} is already known to the dispatcher")]
    DuplicateOrder { order_id: OrderId },

    #[error("Driver {driver_id} is not registered")]
    UnknownDriver { driver_id: DriverId },

    #[error("Driver {driver_id} worker has stopped")]
    WorkerStopped { driver_id: DriverId },

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
