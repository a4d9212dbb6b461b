use std::thread;
use std::time::{Duration, Instant};

use dispatch_core::config::{DispatchConfig, WorkerConfig};
use dispatch_core::order::{DriverId, NodeId};
use dispatch_core::strategy::StrategyKind;
use dispatch_core::test_helpers::instant_worker_config;
use dispatch_core::DispatchCoordinator;

/// Upper bound for any condition a test waits on.
pub const WAIT: Duration = Duration::from_secs(10);

/// Builder for coordinators with drivers already registered.
#[derive(Debug, Clone)]
pub struct TestCoordinatorBuilder {
    worker: WorkerConfig,
    strategy: Option<StrategyKind>,
    drivers: Vec<(DriverId, NodeId)>,
}

impl Default for TestCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCoordinatorBuilder {
    /// Instant travel, no random cancellations, no strategy, no drivers.
    pub fn new() -> Self {
        Self {
            worker: instant_worker_config(),
            strategy: None,
            drivers: Vec::new(),
        }
    }

    pub fn with_worker(mut self, worker: WorkerConfig) -> Self {
        self.worker = worker;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_driver(mut self, driver_id: DriverId, location: NodeId) -> Self {
        self.drivers.push((driver_id, location));
        self
    }

    pub fn build(self) -> DispatchCoordinator {
        let coordinator =
            DispatchCoordinator::new(DispatchConfig::default().with_worker(self.worker))
                .expect("valid config");
        if let Some(kind) = self.strategy {
            coordinator.set_strategy(kind.build());
        }
        for (driver_id, location) in self.drivers {
            coordinator
                .spawn_driver(driver_id, location)
                .expect("register driver");
        }
        coordinator
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}
