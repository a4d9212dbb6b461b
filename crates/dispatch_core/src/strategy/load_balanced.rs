use super::algorithm::AssignmentStrategy;
use super::types::DriverSnapshot;

/// Distance inflated by queue length: `distance * (1 + pending * load_penalty)`.
/// A close but busy driver can lose to a farther idle one.
#[derive(Debug, Clone, Copy)]
pub struct LoadBalancedStrategy {
    /// Score inflation per queued task.
    pub load_penalty: f64,
}

impl LoadBalancedStrategy {
    pub fn new(load_penalty: f64) -> Self {
        Self { load_penalty }
    }
}

impl Default for LoadBalancedStrategy {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl AssignmentStrategy for LoadBalancedStrategy {
    fn name(&self) -> &'static str {
        "load-balanced"
    }

    fn score(&self, distance: u64, driver: &DriverSnapshot) -> f64 {
        distance as f64 * (1.0 + driver.pending_tasks as f64 * self.load_penalty)
    }
}
