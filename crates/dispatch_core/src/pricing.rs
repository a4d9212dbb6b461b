//! Surge pricing: a demand-responsive multiplier derived from queue pressure.

use crate::config::SurgeConfig;

/// Multiplier when supply covers demand.
pub const BASE_MULTIPLIER: f64 = 1.0;

/// Surge multiplier for `pending` orders against `available` drivers.
///
/// Formula: `1 + (pending - available) / available * sensitivity` when demand
/// exceeds supply, otherwise exactly [`BASE_MULTIPLIER`]. With no drivers there is
/// nothing to price against, so the multiplier stays at base.
pub fn surge_multiplier(pending: usize, available: usize, sensitivity: f64) -> f64 {
    if available == 0 || pending <= available {
        return BASE_MULTIPLIER;
    }
    let excess = (pending - available) as f64;
    BASE_MULTIPLIER + excess / available as f64 * sensitivity
}

/// Last multiplier published to observers.
#[derive(Debug, Clone, Copy)]
pub struct SurgeState {
    config: SurgeConfig,
    current: f64,
    last_notified: f64,
}

impl SurgeState {
    pub fn new(config: SurgeConfig) -> Self {
        Self {
            config,
            current: BASE_MULTIPLIER,
            last_notified: BASE_MULTIPLIER,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Recompute the multiplier. Returns `Some(multiplier)` when it moved far
    /// enough from the last published value that observers must be told.
    pub fn recompute(&mut self, pending: usize, available: usize) -> Option<f64> {
        let multiplier = surge_multiplier(pending, available, self.config.sensitivity);
        self.current = multiplier;
        if (multiplier - self.last_notified).abs() > self.config.notify_epsilon {
            self.last_notified = multiplier;
            Some(multiplier)
        } else {
            None
        }
    }
}
