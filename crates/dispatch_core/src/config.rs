//! Tunables for the worker travel simulation and the surge signal.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Driver worker simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Simulated travel time per unit of graph distance (ms).
    pub travel_ms_per_unit: u64,
    /// Upper bound on one simulated travel leg (ms).
    pub max_travel_ms: u64,
    /// Bounded wait while the task queue is empty (ms).
    pub idle_wait_ms: u64,
    /// Probability (0.0–1.0) that a driver abandons a trip after pickup.
    pub cancel_probability: f64,
    /// Inclusive range of synthesized passenger ratings.
    pub min_rating: u8,
    pub max_rating: u8,
    /// Seed for RNG (for reproducibility). `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            travel_ms_per_unit: 200,
            max_travel_ms: 3_000,
            idle_wait_ms: 500,
            cancel_probability: 0.1,
            min_rating: 3,
            max_rating: 5,
            seed: None,
        }
    }
}

impl WorkerConfig {
    pub fn with_travel(mut self, ms_per_unit: u64, max_ms: u64) -> Self {
        self.travel_ms_per_unit = ms_per_unit;
        self.max_travel_ms = max_ms;
        self
    }

    pub fn with_idle_wait_ms(mut self, idle_wait_ms: u64) -> Self {
        self.idle_wait_ms = idle_wait_ms;
        self
    }

    pub fn with_cancel_probability(mut self, probability: f64) -> Self {
        self.cancel_probability = probability;
        self
    }

    pub fn with_rating_range(mut self, min: u8, max: u8) -> Self {
        self.min_rating = min;
        self.max_rating = max;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Travel time for a leg of `distance` units, capped at `max_travel_ms`.
    pub fn travel_duration(&self, distance: u64) -> Duration {
        let millis = distance
            .saturating_mul(self.travel_ms_per_unit)
            .min(self.max_travel_ms);
        Duration::from_millis(millis)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms.max(1))
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if !(0.0..=1.0).contains(&self.cancel_probability) {
            return Err(DispatchError::InvalidConfig(format!(
                "cancel_probability must be within [0, 1], got {}",
                self.cancel_probability
            )));
        }
        if self.min_rating == 0 || self.min_rating > self.max_rating {
            return Err(DispatchError::InvalidConfig(format!(
                "rating range {}..={} is empty or includes zero",
                self.min_rating, self.max_rating
            )));
        }
        Ok(())
    }
}

/// Surge multiplier parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurgeConfig {
    /// Multiplier increase per excess pending order per available driver.
    pub sensitivity: f64,
    /// Observers are notified only when the multiplier moves by more than this.
    pub notify_epsilon: f64,
}

impl Default for SurgeConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.1,
            notify_epsilon: 1e-6,
        }
    }
}

impl SurgeConfig {
    pub fn validate(&self) -> Result<(), DispatchError> {
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(DispatchError::InvalidConfig(format!(
                "surge sensitivity must be a non-negative number, got {}",
                self.sensitivity
            )));
        }
        if !self.notify_epsilon.is_finite() || self.notify_epsilon < 0.0 {
            return Err(DispatchError::InvalidConfig(format!(
                "surge notify_epsilon must be a non-negative number, got {}",
                self.notify_epsilon
            )));
        }
        Ok(())
    }
}

/// Top-level configuration for a [`crate::DispatchCoordinator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub worker: WorkerConfig,
    pub surge: SurgeConfig,
    /// How many completed or cancelled orders keep an answer for
    /// `order_status`. The oldest are forgotten first.
    pub status_history: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            surge: SurgeConfig::default(),
            status_history: 10_000,
        }
    }
}

impl DispatchConfig {
    pub fn with_worker(mut self, worker: WorkerConfig) -> Self {
        self.worker = worker;
        self
    }

    pub fn with_surge(mut self, surge: SurgeConfig) -> Self {
        self.surge = surge;
        self
    }

    pub fn with_status_history(mut self, status_history: usize) -> Self {
        self.status_history = status_history;
        self
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, DispatchError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        self.worker.validate()?;
        self.surge.validate()
    }
}
