use parking_lot::Mutex;

use dispatch_core::SurgeObserver;

/// Observer that keeps every multiplier it was sent.
#[derive(Debug, Default)]
pub struct RecordingSurgeObserver {
    updates: Mutex<Vec<f64>>,
}

impl RecordingSurgeObserver {
    pub fn updates(&self) -> Vec<f64> {
        self.updates.lock().clone()
    }

    pub fn last(&self) -> Option<f64> {
        self.updates.lock().last().copied()
    }
}

impl SurgeObserver for RecordingSurgeObserver {
    fn on_surge_update(&self, multiplier: f64) {
        self.updates.lock().push(multiplier);
    }
}
