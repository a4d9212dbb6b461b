use super::algorithm::AssignmentStrategy;
use super::types::DriverSnapshot;

/// Distance discounted by reputation: `distance / max(rating_floor, rating)`.
#[derive(Debug, Clone, Copy)]
pub struct RatingPriorityStrategy {
    /// Lower bound on the divisor so a near-zero rating cannot blow up the score.
    pub rating_floor: f64,
}

impl Default for RatingPriorityStrategy {
    fn default() -> Self {
        Self { rating_floor: 0.1 }
    }
}

impl AssignmentStrategy for RatingPriorityStrategy {
    fn name(&self) -> &'static str {
        "rating-priority"
    }

    fn score(&self, distance: u64, driver: &DriverSnapshot) -> f64 {
        distance as f64 / driver.average_rating.max(self.rating_floor)
    }
}
