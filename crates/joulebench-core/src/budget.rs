//! Wall-clock budget for the timed part of a benchmark run.

use std::time::Duration;

/// Number of samples observed before the estimate starts reserving one
/// average-length query for the next call.
pub const WARMUP_SAMPLES: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct TimeBudget {
    budget_secs: Option<f64>,
    elapsed: Vec<f64>,
}

impl TimeBudget {
    /// `None` and zero both mean "run the whole corpus".
    pub fn new(budget: Option<Duration>) -> Self {
        let budget_secs = budget
            .map(|d| d.as_secs_f64())
            .filter(|secs| *secs > 0.0);
        Self {
            budget_secs,
            elapsed: Vec::new(),
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Some(Duration::from_secs(secs)))
    }

    pub fn is_bounded(&self) -> bool {
        self.budget_secs.is_some()
    }

    pub fn record(&mut self, latency: Duration) {
        self.elapsed.push(latency.as_secs_f64());
    }

    pub fn total_elapsed(&self) -> f64 {
        self.elapsed.iter().sum()
    }

    pub fn average(&self) -> Option<f64> {
        if self.elapsed.is_empty() {
            return None;
        }
        Some(self.total_elapsed() / self.elapsed.len() as f64)
    }

    /// Seconds left before the budget runs out. Once enough samples exist
    /// the estimate also subtracts one average query, so the loop stops
    /// before starting a query it cannot finish. Unbounded budgets report
    /// the negated elapsed time and never stop the loop.
    pub fn remaining(&self) -> f64 {
        let spent = self.total_elapsed();
        let Some(budget) = self.budget_secs else {
            return -spent;
        };

        if self.elapsed.len() < WARMUP_SAMPLES {
            return budget - spent;
        }

        budget - (spent + self.average().unwrap_or(0.0))
    }

    pub fn should_stop(&self) -> bool {
        self.is_bounded() && self.remaining() < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_zero_budget_is_unbounded() {
        let mut budget = TimeBudget::from_secs(0);
        assert!(!budget.is_bounded());
        for _ in 0..10 {
            budget.record(secs(100.0));
        }
        assert!(!budget.should_stop());
        assert_eq!(budget.remaining(), -1000.0);
    }

    #[test]
    fn test_no_stop_during_warmup_with_large_budget() {
        let mut budget = TimeBudget::from_secs(10_000);
        for _ in 0..4 {
            budget.record(secs(50.0));
            assert!(!budget.should_stop());
        }
    }

    #[test]
    fn test_warmup_has_no_smoothing() {
        let mut budget = TimeBudget::from_secs(100);
        for _ in 0..4 {
            budget.record(secs(10.0));
        }
        assert_eq!(budget.remaining(), 60.0);
    }

    #[test]
    fn test_reserves_one_average_after_warmup() {
        let mut budget = TimeBudget::from_secs(100);
        for _ in 0..5 {
            budget.record(secs(10.0));
        }
        assert_eq!(budget.remaining(), 40.0);
        assert!(!budget.should_stop());

        budget.record(secs(10.0));
        assert_eq!(budget.remaining(), 30.0);
    }

    #[test]
    fn test_remaining_decreases_monotonically() {
        let mut budget = TimeBudget::from_secs(500);
        let mut previous = budget.remaining();
        for _ in 0..12 {
            budget.record(secs(7.5));
            let now = budget.remaining();
            assert!(now < previous, "{} should be below {}", now, previous);
            previous = now;
        }
    }

    #[test]
    fn test_stops_once_next_query_would_overrun() {
        let mut budget = TimeBudget::from_secs(45);
        for _ in 0..4 {
            budget.record(secs(10.0));
            assert!(!budget.should_stop());
        }
        budget.record(secs(10.0));
        assert_eq!(budget.remaining(), -15.0);
        assert!(budget.should_stop());
    }
}
