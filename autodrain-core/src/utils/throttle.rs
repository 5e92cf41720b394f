//! Rate limiting for the "balance too low" warning.

use rust_decimal::Decimal;
use std::time::Duration;
use tokio::time::Instant;

/// Lets a warning through at most once per `interval` while the observed
/// balance stays the same. A changed balance is reported right away.
#[derive(Debug, Clone)]
pub struct WarnThrottle {
    interval: Duration,
    last: Option<(Instant, Decimal)>,
}

impl WarnThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` if a warning for `balance` should be emitted at `now`,
    /// and records it as emitted.
    pub fn should_emit(&mut self, now: Instant, balance: Decimal) -> bool {
        let emit = match self.last {
            None => true,
            Some((at, previous)) => {
                previous != balance || now.saturating_duration_since(at) >= self.interval
            }
        };
        if emit {
            self.last = Some((now, balance));
        }
        emit
    }

    /// Forget the last emission, e.g. after funds were drained.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_balance_is_throttled() {
        let mut throttle = WarnThrottle::new(Duration::from_secs(5));
        let start = Instant::now();
        let balance = Decimal::ONE;

        assert!(throttle.should_emit(start, balance));
        assert!(!throttle.should_emit(start + Duration::from_millis(1), balance));
        assert!(!throttle.should_emit(start + Duration::from_millis(4999), balance));
        assert!(throttle.should_emit(start + Duration::from_secs(5), balance));
    }

    #[test]
    fn test_changed_balance_passes() {
        let mut throttle = WarnThrottle::new(Duration::from_secs(60));
        let start = Instant::now();
        assert!(throttle.should_emit(start, Decimal::ONE));
        assert!(throttle.should_emit(start, Decimal::TWO));
        assert!(!throttle.should_emit(start, Decimal::TWO));
    }

    #[test]
    fn test_reset() {
        let mut throttle = WarnThrottle::new(Duration::from_secs(60));
        let start = Instant::now();
        assert!(throttle.should_emit(start, Decimal::ONE));
        throttle.reset();
        assert!(throttle.should_emit(start, Decimal::ONE));
    }
}
