//! Randomised delays used to spread out requests from many workers.

use rand::Rng;
use std::time::Duration;

/// Inclusive range a jitter delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterRange {
    min: Duration,
    max: Duration,
}

impl JitterRange {
    /// Build a range. Bounds given in the wrong order are swapped.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay using the thread-local generator.
    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::rng())
    }

    /// Draw a delay uniformly from `[min, max]` at microsecond resolution.
    pub fn sample_with<R: Rng>(&self, rng: &mut R) -> Duration {
        let lo = micros(self.min);
        let hi = micros(self.max);
        Duration::from_micros(rng.random_range(lo..=hi))
    }
}

impl Default for JitterRange {
    fn default() -> Self {
        Self::from_millis(50, 800)
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_stay_within_bounds() {
        let range = JitterRange::default();
        let mut rng = rand::rng();
        for _ in 0..10_000 {
            let d = range.sample_with(&mut rng);
            assert!(d >= Duration::from_millis(50), "{d:?} below bound");
            assert!(d <= Duration::from_millis(800), "{d:?} above bound");
        }
    }

    #[test]
    fn test_reversed_bounds_are_swapped() {
        let range = JitterRange::from_millis(900, 100);
        assert_eq!(range.min(), Duration::from_millis(100));
        assert_eq!(range.max(), Duration::from_millis(900));
    }

    #[test]
    fn test_degenerate_range() {
        let range = JitterRange::from_millis(5, 5);
        assert_eq!(range.sample(), Duration::from_millis(5));
        let zero = JitterRange::from_millis(0, 0);
        assert_eq!(zero.sample(), Duration::ZERO);
    }
}
