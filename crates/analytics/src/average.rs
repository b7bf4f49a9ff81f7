//! Bounded running average.

/// Incremental mean whose sample count stops growing at a cap.
///
/// Below the cap this is the plain arithmetic mean. Once `count` reaches the
/// cap every new sample is blended in with weight `1 / (cap + 1)`, so old
/// samples fade without a sample buffer being kept. This is not a true
/// sliding window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningAverage {
    average: f64,
    count: u64,
}

impl RunningAverage {
    /// Fold `sample` in, growing `count` up to `window`.
    pub fn record(&mut self, sample: f64, window: u64) {
        let count = self.count as f64;
        self.average = (self.average * count + sample) / (count + 1.0);
        if self.count < window {
            self.count += 1;
        }
    }

    /// Current mean.
    pub fn average(&self) -> f64 {
        self.average
    }

    /// Samples currently weighted, at most the window.
    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_mean_below_window() {
        let mut avg = RunningAverage::default();
        for sample in [10.0, 20.0, 30.0] {
            avg.record(sample, 10);
        }
        assert_eq!(avg.average(), 20.0);
        assert_eq!(avg.count(), 3);
    }

    #[test]
    fn test_count_saturates_at_window() {
        let mut avg = RunningAverage::default();
        avg.record(0.0, 2);
        avg.record(0.0, 2);
        assert_eq!(avg.count(), 2);

        // (0 * 2 + 30) / 3, and the count stays put.
        avg.record(30.0, 2);
        assert_eq!(avg.average(), 10.0);
        assert_eq!(avg.count(), 2);

        // (10 * 2 + 40) / 3
        avg.record(40.0, 2);
        assert_eq!(avg.average(), 20.0);
    }
}
