//! # Round-Trip Latency
//!
//! Purpose: Keep every timed send/acknowledge round trip and summarize them
//! when the client closes.
//!
//! ## Design Principles
//! 1. **Append-Only Log**: Samples are kept in arrival order and never edited.
//! 2. **Explicit Emptiness**: An empty log has no summary (`None`), never NaN.
//! 3. **Microsecond Floats**: Samples are stored as `f64` microseconds so
//!    sub-microsecond loopback timings are not rounded to zero.

use std::fmt;
use std::time::Duration;

/// Ordered log of latency samples in microseconds.
#[derive(Debug, Clone, Default)]
pub struct LatencyLog {
    samples_us: Vec<f64>,
}

impl LatencyLog {
    pub fn new() -> Self {
        LatencyLog::default()
    }

    /// Appends one round-trip measurement.
    pub fn record(&mut self, latency: Duration) {
        self.samples_us.push(latency.as_nanos() as f64 / 1e3);
    }

    pub fn len(&self) -> usize {
        self.samples_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_us.is_empty()
    }

    /// Samples in recording order, in microseconds.
    pub fn samples(&self) -> &[f64] {
        &self.samples_us
    }

    /// Computes mean, population standard deviation, and range.
    ///
    /// **Input**: none.
    /// **Output**: `None` when no sample was recorded, otherwise the summary.
    ///
    /// **Logic**:
    /// 1. Sum the samples and divide by the count for the mean.
    /// 2. Average the squared deviations (population variance, `n` divisor).
    /// 3. Track min and max in the same pass as the sum.
    pub fn summary(&self) -> Option<LatencySummary> {
        if self.samples_us.is_empty() {
            return None;
        }

        let count = self.samples_us.len();
        let mut sum = 0.0;
        let mut min_us = f64::INFINITY;
        let mut max_us = f64::NEG_INFINITY;
        for &sample in &self.samples_us {
            sum += sample;
            min_us = min_us.min(sample);
            max_us = max_us.max(sample);
        }
        let mean_us = sum / count as f64;
        let variance = self
            .samples_us
            .iter()
            .map(|sample| (sample - mean_us).powi(2))
            .sum::<f64>()
            / count as f64;

        Some(LatencySummary {
            count,
            mean_us,
            std_dev_us: variance.sqrt(),
            min_us,
            max_us,
        })
    }
}

/// Aggregate statistics over a non-empty latency log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub count: usize,
    pub mean_us: f64,
    pub std_dev_us: f64,
    pub min_us: f64,
    pub max_us: f64,
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}±{:.3} usec", self.mean_us, self.std_dev_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(samples_us: &[u64]) -> LatencyLog {
        let mut log = LatencyLog::new();
        for &us in samples_us {
            log.record(Duration::from_micros(us));
        }
        log
    }

    #[test]
    fn empty_log_has_no_summary() {
        let log = LatencyLog::new();
        assert!(log.is_empty());
        assert_eq!(log.summary(), None);
    }

    #[test]
    fn summary_uses_population_std_dev() {
        let summary = log_of(&[1, 2, 3, 4]).summary().unwrap();
        assert_eq!(summary.count, 4);
        assert!((summary.mean_us - 2.5).abs() < 1e-9);
        assert!((summary.std_dev_us - 1.25f64.sqrt()).abs() < 1e-9);
        assert!((summary.min_us - 1.0).abs() < 1e-9);
        assert!((summary.max_us - 4.0).abs() < 1e-9);
    }

    #[test]
    fn single_sample_has_zero_spread() {
        let summary = log_of(&[10]).summary().unwrap();
        assert_eq!(summary.std_dev_us, 0.0);
        assert_eq!(summary.to_string(), "10.000±0.000 usec");
    }

    #[test]
    fn samples_keep_recording_order() {
        let log = log_of(&[5, 1, 3]);
        assert_eq!(log.len(), 3);
        assert_eq!(log.samples(), &[5.0, 1.0, 3.0]);
    }
}
