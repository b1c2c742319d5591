//! Latency statistics
//!
//! Latency samples (seconds between the planned and the actual execution of a
//! check) are kept in a bounded ring buffer. When the buffer is full, the
//! oldest sample is evicted.
//!
//! ## Summary
//!
//! ```text
//! sorted samples → drop the low tail below the 5th percentile
//!                → min = p5, max = p95, avg = mean   (of the remainder)
//!                → rounded to two decimals
//! ```

use std::collections::VecDeque;

use serde::Serialize;

/// Default number of samples kept
pub const DEFAULT_WINDOW: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone)]
pub struct LatencyStats {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl LatencyStats {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record one sample, evicting the oldest when the window is full
    ///
    /// Negative and non-finite samples are ignored.
    pub fn record(&mut self, latency: f64) {
        if !latency.is_finite() || latency < 0.0 {
            return;
        }

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(latency);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn summary(&self) -> Option<LatencySummary> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let floor = percentile(&sorted, 0.05);
        let kept: Vec<f64> = sorted.into_iter().filter(|sample| *sample >= floor).collect();

        let avg = kept.iter().sum::<f64>() / kept.len() as f64;

        Some(LatencySummary {
            min: round2(percentile(&kept, 0.05)),
            max: round2(percentile(&kept, 0.95)),
            avg: round2(avg),
        })
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Linear interpolation between the closest ranks of a sorted, non-empty slice
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scheduler counters published on the stats tick
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStats {
    pub latency: Option<LatencySummary>,
    pub checks_in_progress: usize,
    pub cycle: u64,
    pub generation: u64,
    pub items: usize,
}
