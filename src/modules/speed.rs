//! Time-gated upload speed estimation
//!
//! Samples are taken at most once per interval from the running byte counter
//! and averaged over a small window to smooth out bursty progress reports.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Minimum time between two speed samples
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Number of samples averaged into the reported speed
pub const DEFAULT_SAMPLE_WINDOW: usize = 5;

/// Rolling-average speed estimator fed with cumulative byte counts
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    interval: Duration,
    capacity: usize,
    samples: VecDeque<f64>,
    last_sample_time: Instant,
    last_sample_bytes: u64,
    speed: f64,
}

impl SpeedEstimator {
    /// Estimator whose gate starts at `now`; `capacity` is at least one sample
    pub fn new(interval: Duration, capacity: usize, now: Instant) -> Self {
        let capacity = capacity.max(1);
        Self {
            interval,
            capacity,
            samples: VecDeque::with_capacity(capacity),
            last_sample_time: now,
            last_sample_bytes: 0,
            speed: 0.0,
        }
    }

    /// Drop all samples and restart the gate at `now` with zero bytes
    pub fn reset(&mut self, now: Instant) {
        self.samples.clear();
        self.last_sample_time = now;
        self.last_sample_bytes = 0;
        self.speed = 0.0;
    }

    /// Feed the current cumulative byte count.
    ///
    /// Returns the new averaged speed when a sample was accepted. The gate
    /// advances whenever the interval has elapsed, even if the sample itself
    /// is discarded for being negative.
    pub fn record(&mut self, uploaded_bytes: u64, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.last_sample_time);
        if elapsed < self.interval || elapsed.is_zero() {
            return None;
        }

        let delta = uploaded_bytes as f64 - self.last_sample_bytes as f64;
        let rate = delta / elapsed.as_secs_f64();

        self.last_sample_time = now;
        self.last_sample_bytes = uploaded_bytes;

        if rate < 0.0 {
            log::debug!("Discarding negative speed sample ({rate:.0} B/s)");
            return None;
        }

        self.samples.push_back(rate);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        self.speed = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        Some(self.speed)
    }

    /// Current averaged speed in bytes per second
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Samples currently in the window
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL, DEFAULT_SAMPLE_WINDOW, Instant::now())
    }
}
