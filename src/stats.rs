//! Fixed-window moving average, used for per-frame latency reporting.

use std::collections::VecDeque;
use std::time::Duration;

pub const DEFAULT_WINDOW: usize = 20;

#[derive(Clone, Debug)]
pub struct RunningAverage {
    window: usize,
    samples: VecDeque<u64>,
    sum: u64,
}

impl RunningAverage {
    /// A window of 0 is treated as 1.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            sum: 0,
        }
    }

    /// Add a sample and return the mean of the current window.
    pub fn push(&mut self, value: u64) -> u64 {
        if self.samples.len() == self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(value);
        self.sum += value;
        self.average()
    }

    pub fn push_duration(&mut self, elapsed: Duration) -> Duration {
        Duration::from_micros(self.push(elapsed.as_micros() as u64))
    }

    pub fn average(&self) -> u64 {
        if self.samples.is_empty() {
            0
        } else {
            self.sum / self.samples.len() as u64
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for RunningAverage {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
