//! Rolling window of accepted ROM samples.
//!
//! Suppresses single-frame jitter from the pose model without introducing
//! multi-second lag: the moving average only looks at the newest few samples.

use crate::constants::{DEFAULT_SMOOTHING_WINDOW, SMOOTHING_BUFFER_CAPACITY};
use std::collections::VecDeque;

/// One ROM value produced from a validated frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleSample {
    /// ROM in degrees
    pub value: f64,
    /// Index of the frame the sample came from
    pub frame_index: u64,
}

/// Fixed-capacity FIFO of angle samples with moving-average output
#[derive(Debug, Clone)]
pub struct SmoothingBuffer {
    capacity: usize,
    window_size: usize,
    samples: VecDeque<AngleSample>,
}

impl SmoothingBuffer {
    /// Create a buffer with the given capacity and default averaging window
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");
        Self {
            capacity,
            window_size: DEFAULT_SMOOTHING_WINDOW,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Set the averaging window used by [`Self::smoothed`]
    ///
    /// # Panics
    ///
    /// Panics if `window_size` is 0
    #[must_use]
    pub fn with_window(mut self, window_size: usize) -> Self {
        assert!(window_size > 0, "Window size must be greater than 0");
        self.window_size = window_size;
        self
    }

    /// Append a sample, evicting the oldest once full
    pub fn push(&mut self, sample: AngleSample) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Mean of the newest `min(window_size, len)` samples, 0 when empty
    #[must_use]
    pub fn average(&self, window_size: usize) -> f64 {
        let window = window_size.min(self.samples.len());
        if window == 0 {
            return 0.0;
        }
        crate::utils::mean(self.samples.iter().skip(self.samples.len() - window).map(|s| s.value))
    }

    /// Average over the configured window
    #[must_use]
    pub fn smoothed(&self) -> f64 {
        self.average(self.window_size)
    }

    /// The newest `count` sample values, oldest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = f64> + '_ {
        let skip = self.samples.len().saturating_sub(count);
        self.samples.iter().skip(skip).map(|s| s.value)
    }

    /// Newest sample
    #[must_use]
    pub fn latest(&self) -> Option<&AngleSample> {
        self.samples.back()
    }

    /// Number of buffered samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples kept
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all samples
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for SmoothingBuffer {
    fn default() -> Self {
        Self::new(SMOOTHING_BUFFER_CAPACITY)
    }
}
