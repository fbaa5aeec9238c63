//! Stability detection over the newest ROM samples.
//!
//! A window is stable when every sample lies within `threshold` degrees of
//! the window mean. One outlier keeps the window unstable until it ages out.

use crate::constants::{
    DEFAULT_STABILITY_FRAMES, DEFAULT_STABILITY_THRESHOLD, MAX_STABILITY_FRAMES, MAX_STABILITY_THRESHOLD,
    MIN_STABILITY_FRAMES, MIN_STABILITY_THRESHOLD,
};
use crate::smoothing::SmoothingBuffer;
use crate::{Error, Result};

/// All-within-band convergence test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityDetector {
    threshold: f64,
    min_frames: usize,
}

impl StabilityDetector {
    /// Create a detector
    ///
    /// # Errors
    ///
    /// Returns an error if `threshold` is outside 1–15° or `min_frames` outside 3–30
    pub fn new(threshold: f64, min_frames: usize) -> Result<Self> {
        if !(MIN_STABILITY_THRESHOLD..=MAX_STABILITY_THRESHOLD).contains(&threshold) {
            return Err(Error::InvalidInput(format!(
                "Stability threshold must be between {MIN_STABILITY_THRESHOLD} and {MAX_STABILITY_THRESHOLD} degrees, got {threshold}"
            )));
        }
        if !(MIN_STABILITY_FRAMES..=MAX_STABILITY_FRAMES).contains(&min_frames) {
            return Err(Error::InvalidInput(format!(
                "Stability frames must be between {MIN_STABILITY_FRAMES} and {MAX_STABILITY_FRAMES}, got {min_frames}"
            )));
        }
        Ok(Self { threshold, min_frames })
    }

    /// Allowed deviation from the window mean in degrees
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of samples evaluated
    #[must_use]
    pub fn min_frames(&self) -> usize {
        self.min_frames
    }

    /// Window length actually evaluated against `buffer`.
    ///
    /// A buffer never holds more than its capacity, so larger settings are
    /// capped there.
    #[must_use]
    pub fn effective_frames(&self, buffer: &SmoothingBuffer) -> usize {
        self.min_frames.min(buffer.capacity())
    }

    /// Whether the newest samples have converged
    #[must_use]
    pub fn is_stable(&self, buffer: &SmoothingBuffer) -> bool {
        is_stable(buffer, self.threshold, self.effective_frames(buffer))
    }

    /// Statistics of the evaluated window, `None` until it is full
    #[must_use]
    pub fn stats(&self, buffer: &SmoothingBuffer) -> Option<Statistics> {
        let frames = self.effective_frames(buffer);
        if buffer.len() < frames {
            return None;
        }
        let window: Vec<f64> = buffer.recent(frames).collect();
        Some(Statistics::from_values(&window))
    }
}

impl Default for StabilityDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_STABILITY_THRESHOLD,
            min_frames: DEFAULT_STABILITY_FRAMES,
        }
    }
}

/// True iff the buffer holds at least `min_frames` samples and each of the
/// newest `min_frames` deviates from their mean by at most `threshold`
#[must_use]
pub fn is_stable(buffer: &SmoothingBuffer, threshold: f64, min_frames: usize) -> bool {
    if min_frames == 0 || buffer.len() < min_frames {
        return false;
    }
    let mean = crate::utils::mean(buffer.recent(min_frames));
    buffer.recent(min_frames).all(|v| (v - mean).abs() <= threshold)
}

/// Statistical summary of a stability window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Mean value of the window
    pub mean: f64,
    /// Largest absolute deviation from the mean
    pub max_deviation: f64,
    /// Minimum value in the window
    pub min: f64,
    /// Maximum value in the window
    pub max: f64,
    /// Range (max - min) of the window
    pub range: f64,
}

impl Statistics {
    fn from_values(values: &[f64]) -> Self {
        let mean = crate::utils::mean(values.iter().copied());
        let max_deviation = values.iter().map(|v| (v - mean).abs()).fold(0.0, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            mean,
            max_deviation,
            min,
            max,
            range: max - min,
        }
    }
}
