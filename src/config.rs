//! Configuration management for the measurement engine

use crate::constants::{
    DEFAULT_DRIFT_TOLERANCE, DEFAULT_FREEZE_DELAY_MS, DEFAULT_MAX_PELVIC_TILT, DEFAULT_MIN_CONFIDENCE,
    DEFAULT_MIN_HIP_CONFIDENCE, DEFAULT_SMOOTHING_WINDOW, DEFAULT_STABILITY_FRAMES, DEFAULT_STABILITY_THRESHOLD,
    MAX_STABILITY_FRAMES, MAX_STABILITY_THRESHOLD, MIN_STABILITY_FRAMES, MIN_STABILITY_THRESHOLD,
    SMOOTHING_BUFFER_CAPACITY,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Landmark validation
    pub validation: ValidationConfig,

    /// Moving average smoothing
    pub smoothing: SmoothingConfig,

    /// Stability detection and freezing
    pub stability: StabilityConfig,

    /// Anchor drift rejection
    pub drift: DriftConfig,

    /// Pelvic compensation detection
    pub compensation: CompensationConfig,
}

/// Landmark validation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum confidence for each landmark of the triple (0.0-1.0)
    pub min_confidence: f64,
}

/// Smoothing buffer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Moving average window; the buffer itself always holds
    /// [`SMOOTHING_BUFFER_CAPACITY`] samples
    pub window_size: usize,
}

/// Stability parameters; the user-adjustable pair mirrors the settings screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Maximum deviation from the window mean (1-15 degrees)
    pub threshold_degrees: f64,

    /// Samples evaluated (3-30)
    pub min_frames: usize,

    /// Freeze automatically after continuous stability
    pub auto_freeze: bool,

    /// Continuous stability required before auto-freeze
    pub freeze_delay_ms: u64,
}

/// Drift guard parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Maximum anchor-to-vertex distance in keypoint coordinate units
    pub tolerance: f64,
}

/// Compensation detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompensationConfig {
    /// Maximum pelvic tilt in degrees
    pub max_pelvic_tilt_degrees: f64,

    /// Minimum hip landmark confidence required to evaluate tilt
    pub min_hip_confidence: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            threshold_degrees: DEFAULT_STABILITY_THRESHOLD,
            min_frames: DEFAULT_STABILITY_FRAMES,
            auto_freeze: true,
            freeze_delay_ms: DEFAULT_FREEZE_DELAY_MS,
        }
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_DRIFT_TOLERANCE,
        }
    }
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            max_pelvic_tilt_degrees: DEFAULT_MAX_PELVIC_TILT,
            min_hip_confidence: DEFAULT_MIN_HIP_CONFIDENCE,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the YAML is malformed
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.validation.min_confidence) {
            return Err(Error::ConfigError(
                "Minimum landmark confidence must be between 0.0 and 1.0".to_string(),
            ));
        }

        if !(1..=SMOOTHING_BUFFER_CAPACITY).contains(&self.smoothing.window_size) {
            return Err(Error::ConfigError(format!(
                "Smoothing window must be between 1 and the buffer capacity ({SMOOTHING_BUFFER_CAPACITY})"
            )));
        }

        if !(MIN_STABILITY_THRESHOLD..=MAX_STABILITY_THRESHOLD).contains(&self.stability.threshold_degrees) {
            return Err(Error::ConfigError(format!(
                "Stability threshold must be between {MIN_STABILITY_THRESHOLD} and {MAX_STABILITY_THRESHOLD} degrees"
            )));
        }
        if !(MIN_STABILITY_FRAMES..=MAX_STABILITY_FRAMES).contains(&self.stability.min_frames) {
            return Err(Error::ConfigError(format!(
                "Stability frames must be between {MIN_STABILITY_FRAMES} and {MAX_STABILITY_FRAMES}"
            )));
        }

        if !(self.drift.tolerance.is_finite() && self.drift.tolerance > 0.0) {
            return Err(Error::ConfigError("Drift tolerance must be positive".to_string()));
        }

        if !(0.0..90.0).contains(&self.compensation.max_pelvic_tilt_degrees) {
            return Err(Error::ConfigError(
                "Maximum pelvic tilt must be between 0 and 90 degrees".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.compensation.min_hip_confidence) {
            return Err(Error::ConfigError(
                "Minimum hip confidence must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# ROM Measurement Configuration

# Landmark validation
validation:
  min_confidence: 0.5

# Moving average smoothing
smoothing:
  window_size: 5

# Stability detection and freezing
stability:
  threshold_degrees: 4.0
  min_frames: 10
  auto_freeze: true
  freeze_delay_ms: 500

# Anchor drift rejection (keypoint coordinate units)
drift:
  tolerance: 150.0

# Pelvic compensation detection
compensation:
  max_pelvic_tilt_degrees: 15.0
  min_hip_confidence: 0.5
"#;
