//! Constants used throughout the measurement pipeline

/// Number of keypoints delivered by the BlazePose topology
pub const NUM_POSE_LANDMARKS: usize = 33;

/// BlazePose index of the left hip
pub const LEFT_HIP_INDEX: usize = 23;

/// BlazePose index of the right hip
pub const RIGHT_HIP_INDEX: usize = 24;

/// Default minimum landmark confidence for the validator
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Smoothing buffer capacity (samples)
pub const SMOOTHING_BUFFER_CAPACITY: usize = 20;

/// Default moving average window
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Stability defaults and user-adjustable bounds
pub const DEFAULT_STABILITY_THRESHOLD: f64 = 4.0;
pub const MIN_STABILITY_THRESHOLD: f64 = 1.0;
pub const MAX_STABILITY_THRESHOLD: f64 = 15.0;
pub const DEFAULT_STABILITY_FRAMES: usize = 10;
pub const MIN_STABILITY_FRAMES: usize = 3;
pub const MAX_STABILITY_FRAMES: usize = 30;

/// Continuous stability required before auto-freeze (milliseconds)
pub const DEFAULT_FREEZE_DELAY_MS: u64 = 500;

/// Maximum anchor-to-vertex distance before a frame is rejected
pub const DEFAULT_DRIFT_TOLERANCE: f64 = 150.0;

/// Pelvic tilt beyond which a reading counts as compensated (degrees)
pub const DEFAULT_MAX_PELVIC_TILT: f64 = 15.0;

/// Hip landmarks must exceed this confidence to evaluate pelvic tilt
pub const DEFAULT_MIN_HIP_CONFIDENCE: f64 = 0.5;

/// Straight-limb raw angle (degrees)
pub const STRAIGHT_ANGLE: f64 = 180.0;

/// Foot-to-shank neutral raw angle (degrees)
pub const RIGHT_ANGLE: f64 = 90.0;

/// Alert thresholds over committed measurements
pub const ALERT_MIN_MEASUREMENTS: usize = 5;
pub const STAGNATION_RANGE_DEGREES: f64 = 3.0;
pub const REGRESSION_DROP_DEGREES: f64 = 5.0;

/// Engine events held before per-frame status updates are dropped
pub const EVENT_QUEUE_CAPACITY: usize = 64;
