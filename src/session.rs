//! Measurement session state machine.
//!
//! One [`MeasurementSession`] owns every piece of per-measurement state
//! (smoothing buffer, anchor, draft, lifecycle state) and is advanced one
//! frame at a time. Each call to [`MeasurementSession::process_frame`] is a
//! single atomic update; nothing else holds references into the session.
//!
//! ```text
//! Searching -> Aligned -> Tracking <-> Stable -> Frozen -> Confirmed
//!     ^                                      |
//!     +--------------- retake ---------------+
//! ```

use crate::compensation::{CompensationDetector, CompensationStatus};
use crate::config::Config;
use crate::constants::SMOOTHING_BUFFER_CAPACITY;
use crate::drift::{DriftGuard, DriftStatus};
use crate::formatter::NeutralZeroSide;
use crate::geometry::vertex_angle;
use crate::joints::{JointKey, JointMovementConfig, JointRegistry};
use crate::landmark::{triple_confidence, validate, PoseFrame};
use crate::measurement::{Measurement, MeasurementDraft, MeasurementStore};
use crate::rom::RomTransform;
use crate::smoothing::{AngleSample, SmoothingBuffer};
use crate::stability::{StabilityDetector, Statistics};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::fmt;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for confident landmarks and a positive angle
    Searching,
    /// Anchor captured on this frame
    Aligned,
    /// Collecting samples
    Tracking,
    /// Newest samples have converged
    Stable,
    /// Value held for the user to accept or reject
    Frozen,
    /// Measurement committed; the session is finished
    Confirmed,
}

impl SessionState {
    /// Short identifier
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Searching => "searching",
            Self::Aligned => "aligned",
            Self::Tracking => "tracking",
            Self::Stable => "stable",
            Self::Frozen => "frozen",
            Self::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient per-frame condition shown to the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationError {
    /// Required landmarks missing or not confident enough
    LowConfidence,
    /// Vertex moved too far from the anchor
    DriftExceeded {
        /// Distance from the anchor
        distance: f64,
    },
    /// Pelvis tilted; the reading may be faked
    CompensationDetected {
        /// Pelvic tilt in degrees
        tilt: f64,
    },
}

impl ValidationError {
    /// User-facing message
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::LowConfidence => "Joint not clearly visible. Check lighting and camera position.",
            Self::DriftExceeded { .. } => "Please re-align the joint with its starting position.",
            Self::CompensationDetected { .. } => "Keep your pelvis level while moving.",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Overlay data published once per processed frame
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStatus {
    /// ROM value to display (smoothed once tracking)
    pub current_angle: f64,
    /// Lifecycle state after the frame
    pub session_state: SessionState,
    /// Condition that affected this frame
    pub validation_error: Option<ValidationError>,
    /// Number of frames seen by the session
    pub frame_index: u64,
    /// Samples currently buffered
    pub buffered_samples: usize,
}

/// Per-session tuning derived from [`Config`]
///
/// Checked again by [`MeasurementSession::new`], so hand-built values are
/// rejected there rather than at the first frame.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Minimum confidence for each landmark of the triple
    pub min_confidence: f64,
    /// Moving average window, at most [`SMOOTHING_BUFFER_CAPACITY`]
    pub smoothing_window: usize,
    pub stability: StabilityDetector,
    /// Freeze after `freeze_delay_ms` of continuous stability
    pub auto_freeze: bool,
    pub freeze_delay_ms: u64,
    /// Maximum vertex distance from the anchor
    pub drift_tolerance: f64,
    pub compensation: CompensationDetector,
}

impl SessionSettings {
    /// Build settings from a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            min_confidence: config.validation.min_confidence,
            smoothing_window: config.smoothing.window_size,
            stability: StabilityDetector::new(config.stability.threshold_degrees, config.stability.min_frames)?,
            auto_freeze: config.stability.auto_freeze,
            freeze_delay_ms: config.stability.freeze_delay_ms,
            drift_tolerance: config.drift.tolerance,
            compensation: CompensationDetector::new(
                config.compensation.max_pelvic_tilt_degrees,
                config.compensation.min_hip_confidence,
            ),
        })
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        let config = Config::default();
        Self {
            min_confidence: config.validation.min_confidence,
            smoothing_window: config.smoothing.window_size,
            stability: StabilityDetector::default(),
            auto_freeze: config.stability.auto_freeze,
            freeze_delay_ms: config.stability.freeze_delay_ms,
            drift_tolerance: config.drift.tolerance,
            compensation: CompensationDetector::default(),
        }
    }
}

impl SessionSettings {
    /// Check values that would otherwise corrupt the pipeline
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first bad value
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::InvalidInput(format!(
                "Minimum confidence {} is outside 0.0-1.0",
                self.min_confidence
            )));
        }
        if !(1..=SMOOTHING_BUFFER_CAPACITY).contains(&self.smoothing_window) {
            return Err(Error::InvalidInput(format!(
                "Smoothing window {} must be between 1 and {SMOOTHING_BUFFER_CAPACITY}",
                self.smoothing_window
            )));
        }
        if !(self.drift_tolerance.is_finite() && self.drift_tolerance > 0.0) {
            return Err(Error::InvalidInput(format!(
                "Drift tolerance {} must be positive",
                self.drift_tolerance
            )));
        }
        Ok(())
    }
}

/// State machine for one joint movement measurement
#[derive(Debug)]
pub struct MeasurementSession {
    key: JointKey,
    joint: JointMovementConfig,
    transform: RomTransform,
    min_confidence: f64,
    auto_freeze: bool,
    freeze_delay_ms: u64,
    buffer: SmoothingBuffer,
    stability: StabilityDetector,
    drift: DriftGuard,
    compensation: CompensationDetector,
    state: SessionState,
    draft: Option<MeasurementDraft>,
    stable_since_ms: Option<u64>,
    current_angle: f64,
    frame_index: u64,
}

impl MeasurementSession {
    /// Start a session for `key`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the key is not registered or the
    /// movement cannot be mapped to ROM degrees or Neutral-Zero notation, and
    /// [`Error::InvalidInput`] if `settings` are out of range
    pub fn new(registry: &JointRegistry, key: JointKey, settings: SessionSettings) -> Result<Self> {
        settings.validate()?;
        let joint = registry.get(&key)?.clone();
        let transform = RomTransform::for_movement(key.joint, key.movement)?;
        NeutralZeroSide::for_movement(key.joint, key.movement)?;

        info!("Starting measurement session for {}", joint.label);

        Ok(Self {
            key,
            joint,
            transform,
            min_confidence: settings.min_confidence,
            auto_freeze: settings.auto_freeze,
            freeze_delay_ms: settings.freeze_delay_ms,
            buffer: SmoothingBuffer::new(SMOOTHING_BUFFER_CAPACITY).with_window(settings.smoothing_window),
            stability: settings.stability,
            drift: DriftGuard::new(settings.drift_tolerance),
            compensation: settings.compensation,
            state: SessionState::Searching,
            draft: None,
            stable_since_ms: None,
            current_angle: 0.0,
            frame_index: 0,
        })
    }

    /// Advance the state machine by one frame
    pub fn process_frame(&mut self, frame: &PoseFrame) -> LiveStatus {
        self.frame_index += 1;

        if matches!(self.state, SessionState::Frozen | SessionState::Confirmed) {
            return self.status(None);
        }

        let triple = self.joint.landmark_triple;
        let landmarks = &frame.landmarks;
        let resolved = triple.resolve(landmarks);
        let (a, b, c) = match resolved {
            Some(points) if validate(landmarks, triple, self.min_confidence) => points,
            _ => {
                if self.state != SessionState::Searching {
                    info!("Landmarks lost in state {}, searching again", self.state);
                    self.reset_tracking();
                }
                return self.status(Some(ValidationError::LowConfidence));
            }
        };

        let rom = self.transform.apply(vertex_angle(a, b, c));
        let vertex = b.screen_position();

        if self.state == SessionState::Searching {
            if rom <= 0.0 {
                self.current_angle = rom;
                return self.status(None);
            }
            self.drift.align(vertex);
            self.state = SessionState::Aligned;
            info!("Joint aligned at ROM {rom:.1}°");
        } else if let DriftStatus::Exceeded { distance } = self.drift.check(&vertex) {
            self.leave_stable();
            return self.status(Some(ValidationError::DriftExceeded { distance }));
        } else {
            self.state = match self.state {
                SessionState::Aligned => SessionState::Tracking,
                other => other,
            };
        }

        self.buffer.push(AngleSample {
            value: rom,
            frame_index: self.frame_index,
        });
        self.current_angle = self.buffer.smoothed();
        self.draft = Some(MeasurementDraft {
            angle: self.current_angle,
            joint_type: self.key.joint,
            movement_type: self.key.movement,
            body_side: self.key.side,
            confidence: triple_confidence(landmarks, triple),
            timestamp_candidate_ms: frame.timestamp_ms,
        });

        let compensation = match self.compensation.check(self.key.joint, landmarks) {
            CompensationStatus::Detected { tilt } => Some(ValidationError::CompensationDetected { tilt }),
            _ => None,
        };

        if self.state == SessionState::Aligned {
            return self.status(compensation);
        }

        if compensation.is_none() && self.stability.is_stable(&self.buffer) {
            self.enter_stable(frame.timestamp_ms);
        } else {
            self.leave_stable();
        }

        self.status(compensation)
    }

    /// Freeze the current value on user request
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the session is stable
    pub fn freeze(&mut self) -> Result<()> {
        if self.state != SessionState::Stable {
            return Err(Error::InvalidState(format!(
                "Cannot freeze while {}, the reading is not stable",
                self.state
            )));
        }
        self.freeze_now();
        Ok(())
    }

    /// Accept the frozen value and hand it to `store`
    ///
    /// On failure the session stays frozen with its draft intact so the
    /// caller can retry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless frozen and [`Error::SaveFailure`]
    /// if the store rejects the record
    pub fn confirm(&mut self, store: &mut dyn MeasurementStore, timestamp: DateTime<Utc>) -> Result<Measurement> {
        let draft = match (&self.state, &self.draft) {
            (SessionState::Frozen, Some(draft)) => draft,
            _ => {
                return Err(Error::InvalidState(format!(
                    "Cannot confirm while {}, freeze the reading first",
                    self.state
                )))
            }
        };

        let measurement = draft.finalize(timestamp)?;
        if let Err(e) = store.save(&measurement) {
            warn!("Saving measurement {} failed: {e}", measurement.id);
            return Err(match e {
                Error::SaveFailure(_) => e,
                other => Error::SaveFailure(other.to_string()),
            });
        }

        info!(
            "Measurement confirmed: {} {}",
            self.joint.label, measurement.neutral_zero_format
        );
        self.state = SessionState::Confirmed;
        Ok(measurement)
    }

    /// Discard the draft and start over; repeated calls are harmless
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once the measurement is confirmed
    pub fn retake(&mut self) -> Result<()> {
        if self.state == SessionState::Confirmed {
            return Err(Error::InvalidState(
                "Measurement already confirmed, start a new session".to_string(),
            ));
        }
        debug!("Retake requested in state {}", self.state);
        self.reset_tracking();
        self.current_angle = 0.0;
        Ok(())
    }

    /// Apply new user stability settings; buffered samples are kept
    ///
    /// # Errors
    ///
    /// Returns an error if the values are outside the allowed ranges
    pub fn update_stability(&mut self, threshold: f64, min_frames: usize) -> Result<()> {
        self.stability = StabilityDetector::new(threshold, min_frames)?;
        debug!("Stability settings changed to {threshold}° over {min_frames} frames");
        Ok(())
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Snapshot of the overlay data without processing a frame
    #[must_use]
    pub fn live_status(&self) -> LiveStatus {
        self.status(None)
    }

    /// Displayed ROM value
    #[must_use]
    pub fn current_angle(&self) -> f64 {
        self.current_angle
    }

    /// Active draft, if any
    #[must_use]
    pub fn draft(&self) -> Option<&MeasurementDraft> {
        self.draft.as_ref()
    }

    /// Smoothing buffer
    #[must_use]
    pub fn buffer(&self) -> &SmoothingBuffer {
        &self.buffer
    }

    /// Anchor and drift guard
    #[must_use]
    pub fn drift_guard(&self) -> &DriftGuard {
        &self.drift
    }

    /// Statistics of the stability window
    #[must_use]
    pub fn stability_stats(&self) -> Option<Statistics> {
        self.stability.stats(&self.buffer)
    }

    /// Joint movement being measured
    #[must_use]
    pub fn key(&self) -> JointKey {
        self.key
    }

    /// Registry entry of the measured joint movement
    #[must_use]
    pub fn joint_config(&self) -> &JointMovementConfig {
        &self.joint
    }

    fn enter_stable(&mut self, now_ms: u64) {
        if self.state != SessionState::Stable {
            debug!("Reading stable at {:.1}°", self.current_angle);
            self.state = SessionState::Stable;
            self.stable_since_ms = Some(now_ms);
        }

        let since = self.stable_since_ms.unwrap_or(now_ms);
        if self.auto_freeze && now_ms.saturating_sub(since) >= self.freeze_delay_ms {
            self.freeze_now();
        }
    }

    fn leave_stable(&mut self) {
        if self.state == SessionState::Stable {
            debug!("Reading no longer stable");
            self.state = SessionState::Tracking;
        }
        self.stable_since_ms = None;
    }

    fn freeze_now(&mut self) {
        info!("Reading frozen at {:.1}°", self.current_angle);
        self.state = SessionState::Frozen;
        self.stable_since_ms = None;
    }

    fn reset_tracking(&mut self) {
        self.buffer.clear();
        self.drift.clear();
        self.draft = None;
        self.stable_since_ms = None;
        self.state = SessionState::Searching;
    }

    fn status(&self, validation_error: Option<ValidationError>) -> LiveStatus {
        LiveStatus {
            current_angle: self.current_angle,
            session_state: self.state,
            validation_error,
            frame_index: self.frame_index,
            buffered_samples: self.buffer.len(),
        }
    }
}
