//! Pelvic compensation detection for lower-limb measurements.
//!
//! A patient can fake hip, knee or ankle motion by tilting the pelvis. The
//! line between both hip keypoints should stay close to horizontal.

use crate::constants::{DEFAULT_MAX_PELVIC_TILT, DEFAULT_MIN_HIP_CONFIDENCE, LEFT_HIP_INDEX, RIGHT_HIP_INDEX};
use crate::geometry::line_tilt;
use crate::joints::JointType;
use crate::landmark::Landmark;
use log::debug;

/// Result of a compensation check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompensationStatus {
    /// Joint is not affected by pelvic evasion
    NotApplicable,
    /// Hip keypoints missing or not confident enough
    Unavailable,
    /// Pelvis is level enough
    Level {
        /// Pelvic tilt in degrees
        tilt: f64,
    },
    /// Pelvis tilted beyond the allowed angle
    Detected {
        /// Pelvic tilt in degrees
        tilt: f64,
    },
}

impl CompensationStatus {
    /// Whether the reading is compromised
    #[must_use]
    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected { .. })
    }
}

/// Pelvic tilt check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensationDetector {
    max_tilt: f64,
    min_hip_confidence: f64,
}

impl CompensationDetector {
    /// Create a detector
    #[must_use]
    pub fn new(max_tilt: f64, min_hip_confidence: f64) -> Self {
        Self {
            max_tilt,
            min_hip_confidence,
        }
    }

    /// Check a frame for pelvic compensation while measuring `joint`
    #[must_use]
    pub fn check(&self, joint: JointType, landmarks: &[Landmark]) -> CompensationStatus {
        if !joint.is_lower_limb() {
            return CompensationStatus::NotApplicable;
        }

        let hips = (landmarks.get(LEFT_HIP_INDEX), landmarks.get(RIGHT_HIP_INDEX));
        let (Some(left), Some(right)) = hips else {
            return CompensationStatus::Unavailable;
        };
        if left.confidence <= self.min_hip_confidence || right.confidence <= self.min_hip_confidence {
            return CompensationStatus::Unavailable;
        }

        let tilt = pelvic_tilt(left, right);
        if tilt.abs() > self.max_tilt {
            debug!("Pelvic tilt {tilt:.1}° exceeds {:.1}°", self.max_tilt);
            CompensationStatus::Detected { tilt }
        } else {
            CompensationStatus::Level { tilt }
        }
    }
}

impl Default for CompensationDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PELVIC_TILT, DEFAULT_MIN_HIP_CONFIDENCE)
    }
}

/// Tilt of the hip line against the horizontal, in degrees within [-90, 90].
///
/// A patient facing the camera appears mirrored (right hip on the image
/// left), so the direction of the line is folded away.
#[must_use]
pub fn pelvic_tilt(hip_left: &Landmark, hip_right: &Landmark) -> f64 {
    let tilt = line_tilt(hip_left, hip_right);
    if tilt > 90.0 {
        tilt - 180.0
    } else if tilt < -90.0 {
        tilt + 180.0
    } else {
        tilt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_hips(left: Landmark, right: Landmark) -> Vec<Landmark> {
        let mut landmarks = vec![Landmark::planar(0.0, 0.0, 0.0); 33];
        landmarks[LEFT_HIP_INDEX] = left;
        landmarks[RIGHT_HIP_INDEX] = right;
        landmarks
    }

    #[test]
    fn test_level_pelvis() {
        let lms = with_hips(Landmark::planar(100.0, 200.0, 0.9), Landmark::planar(200.0, 205.0, 0.9));
        let status = CompensationDetector::default().check(JointType::Knee, &lms);
        assert!(matches!(status, CompensationStatus::Level { .. }));
    }

    #[test]
    fn test_tilted_pelvis() {
        // 30° tilt
        let dy = 100.0 * 30f64.to_radians().tan();
        let lms = with_hips(Landmark::planar(100.0, 200.0, 0.9), Landmark::planar(200.0, 200.0 + dy, 0.9));
        let status = CompensationDetector::default().check(JointType::Hip, &lms);
        match status {
            CompensationStatus::Detected { tilt } => assert!((tilt - 30.0).abs() < 1e-6),
            other => panic!("Expected compensation, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_tilt_counts() {
        let lms = with_hips(Landmark::planar(100.0, 200.0, 0.9), Landmark::planar(200.0, 150.0, 0.9));
        assert!(CompensationDetector::default().check(JointType::Ankle, &lms).is_detected());
    }

    #[test]
    fn test_mirrored_hips_are_level() {
        let lms = with_hips(Landmark::planar(200.0, 200.0, 0.9), Landmark::planar(100.0, 203.0, 0.9));
        let status = CompensationDetector::default().check(JointType::Knee, &lms);
        match status {
            CompensationStatus::Level { tilt } => assert!(tilt.abs() < 2.0),
            other => panic!("Expected level pelvis, got {other:?}"),
        }
    }

    #[test]
    fn test_upper_limb_not_applicable() {
        let lms = with_hips(Landmark::planar(100.0, 200.0, 0.9), Landmark::planar(200.0, 300.0, 0.9));
        assert_eq!(
            CompensationDetector::default().check(JointType::Shoulder, &lms),
            CompensationStatus::NotApplicable
        );
    }

    #[test]
    fn test_low_confidence_hips_are_ignored() {
        let lms = with_hips(Landmark::planar(100.0, 200.0, 0.5), Landmark::planar(200.0, 300.0, 0.9));
        assert_eq!(
            CompensationDetector::default().check(JointType::Knee, &lms),
            CompensationStatus::Unavailable
        );
        assert_eq!(
            CompensationDetector::default().check(JointType::Knee, &[]),
            CompensationStatus::Unavailable
        );
    }
}
