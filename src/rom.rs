//! Conversion from raw vertex angles to clinical range-of-motion degrees.
//!
//! Every joint is normalised to "0 = anatomical neutral, increasing = more
//! motion". A straight limb reads 180° at the vertex, the foot rests at 90°
//! against the shank.

use crate::constants::{RIGHT_ANGLE, STRAIGHT_ANGLE};
use crate::joints::{JointType, MovementType};
use crate::{Error, Result};

/// Transform applied to a raw angle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomTransform {
    /// `max(0, 180 - raw)`
    FlexionFromStraight,
    /// `180 - raw`, negative values mean hyperextension
    SignedFromStraight,
    /// `raw`
    PassThrough,
    /// `|180 - raw|`
    DeviationFromStraight,
    /// `|90 - raw|`
    DeviationFromRightAngle,
}

impl RomTransform {
    /// Resolve the transform for a joint movement
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for combinations without a clinical mapping
    pub fn for_movement(joint: JointType, movement: MovementType) -> Result<Self> {
        use JointType as J;
        use MovementType as M;

        match (joint, movement) {
            (J::Knee | J::Hip | J::Elbow, M::Flexion) => Ok(Self::FlexionFromStraight),
            (J::Knee | J::Elbow, M::Extension) => Ok(Self::SignedFromStraight),
            (J::Shoulder, M::Flexion | M::Abduction) => Ok(Self::PassThrough),
            (J::Wrist, M::Flexion | M::Extension) => Ok(Self::DeviationFromStraight),
            (J::Ankle, M::Dorsiflexion | M::Plantarflexion) => Ok(Self::DeviationFromRightAngle),
            _ => Err(Error::Configuration(format!(
                "No ROM mapping for {joint}_{movement}"
            ))),
        }
    }

    /// Apply the transform
    #[must_use]
    pub fn apply(self, raw_angle: f64) -> f64 {
        match self {
            Self::FlexionFromStraight => (STRAIGHT_ANGLE - raw_angle).max(0.0),
            Self::SignedFromStraight => STRAIGHT_ANGLE - raw_angle,
            Self::PassThrough => raw_angle,
            Self::DeviationFromStraight => (STRAIGHT_ANGLE - raw_angle).abs(),
            Self::DeviationFromRightAngle => (RIGHT_ANGLE - raw_angle).abs(),
        }
    }
}

/// Convert a raw vertex angle into clinical ROM degrees
///
/// # Errors
///
/// Returns [`Error::Configuration`] when the joint/movement pair is unmapped
pub fn to_rom(raw_angle: f64, joint: JointType, movement: MovementType) -> Result<f64> {
    Ok(RomTransform::for_movement(joint, movement)?.apply(raw_angle))
}
