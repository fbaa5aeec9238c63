//! Progress evaluation over committed measurements.

use crate::constants::{ALERT_MIN_MEASUREMENTS, REGRESSION_DROP_DEGREES, STAGNATION_RANGE_DEGREES};
use crate::joints::{JointMovementConfig, JointType, MovementType};
use crate::measurement::Measurement;
use serde::Serialize;
use std::fmt;

/// Where a value lies relative to the healthy range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeAssessment {
    Below,
    Within,
    Above,
}

/// Classify `angle` against the registered normal range (inclusive)
#[must_use]
pub fn assess_normal_range(config: &JointMovementConfig, angle: f64) -> RangeAssessment {
    let (min, max) = config.normal_range;
    if angle < min {
        RangeAssessment::Below
    } else if angle > max {
        RangeAssessment::Above
    } else {
        RangeAssessment::Within
    }
}

/// Milestone importance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    Target,
    Stretch,
}

/// Post-operative rehabilitation goal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub week_post_op: u32,
    pub joint_type: JointType,
    pub movement_type: MovementType,
    pub target_angle: f64,
    pub label: &'static str,
    pub priority: Priority,
}

const fn milestone(
    week_post_op: u32,
    joint_type: JointType,
    movement_type: MovementType,
    target_angle: f64,
    label: &'static str,
    priority: Priority,
) -> Milestone {
    Milestone {
        week_post_op,
        joint_type,
        movement_type,
        target_angle,
        label,
        priority,
    }
}

/// Goals after total knee replacement
pub const KNEE_TEP_MILESTONES: &[Milestone] = &[
    milestone(1, JointType::Knee, MovementType::Flexion, 70.0, "Week 1: 70° flexion", Priority::Critical),
    milestone(2, JointType::Knee, MovementType::Flexion, 80.0, "Week 2: 80° flexion", Priority::Critical),
    milestone(4, JointType::Knee, MovementType::Flexion, 90.0, "Week 4: 90° flexion", Priority::Critical),
    milestone(6, JointType::Knee, MovementType::Flexion, 100.0, "Week 6: 100° flexion", Priority::Target),
    milestone(8, JointType::Knee, MovementType::Flexion, 110.0, "Week 8: 110° flexion", Priority::Target),
    milestone(12, JointType::Knee, MovementType::Flexion, 120.0, "Week 12: 120° flexion", Priority::Stretch),
    milestone(1, JointType::Knee, MovementType::Extension, 10.0, "Week 1: extension deficit below 10°", Priority::Critical),
    milestone(4, JointType::Knee, MovementType::Extension, 5.0, "Week 4: extension deficit below 5°", Priority::Critical),
    milestone(8, JointType::Knee, MovementType::Extension, 0.0, "Week 8: full extension", Priority::Target),
];

/// Goals after shoulder surgery
pub const SHOULDER_OP_MILESTONES: &[Milestone] = &[
    milestone(2, JointType::Shoulder, MovementType::Flexion, 90.0, "Week 2: 90° flexion (passive)", Priority::Critical),
    milestone(6, JointType::Shoulder, MovementType::Flexion, 120.0, "Week 6: 120° flexion", Priority::Target),
    milestone(6, JointType::Shoulder, MovementType::Abduction, 90.0, "Week 6: 90° abduction", Priority::Target),
    milestone(12, JointType::Shoulder, MovementType::Flexion, 160.0, "Week 12: 160° flexion", Priority::Stretch),
    milestone(12, JointType::Shoulder, MovementType::Abduction, 150.0, "Week 12: 150° abduction", Priority::Stretch),
];

impl Milestone {
    /// Whether this milestone tracks `joint`/`movement`
    #[must_use]
    pub fn applies_to(&self, joint: JointType, movement: MovementType) -> bool {
        self.joint_type == joint && self.movement_type == movement
    }
}

/// Milestones whose week has been reached by `week_post_op`
pub fn milestones_due(table: &[Milestone], week_post_op: u32) -> impl Iterator<Item = &Milestone> {
    table.iter().filter(move |m| m.week_post_op <= week_post_op)
}

/// Whether `angle` satisfies the milestone.
///
/// Extension goals are deficits: the knee must come within the target of
/// straight, so smaller magnitudes are better.
#[must_use]
pub fn milestone_reached(milestone: &Milestone, angle: f64) -> bool {
    match milestone.movement_type {
        MovementType::Extension => angle.abs() <= milestone.target_angle,
        _ => angle >= milestone.target_angle,
    }
}

/// Severity of a progress alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

/// Progress alert
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Alert {
    /// No meaningful change over the recent measurements
    Stagnation { count: usize, range: f64 },
    /// The newest value dropped compared to the third newest
    Regression { drop: f64 },
}

impl Alert {
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Stagnation { .. } => Severity::Warning,
            Self::Regression { .. } => Severity::Critical,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stagnation { count, .. } => write!(
                f,
                "No progress over the last {count} measurements. Talk to your therapist."
            ),
            Self::Regression { drop } => write!(
                f,
                "Your range of motion dropped by {drop:.0}°. Please contact your doctor."
            ),
        }
    }
}

/// Check measurements (newest first) for stagnation or regression
#[must_use]
pub fn check_for_alerts(measurements: &[Measurement]) -> Option<Alert> {
    let angles: Vec<f64> = measurements.iter().map(|m| m.angle).collect();
    check_angles(&angles)
}

/// [`check_for_alerts`] over bare angles, newest first
#[must_use]
pub fn check_angles(angles: &[f64]) -> Option<Alert> {
    if angles.len() < ALERT_MIN_MEASUREMENTS {
        return None;
    }

    let recent = &angles[..ALERT_MIN_MEASUREMENTS];
    let max = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = recent.iter().copied().fold(f64::INFINITY, f64::min);
    let range = max - min;
    if range < STAGNATION_RANGE_DEGREES {
        return Some(Alert::Stagnation {
            count: recent.len(),
            range,
        });
    }

    let drop = angles[2] - angles[0];
    if drop >= REGRESSION_DROP_DEGREES {
        return Some(Alert::Regression { drop });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joints::{BodySide, JointKey, JointRegistry};

    #[test]
    fn test_normal_range_assessment() {
        let registry = JointRegistry::standard();
        let knee = registry
            .get(&JointKey::new(JointType::Knee, BodySide::Left, MovementType::Flexion))
            .unwrap();
        assert_eq!(assess_normal_range(knee, -3.0), RangeAssessment::Below);
        assert_eq!(assess_normal_range(knee, 150.0), RangeAssessment::Within);
        assert_eq!(assess_normal_range(knee, 151.0), RangeAssessment::Above);
    }

    #[test]
    fn test_milestones_due() {
        let due: Vec<_> = milestones_due(KNEE_TEP_MILESTONES, 4)
            .filter(|m| m.applies_to(JointType::Knee, MovementType::Flexion))
            .map(|m| m.target_angle)
            .collect();
        assert_eq!(due, vec![70.0, 80.0, 90.0]);
        assert_eq!(milestones_due(SHOULDER_OP_MILESTONES, 1).count(), 0);
    }

    #[test]
    fn test_milestone_reached() {
        let flexion = &KNEE_TEP_MILESTONES[2];
        assert!(milestone_reached(flexion, 90.0));
        assert!(!milestone_reached(flexion, 89.5));

        let extension = &KNEE_TEP_MILESTONES[7];
        assert!(milestone_reached(extension, 3.0));
        assert!(milestone_reached(extension, -5.0));
        assert!(!milestone_reached(extension, 8.0));
    }

    #[test]
    fn test_too_few_measurements() {
        assert_eq!(check_angles(&[90.0, 90.0, 90.0, 90.0]), None);
    }

    #[test]
    fn test_stagnation() {
        let alert = check_angles(&[91.0, 90.0, 92.0, 90.5, 91.5]).unwrap();
        assert!(matches!(alert, Alert::Stagnation { count: 5, .. }));
        assert_eq!(alert.severity(), Severity::Warning);
    }

    #[test]
    fn test_regression() {
        let alert = check_angles(&[85.0, 88.0, 92.0, 95.0, 80.0]).unwrap();
        assert_eq!(alert, Alert::Regression { drop: 7.0 });
        assert_eq!(alert.severity(), Severity::Critical);
    }

    #[test]
    fn test_steady_progress() {
        assert_eq!(check_angles(&[100.0, 96.0, 92.0, 88.0, 84.0, 80.0]), None);
    }

    #[test]
    fn test_only_newest_five_count_for_stagnation() {
        assert!(check_angles(&[90.0, 90.5, 91.0, 90.0, 90.2, 60.0]).is_some());
    }
}
