//! Alignment anchor and drift rejection.
//!
//! The vertex position at the moment of alignment becomes the anchor. While
//! aligned, frames whose vertex strays further than the tolerance are
//! rejected, but the anchor survives so the patient can move back.

use crate::constants::DEFAULT_DRIFT_TOLERANCE;
use crate::geometry::planar_distance;
use log::{debug, warn};
use nalgebra::Point2;

/// Outcome of comparing a vertex position with the anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftStatus {
    /// No anchor has been set
    Unanchored,
    /// Vertex is within tolerance of the anchor
    WithinTolerance {
        /// Distance from the anchor
        distance: f64,
    },
    /// Vertex moved too far; the frame must not be committed
    Exceeded {
        /// Distance from the anchor
        distance: f64,
    },
}

impl DriftStatus {
    /// Whether the frame has to be rejected
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        matches!(self, Self::Exceeded { .. })
    }
}

/// Anchor holder and drift check
#[derive(Debug, Clone)]
pub struct DriftGuard {
    tolerance: f64,
    anchor: Option<Point2<f64>>,
}

impl DriftGuard {
    /// Create a guard with the given tolerance in keypoint coordinate units
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance, anchor: None }
    }

    /// Pin the anchor at `position`
    pub fn align(&mut self, position: Point2<f64>) {
        debug!("Anchor set at ({:.1}, {:.1})", position.x, position.y);
        self.anchor = Some(position);
    }

    /// Compare `position` with the anchor
    #[must_use]
    pub fn check(&self, position: &Point2<f64>) -> DriftStatus {
        let Some(anchor) = &self.anchor else {
            return DriftStatus::Unanchored;
        };

        let distance = planar_distance(anchor, position);
        // NaN compares false against any tolerance
        if !distance.is_finite() || distance > self.tolerance {
            warn!(
                "Joint drifted {distance:.1} from anchor (tolerance {:.1}), re-align required",
                self.tolerance
            );
            DriftStatus::Exceeded { distance }
        } else {
            DriftStatus::WithinTolerance { distance }
        }
    }

    /// Current anchor
    #[must_use]
    pub fn anchor(&self) -> Option<Point2<f64>> {
        self.anchor
    }

    /// Whether an anchor is set
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.anchor.is_some()
    }

    /// Drift tolerance
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Forget the anchor
    pub fn clear(&mut self) {
        self.anchor = None;
    }
}

impl Default for DriftGuard {
    fn default() -> Self {
        Self::new(DEFAULT_DRIFT_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unanchored() {
        let guard = DriftGuard::default();
        assert_eq!(guard.check(&Point2::new(0.0, 0.0)), DriftStatus::Unanchored);
        assert!(!guard.is_aligned());
    }

    #[test]
    fn test_tolerance_boundary() {
        let mut guard = DriftGuard::default();
        guard.align(Point2::new(100.0, 100.0));

        let near = guard.check(&Point2::new(249.0, 100.0));
        assert!(!near.is_exceeded());

        let far = guard.check(&Point2::new(251.0, 100.0));
        assert!(far.is_exceeded());
        match far {
            DriftStatus::Exceeded { distance } => assert!((distance - 151.0).abs() < 1e-9),
            other => panic!("Expected drift, got {other:?}"),
        }
    }

    #[test]
    fn test_exactly_at_tolerance_is_accepted() {
        let mut guard = DriftGuard::new(5.0);
        guard.align(Point2::new(0.0, 0.0));
        assert!(!guard.check(&Point2::new(3.0, 4.0)).is_exceeded());
    }

    #[test]
    fn test_drift_keeps_anchor() {
        let mut guard = DriftGuard::default();
        guard.align(Point2::new(100.0, 100.0));
        assert!(guard.check(&Point2::new(400.0, 100.0)).is_exceeded());
        assert_eq!(guard.anchor(), Some(Point2::new(100.0, 100.0)));
        assert!(!guard.check(&Point2::new(110.0, 100.0)).is_exceeded());
    }

    #[test]
    fn test_clear() {
        let mut guard = DriftGuard::default();
        guard.align(Point2::new(1.0, 1.0));
        guard.clear();
        assert!(guard.anchor().is_none());
    }

    #[test]
    fn test_non_finite_position_is_drift() {
        let mut guard = DriftGuard::default();
        guard.align(Point2::new(100.0, 100.0));
        assert!(guard.check(&Point2::new(f64::NAN, 100.0)).is_exceeded());
        assert!(guard.check(&Point2::new(f64::INFINITY, 100.0)).is_exceeded());
    }
}
