//! Body keypoints as delivered by the pose-estimation collaborator.

use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

/// A single keypoint in normalized or device-scaled coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position
    pub x: f64,
    /// Vertical position (grows downwards in image space)
    pub y: f64,
    /// Relative depth, 0 for 2D sources
    #[serde(default)]
    pub z: f64,
    /// Detection confidence in [0, 1]
    #[serde(alias = "visibility", alias = "score")]
    pub confidence: f64,
}

impl Landmark {
    /// Create a landmark in 3D space
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, confidence: f64) -> Self {
        Self { x, y, z, confidence }
    }

    /// Create a landmark on the image plane (`z = 0`)
    #[must_use]
    pub const fn planar(x: f64, y: f64, confidence: f64) -> Self {
        Self::new(x, y, 0.0, confidence)
    }

    /// Position as a 3D vector
    #[must_use]
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Position projected onto the image plane
    #[must_use]
    pub fn screen_position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// One frame of keypoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Capture time relative to the start of the stream
    #[serde(default)]
    pub timestamp_ms: u64,
    /// Keypoints indexed by the pose model's topology
    pub landmarks: Vec<Landmark>,
}

impl PoseFrame {
    /// Create a frame
    #[must_use]
    pub fn new(timestamp_ms: u64, landmarks: Vec<Landmark>) -> Self {
        Self { timestamp_ms, landmarks }
    }
}

/// Landmark triple (proximal, vertex, distal) defining a joint angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LandmarkTriple(pub usize, pub usize, pub usize);

impl LandmarkTriple {
    /// Indices in (proximal, vertex, distal) order
    #[must_use]
    pub const fn indices(&self) -> [usize; 3] {
        [self.0, self.1, self.2]
    }

    /// Index of the vertex landmark
    #[must_use]
    pub const fn vertex(&self) -> usize {
        self.1
    }

    /// Resolve the triple against a frame, if all three exist
    #[must_use]
    pub fn resolve<'a>(&self, landmarks: &'a [Landmark]) -> Option<(&'a Landmark, &'a Landmark, &'a Landmark)> {
        Some((landmarks.get(self.0)?, landmarks.get(self.1)?, landmarks.get(self.2)?))
    }
}

/// Check that all three landmarks of `triple` exist and are confident enough
#[must_use]
pub fn validate(landmarks: &[Landmark], triple: LandmarkTriple, min_confidence: f64) -> bool {
    triple
        .indices()
        .iter()
        .all(|&i| landmarks.get(i).is_some_and(|lm| lm.confidence >= min_confidence))
}

/// Mean confidence of the triple, 0 when any landmark is missing
#[must_use]
pub fn triple_confidence(landmarks: &[Landmark], triple: LandmarkTriple) -> f64 {
    match triple.resolve(landmarks) {
        Some((a, b, c)) => (a.confidence + b.confidence + c.confidence) / 3.0,
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(confidences: &[f64]) -> Vec<Landmark> {
        confidences
            .iter()
            .enumerate()
            .map(|(i, &c)| Landmark::planar(i as f64, 0.0, c))
            .collect()
    }

    #[test]
    fn test_validate_all_confident() {
        let lms = frame(&[0.9, 0.8, 0.7]);
        assert!(validate(&lms, LandmarkTriple(0, 1, 2), 0.7));
    }

    #[test]
    fn test_validate_threshold_is_inclusive() {
        let lms = frame(&[0.5, 0.5, 0.5]);
        assert!(validate(&lms, LandmarkTriple(0, 1, 2), 0.5));
        assert!(!validate(&lms, LandmarkTriple(0, 1, 2), 0.51));
    }

    #[test]
    fn test_validate_one_weak_landmark() {
        let lms = frame(&[0.9, 0.2, 0.9]);
        assert!(!validate(&lms, LandmarkTriple(0, 1, 2), 0.7));
        assert!(validate(&lms, LandmarkTriple(0, 1, 2), 0.1));
    }

    #[test]
    fn test_validate_missing_index() {
        let lms = frame(&[0.9, 0.9]);
        assert!(!validate(&lms, LandmarkTriple(0, 1, 2), 0.1));
        assert!(!validate(&[], LandmarkTriple(0, 1, 2), 0.0));
    }

    #[test]
    fn test_triple_confidence() {
        let lms = frame(&[0.9, 0.6, 0.3]);
        assert!((triple_confidence(&lms, LandmarkTriple(0, 1, 2)) - 0.6).abs() < 1e-12);
        assert_eq!(triple_confidence(&lms, LandmarkTriple(0, 1, 5)), 0.0);
    }

    #[test]
    fn test_landmark_deserializes_visibility_alias() {
        let lm: Landmark = serde_json::from_str(r#"{"x":0.1,"y":0.2,"visibility":0.8}"#).unwrap();
        assert_eq!(lm, Landmark::new(0.1, 0.2, 0.0, 0.8));
    }
}
