//! Edge case tests for geometry, smoothing, stability and formatting


use proptest::prelude::*;
use rom_measurement::formatter::format_neutral_zero;
use rom_measurement::geometry::vertex_angle;
use rom_measurement::joints::{JointType, MovementType};
use rom_measurement::landmark::{validate, Landmark, LandmarkTriple, PoseFrame};
use rom_measurement::rom::to_rom;
use rom_measurement::session::SessionState;
use rom_measurement::smoothing::{AngleSample, SmoothingBuffer};
use rom_measurement::stability::{is_stable, StabilityDetector};
use test_helpers::{empty_skeleton, knee_frame, knee_session};

fn buffer_with(values: &[f64]) -> SmoothingBuffer {
    let mut buffer = SmoothingBuffer::default();
    for (i, &value) in values.iter().enumerate() {
        buffer.push(AngleSample {
            value,
            frame_index: i as u64,
        });
    }
    buffer
}

#[test]
fn test_reference_angles() {
    let b = Landmark::planar(0.0, 0.0, 1.0);
    assert_eq!(vertex_angle(&Landmark::planar(0.0, 1.0, 1.0), &b, &Landmark::planar(1.0, 0.0, 1.0)), 90.0);
    assert_eq!(vertex_angle(&Landmark::planar(1.0, 0.0, 1.0), &b, &Landmark::planar(-1.0, 0.0, 1.0)), 180.0);
    assert_eq!(vertex_angle(&Landmark::planar(0.0, 0.0, 1.0), &b, &Landmark::planar(1.0, 0.0, 1.0)), 0.0);
}

#[test]
fn test_coincident_points_never_nan() {
    let p = Landmark::new(3.0, 4.0, 5.0, 1.0);
    let angle = vertex_angle(&p, &p, &p);
    assert_eq!(angle, 0.0);
}

#[test]
fn test_knee_rom_reference_values() {
    assert_eq!(to_rom(180.0, JointType::Knee, MovementType::Flexion).unwrap(), 0.0);
    assert_eq!(to_rom(90.0, JointType::Knee, MovementType::Flexion).unwrap(), 90.0);
    assert_eq!(to_rom(200.0, JointType::Knee, MovementType::Flexion).unwrap(), 0.0);
}

#[test]
fn test_formatter_reference_values() {
    assert_eq!(format_neutral_zero(95.0, JointType::Knee, MovementType::Flexion).unwrap(), "0-0-95");
    assert_eq!(format_neutral_zero(5.0, JointType::Ankle, MovementType::Dorsiflexion).unwrap(), "5-0-0");
    assert_eq!(format_neutral_zero(94.5, JointType::Knee, MovementType::Flexion).unwrap(), "0-0-95");
}

#[test]
fn test_stability_outlier_ages_out() {
    let mut values = vec![92.0; 10];
    assert!(is_stable(&buffer_with(&values), 4.0, 10));

    values[4] = 97.0;
    let mut buffer = buffer_with(&values);
    assert!(!is_stable(&buffer, 4.0, 10));

    // The outlier is the 6th newest; five more samples push it out
    for i in 0..4 {
        buffer.push(AngleSample {
            value: 92.0,
            frame_index: 10 + i,
        });
        assert!(!is_stable(&buffer, 4.0, 10));
    }
    buffer.push(AngleSample {
        value: 92.0,
        frame_index: 14,
    });
    assert!(is_stable(&buffer, 4.0, 10));
}

#[test]
fn test_stability_window_larger_than_capacity() {
    let detector = StabilityDetector::new(4.0, 30).unwrap();
    let buffer = buffer_with(&[92.0; 25]);
    assert_eq!(buffer.len(), 20);
    assert!(detector.is_stable(&buffer));
}

#[test]
fn test_empty_buffer() {
    let buffer = SmoothingBuffer::default();
    assert_eq!(buffer.smoothed(), 0.0);
    assert!(!is_stable(&buffer, 4.0, 3));
}

#[test]
fn test_short_frame_is_low_confidence() {
    let triple = LandmarkTriple(23, 25, 27);
    let mut landmarks = empty_skeleton();
    landmarks.truncate(26);
    assert!(!validate(&landmarks, triple, 0.0));

    let mut session = knee_session().unwrap();
    let status = session.process_frame(&PoseFrame::new(0, landmarks));
    assert_eq!(status.session_state, SessionState::Searching);
}

#[test]
fn test_straight_knee_never_aligns() {
    let mut session = knee_session().unwrap();
    for i in 0..20 {
        let status = session.process_frame(&knee_frame(i * 100, 0.0));
        assert_eq!(status.session_state, SessionState::Searching);
        assert_eq!(status.validation_error, None);
    }
    assert!(session.buffer().is_empty());
}

#[test]
fn test_confirmed_session_ignores_frames() {
    let mut session = knee_session().unwrap();
    for i in 0..15 {
        session.process_frame(&knee_frame(i * 100, 95.0));
    }
    let mut store = rom_measurement::measurement::InMemoryStore::new();
    session.confirm(&mut store, chrono::Utc::now()).unwrap();

    let status = session.process_frame(&knee_frame(1500, 30.0));
    assert_eq!(status.session_state, SessionState::Confirmed);
    assert!(session.confirm(&mut store, chrono::Utc::now()).is_err());
    assert_eq!(store.records().len(), 1);
}

proptest! {
    #[test]
    fn prop_buffer_never_exceeds_capacity(values in prop::collection::vec(-50.0f64..200.0, 0..100)) {
        let buffer = buffer_with(&values);
        prop_assert!(buffer.len() <= 20);
        prop_assert_eq!(buffer.len(), values.len().min(20));
    }

    #[test]
    fn prop_constant_signal_is_stable(value in 0.0f64..180.0, frames in 3usize..=30) {
        let buffer = buffer_with(&vec![value; 20]);
        let detector = StabilityDetector::new(1.0, frames).unwrap();
        prop_assert!(detector.is_stable(&buffer));
    }

    #[test]
    fn prop_flexion_rom_is_non_negative(raw in -10.0f64..400.0) {
        for joint in [JointType::Knee, JointType::Hip, JointType::Elbow] {
            prop_assert!(to_rom(raw, joint, MovementType::Flexion).unwrap() >= 0.0);
        }
    }

    #[test]
    fn prop_retake_always_resets(count in 0u64..40) {
        let mut session = knee_session().unwrap();
        for i in 0..count {
            session.process_frame(&knee_frame(i * 100, 80.0));
        }
        session.retake().unwrap();
        prop_assert_eq!(session.state(), SessionState::Searching);
        prop_assert!(session.buffer().is_empty());
        prop_assert!(session.drift_guard().anchor().is_none());
    }
}
