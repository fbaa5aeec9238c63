//! Error handling tests for all modules


use chrono::Utc;
use rom_measurement::{
    error::{AppError, Result},
    formatter::format_neutral_zero,
    joints::{BodySide, JointKey, JointRegistry, JointType, MovementType},
    measurement::{InMemoryStore, JsonLinesStore, Measurement, MeasurementStore},
    rom::to_rom,
    session::{MeasurementSession, SessionSettings, SessionState},
    stability::StabilityDetector,
    utils::round_to_degree,
};
use test_helpers::{knee_sequence, knee_session};

/// Store that always refuses with an I/O error
struct BrokenStore;

impl MeasurementStore for BrokenStore {
    fn save(&mut self, _measurement: &Measurement) -> Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
    }
}

fn frozen_session() -> MeasurementSession {
    let mut session = knee_session().unwrap();
    for frame in knee_sequence(15, 95.0, 1.0) {
        session.process_frame(&frame);
    }
    assert_eq!(session.state(), SessionState::Frozen);
    session
}

#[test]
fn test_unmapped_rom_is_configuration_error() {
    let result = to_rom(120.0, JointType::Hip, MovementType::Abduction);
    match result {
        Err(AppError::Configuration(msg)) => assert!(msg.contains("hip")),
        other => panic!("Expected Configuration error, got {other:?}"),
    }

    assert!(to_rom(120.0, JointType::Fingers, MovementType::Flexion).is_err());
    assert!(to_rom(120.0, JointType::Shoulder, MovementType::InternalRotation).is_err());
}

#[test]
fn test_unformattable_movement_is_configuration_error() {
    assert!(matches!(
        format_neutral_zero(40.0, JointType::Elbow, MovementType::Pronation),
        Err(AppError::Configuration(_))
    ));
    assert!(matches!(
        format_neutral_zero(f64::NAN, JointType::Knee, MovementType::Flexion),
        Err(AppError::InvalidInput(_))
    ));
    assert!(round_to_degree(f64::INFINITY).is_err());
}

#[test]
fn test_unregistered_key() {
    let registry = JointRegistry::new();
    let key = JointKey::new(JointType::Knee, BodySide::Left, MovementType::Flexion);
    assert!(matches!(registry.get(&key), Err(AppError::Configuration(_))));
    assert!(matches!(
        MeasurementSession::new(&registry, key, SessionSettings::default()),
        Err(AppError::Configuration(_))
    ));
}

#[test]
fn test_registered_but_unmeasurable_movements_refuse_to_start() {
    let registry = JointRegistry::standard();
    let mut refused = Vec::new();
    for (key, _) in registry.iter() {
        if MeasurementSession::new(&registry, *key, SessionSettings::default()).is_err() {
            refused.push(*key);
        }
    }
    assert!(refused.contains(&JointKey::new(JointType::Hip, BodySide::Left, MovementType::Abduction)));
    assert!(refused.contains(&JointKey::new(JointType::Fingers, BodySide::Right, MovementType::Flexion)));
    assert!(!refused.contains(&JointKey::new(JointType::Knee, BodySide::Right, MovementType::Extension)));
}

#[test]
fn test_stability_setting_ranges() {
    assert!(matches!(StabilityDetector::new(0.5, 10), Err(AppError::InvalidInput(_))));
    assert!(matches!(StabilityDetector::new(16.0, 10), Err(AppError::InvalidInput(_))));
    assert!(matches!(StabilityDetector::new(4.0, 2), Err(AppError::InvalidInput(_))));
    assert!(matches!(StabilityDetector::new(4.0, 31), Err(AppError::InvalidInput(_))));
    assert!(StabilityDetector::new(1.0, 3).is_ok());
    assert!(StabilityDetector::new(15.0, 30).is_ok());
}

#[test]
fn test_rejected_settings_keep_previous_values() {
    let mut session = knee_session().unwrap();
    assert!(session.update_stability(4.0, 50).is_err());
    for frame in knee_sequence(10, 95.0, 1.0) {
        session.process_frame(&frame);
    }
    assert_eq!(session.state(), SessionState::Stable);
}

#[test]
fn test_io_failure_becomes_save_failure() {
    let mut session = frozen_session();
    let result = session.confirm(&mut BrokenStore, Utc::now());
    match result {
        Err(AppError::SaveFailure(msg)) => assert!(msg.contains("read-only")),
        other => panic!("Expected SaveFailure, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Frozen);
    assert!(session.draft().is_some());
}

#[test]
fn test_retry_after_save_failure() {
    let mut session = frozen_session();
    let mut store = InMemoryStore::new();
    store.fail_next(2);

    assert!(session.confirm(&mut store, Utc::now()).is_err());
    assert!(session.confirm(&mut store, Utc::now()).is_err());
    let measurement = session.confirm(&mut store, Utc::now()).unwrap();
    assert_eq!(measurement.neutral_zero_format, "0-0-95");
    assert_eq!(store.records().len(), 1);
}

#[test]
fn test_json_store_in_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonLinesStore::new(dir.path().join("missing").join("measurements.jsonl"));
    let mut session = frozen_session();
    assert!(matches!(
        session.confirm(&mut store, Utc::now()),
        Err(AppError::SaveFailure(_))
    ));
    assert_eq!(session.state(), SessionState::Frozen);
}

#[test]
fn test_json_store_rejects_corrupt_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("measurements.jsonl");
    std::fs::write(&path, "{\"id\": 1}\n").unwrap();
    assert!(matches!(
        JsonLinesStore::new(&path).load_all(),
        Err(AppError::Serialization(_))
    ));
}

#[test]
fn test_pain_level_out_of_range() {
    let mut session = frozen_session();
    let measurement = session.confirm(&mut InMemoryStore::new(), Utc::now()).unwrap();
    assert!(matches!(measurement.with_pain_level(11), Err(AppError::InvalidInput(_))));
}
