//! Replay application: feeds recorded keypoint frames through the engine.

use crate::{
    config::Config,
    engine::{frame_channel, EngineCommand, EngineEvent, MeasurementEngine},
    error::{Error, Result},
    joints::{JointKey, JointRegistry},
    landmark::{Landmark, PoseFrame},
    measurement::{InMemoryStore, JsonLinesStore, Measurement, MeasurementStore},
    progress::{assess_normal_range, check_for_alerts, Alert, RangeAssessment},
    session::{LiveStatus, MeasurementSession, SessionSettings, SessionState},
};
use log::{debug, info, warn};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Replay configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON-lines file with one frame per line
    pub frames_path: PathBuf,
    /// Joint movement to measure
    pub key: JointKey,
    /// Engine configuration
    pub engine: Config,
    /// JSON-lines measurement store; records stay in memory when unset
    pub output: Option<PathBuf>,
    /// Confirm automatically once the reading freezes
    pub auto_confirm: bool,
    /// Spacing assigned to frames recorded without timestamps
    pub frame_interval_ms: u64,
}

/// Outcome of a replay
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    /// Frames read from the input
    pub frames: usize,
    /// Last published status, `None` for an empty input
    pub last_status: Option<LiveStatus>,
    /// Stored measurement, if one was confirmed
    pub measurement: Option<Measurement>,
    /// Position of the measured value within the healthy range
    pub assessment: Option<RangeAssessment>,
    /// Progress alert over the stored history
    pub alert: Option<Alert>,
}

impl ReplaySummary {
    /// State the session ended in
    #[must_use]
    pub fn final_state(&self) -> SessionState {
        self.last_status
            .as_ref()
            .map_or(SessionState::Searching, |status| status.session_state)
    }
}

/// One line of a recording
#[derive(Deserialize)]
#[serde(untagged)]
enum FrameRecord {
    Frame(PoseFrame),
    Landmarks(Vec<Landmark>),
}

/// Read a recording; bare landmark arrays are stamped every `interval_ms`
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line is not a frame
pub fn load_frames<P: AsRef<Path>>(path: P, interval_ms: u64) -> Result<Vec<PoseFrame>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut frames = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: FrameRecord = serde_json::from_str(&line).map_err(|e| {
            Error::InvalidInput(format!("{}:{}: not a keypoint frame: {e}", path.display(), line_no + 1))
        })?;
        let frame = match record {
            FrameRecord::Frame(frame) => frame,
            FrameRecord::Landmarks(landmarks) => {
                PoseFrame::new(frames.len() as u64 * interval_ms, landmarks)
            }
        };
        frames.push(frame);
    }

    info!("Loaded {} frames from {}", frames.len(), path.display());
    Ok(frames)
}

/// Replay application
pub struct ReplayApp {
    config: AppConfig,
    registry: JointRegistry,
}

impl ReplayApp {
    /// Create a replay application
    ///
    /// # Errors
    ///
    /// Returns an error if the engine configuration is invalid or the joint
    /// movement cannot be measured
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing replay for {}", config.key);
        config.engine.validate()?;
        let registry = JointRegistry::standard();
        // Fail before reading any frames
        MeasurementSession::new(&registry, config.key, SessionSettings::from_config(&config.engine)?)?;
        Ok(Self { config, registry })
    }

    /// Replay every frame and optionally confirm the result
    ///
    /// # Errors
    ///
    /// Returns an error if the recording cannot be read or the engine stops
    /// unexpectedly
    pub fn run(&mut self) -> Result<ReplaySummary> {
        let frames = load_frames(&self.config.frames_path, self.config.frame_interval_ms)?;
        let settings = SessionSettings::from_config(&self.config.engine)?;
        let session = MeasurementSession::new(&self.registry, self.config.key, settings)?;

        let store: Box<dyn MeasurementStore> = match &self.config.output {
            Some(path) => Box::new(JsonLinesStore::new(path)),
            None => Box::new(InMemoryStore::new()),
        };

        let (sender, receiver) = frame_channel();
        let engine = MeasurementEngine::spawn(session, receiver, store)?;

        let mut last_status = None;
        for frame in &frames {
            sender.send(frame.clone())?;
            match next_event(&engine)? {
                EngineEvent::Status(status) => {
                    debug!(
                        "Frame {}: {} {:.1}°",
                        status.frame_index, status.session_state, status.current_angle
                    );
                    if let Some(condition) = status.validation_error {
                        debug!("Frame {}: {condition}", status.frame_index);
                    }
                    last_status = Some(status);
                }
                other => warn!("Unexpected engine event {other:?}"),
            }
        }
        drop(sender);

        let frozen = last_status
            .as_ref()
            .is_some_and(|status| status.session_state == SessionState::Frozen);
        let measurement = if self.config.auto_confirm && frozen {
            self.confirm(&engine)?
        } else {
            if self.config.auto_confirm {
                warn!("Reading never froze, nothing to confirm");
            }
            None
        };

        let session = engine.stop()?;
        if let Some(status) = last_status.as_mut() {
            status.session_state = session.state();
        }

        let assessment = measurement
            .as_ref()
            .map(|m| assess_normal_range(session.joint_config(), m.angle));
        let alert = self.history_alert()?;

        Ok(ReplaySummary {
            frames: frames.len(),
            last_status,
            measurement,
            assessment,
            alert,
        })
    }

    fn confirm(&self, engine: &MeasurementEngine) -> Result<Option<Measurement>> {
        engine.send(EngineCommand::Confirm)?;
        match next_event(engine)? {
            EngineEvent::Confirmed(measurement) => Ok(Some(measurement)),
            EngineEvent::SaveFailed(reason) => Err(Error::SaveFailure(reason)),
            EngineEvent::Rejected(reason) => {
                warn!("Confirmation rejected: {reason}");
                Ok(None)
            }
            other => {
                warn!("Unexpected engine event {other:?}");
                Ok(None)
            }
        }
    }

    /// Alert over stored measurements of the same joint movement
    fn history_alert(&self) -> Result<Option<Alert>> {
        let Some(path) = &self.config.output else {
            return Ok(None);
        };
        let key = self.config.key;
        let mut history: Vec<Measurement> = JsonLinesStore::new(path)
            .load_all()?
            .into_iter()
            .filter(|m| m.joint_type == key.joint && m.movement_type == key.movement && m.body_side == key.side)
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(check_for_alerts(&history))
    }
}

fn next_event(engine: &MeasurementEngine) -> Result<EngineEvent> {
    engine
        .events()
        .recv()
        .map_err(|_| Error::ChannelClosed("engine events".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joints::{BodySide, JointType, MovementType};
    use std::io::Write;

    #[test]
    fn test_load_frames_accepts_both_layouts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"timestamp_ms": 40, "landmarks": [{{"x": 1.0, "y": 2.0, "visibility": 0.9}}]}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"[{{"x": 1.0, "y": 2.0, "z": 0.0, "confidence": 0.8}}]"#).unwrap();
        writeln!(file, r#"[{{"x": 3.0, "y": 4.0, "confidence": 0.7}}]"#).unwrap();

        let frames = load_frames(file.path(), 50).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].timestamp_ms, 40);
        assert_eq!(frames[0].landmarks[0].confidence, 0.9);
        assert_eq!(frames[1].timestamp_ms, 50);
        assert_eq!(frames[2].timestamp_ms, 100);
    }

    #[test]
    fn test_load_frames_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[]").unwrap();
        writeln!(file, "not json").unwrap();
        let err = load_frames(file.path(), 33).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }

    #[test]
    fn test_unmeasurable_joint_fails_early() {
        let config = AppConfig {
            frames_path: PathBuf::from("missing.jsonl"),
            key: JointKey::new(JointType::Fingers, BodySide::Left, MovementType::Flexion),
            engine: Config::default(),
            output: None,
            auto_confirm: true,
            frame_interval_ms: 33,
        };
        assert!(matches!(ReplayApp::new(config), Err(Error::Configuration(_))));
    }
}
