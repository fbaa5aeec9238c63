//! Measurement drafts, committed records and the persistence seam.

use crate::formatter::format_neutral_zero;
use crate::joints::{BodySide, JointType, MovementType};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Synchronization state of a stored measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

/// Working state of a measurement, owned by the session
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementDraft {
    /// Smoothed ROM in degrees
    pub angle: f64,
    pub joint_type: JointType,
    pub movement_type: MovementType,
    pub body_side: BodySide,
    /// Mean landmark confidence of the last accepted frame
    pub confidence: f64,
    /// Stream time of the last accepted frame
    pub timestamp_candidate_ms: u64,
}

impl MeasurementDraft {
    /// Turn the draft into an immutable record stamped with `timestamp`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the movement has no Neutral-Zero notation
    pub fn finalize(&self, timestamp: DateTime<Utc>) -> Result<Measurement> {
        let neutral_zero_format = format_neutral_zero(self.angle, self.joint_type, self.movement_type)?;
        Ok(Measurement {
            id: Uuid::new_v4(),
            joint_type: self.joint_type,
            movement_type: self.movement_type,
            body_side: self.body_side,
            angle: self.angle,
            neutral_zero_format,
            confidence: self.confidence,
            timestamp,
            sync_status: SyncStatus::Pending,
            notes: None,
            pain_level: None,
        })
    }
}

/// Committed measurement handed to persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: Uuid,
    pub joint_type: JointType,
    pub movement_type: MovementType,
    pub body_side: BodySide,
    /// ROM in degrees
    pub angle: f64,
    /// Neutral-Zero notation, e.g. `0-0-95`
    pub neutral_zero_format: String,
    /// Pose confidence (0-1)
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub sync_status: SyncStatus,
    /// Patient note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Pain on the visual analogue scale (0-10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain_level: Option<u8>,
}

impl Measurement {
    /// Attach a patient note
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Attach a pain level
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for values above 10
    pub fn with_pain_level(mut self, pain_level: u8) -> Result<Self> {
        if pain_level > 10 {
            return Err(Error::InvalidInput(format!(
                "Pain level must be between 0 and 10, got {pain_level}"
            )));
        }
        self.pain_level = Some(pain_level);
        Ok(self)
    }
}

/// Persistence collaborator
pub trait MeasurementStore: Send {
    /// Persist one confirmed measurement
    ///
    /// # Errors
    ///
    /// Returns [`Error::SaveFailure`] (or an I/O error) if the record was not stored
    fn save(&mut self, measurement: &Measurement) -> Result<()>;
}

impl<T: MeasurementStore + ?Sized> MeasurementStore for Box<T> {
    fn save(&mut self, measurement: &Measurement) -> Result<()> {
        (**self).save(measurement)
    }
}

/// Store keeping records in memory, newest last
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Vec<Measurement>,
    fail_next: usize,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` saves fail
    pub fn fail_next(&mut self, count: usize) {
        self.fail_next = count;
    }

    /// Stored records in insertion order
    #[must_use]
    pub fn records(&self) -> &[Measurement] {
        &self.records
    }
}

impl MeasurementStore for InMemoryStore {
    fn save(&mut self, measurement: &Measurement) -> Result<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(Error::SaveFailure("storage unavailable".to_string()));
        }
        self.records.push(measurement.clone());
        Ok(())
    }
}

/// Store appending one JSON record per line
#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    path: PathBuf,
}

impl JsonLinesStore {
    /// Store backed by `path`; the file is created on first save
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored record, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is malformed
    pub fn load_all(&self) -> Result<Vec<Measurement>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        debug!("Loaded {} measurements from {}", records.len(), self.path.display());
        Ok(records)
    }
}

impl MeasurementStore for JsonLinesStore {
    fn save(&mut self, measurement: &Measurement) -> Result<()> {
        let write = || -> Result<()> {
            let mut line = serde_json::to_vec(measurement)?;
            line.push(b'\n');
            let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            let len = file.metadata()?.len();
            append_line(&mut file, &line, |file| file.set_len(len))?;
            Ok(())
        };
        write().map_err(|e| Error::SaveFailure(format!("{}: {e}", self.path.display())))?;
        info!("Stored measurement {} in {}", measurement.id, self.path.display());
        Ok(())
    }
}

/// Write `line` in one piece; on failure `rollback` removes any partial write
fn append_line<W, R>(writer: &mut W, line: &[u8], rollback: R) -> io::Result<()>
where
    W: Write,
    R: FnOnce(&mut W) -> io::Result<()>,
{
    if let Err(e) = writer.write_all(line).and_then(|()| writer.flush()) {
        if let Err(undo) = rollback(writer) {
            warn!("Could not remove partial record: {undo}");
        }
        return Err(e);
    }
    Ok(())
}
