//! Joint range-of-motion measurement from body keypoint streams.
//!
//! This library turns per-frame body keypoints (as produced by a
//! 33-keypoint pose model) into a clinically formatted range-of-motion
//! measurement:
//! - Vertex angles computed with `nalgebra`
//! - Moving-average smoothing and window-based stability detection
//! - Anchor drift and pelvic compensation checks
//! - A session state machine that freezes a stable reading for confirmation
//!
//! The measurement pipeline consists of:
//! 1. Landmark validation for the joint's keypoint triple
//! 2. Vertex angle and joint-specific ROM mapping
//! 3. Smoothing, stability detection and auto-freeze
//! 4. Neutral-Zero formatting and persistence on confirmation
//!
//! # Examples
//!
//! ## Measuring a Session
//!
//! ```no_run
//! use rom_measurement::joints::{BodySide, JointKey, JointRegistry, JointType, MovementType};
//! use rom_measurement::landmark::PoseFrame;
//! use rom_measurement::measurement::InMemoryStore;
//! use rom_measurement::session::{MeasurementSession, SessionSettings, SessionState};
//!
//! # fn main() -> rom_measurement::Result<()> {
//! # let frames: Vec<PoseFrame> = Vec::new();
//! let registry = JointRegistry::standard();
//! let key = JointKey::new(JointType::Knee, BodySide::Left, MovementType::Flexion);
//! let mut session = MeasurementSession::new(&registry, key, SessionSettings::default())?;
//!
//! for frame in &frames {
//!     let status = session.process_frame(frame);
//!     println!("{} {:.1}°", status.session_state, status.current_angle);
//!     if status.session_state == SessionState::Frozen {
//!         break;
//!     }
//! }
//!
//! let mut store = InMemoryStore::new();
//! let measurement = session.confirm(&mut store, chrono::Utc::now())?;
//! println!("Knee flexion: {}", measurement.neutral_zero_format);
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Engine
//!
//! ```no_run
//! use rom_measurement::engine::{frame_channel, EngineCommand, EngineEvent, MeasurementEngine};
//! use rom_measurement::joints::{BodySide, JointKey, JointRegistry, JointType, MovementType};
//! use rom_measurement::landmark::PoseFrame;
//! use rom_measurement::measurement::InMemoryStore;
//! use rom_measurement::session::{MeasurementSession, SessionSettings};
//!
//! # fn main() -> rom_measurement::Result<()> {
//! # let camera_frames: Vec<PoseFrame> = Vec::new();
//! let key = JointKey::new(JointType::Elbow, BodySide::Right, MovementType::Flexion);
//! let session = MeasurementSession::new(&JointRegistry::standard(), key, SessionSettings::default())?;
//!
//! let (sender, receiver) = frame_channel();
//! let engine = MeasurementEngine::spawn(session, receiver, InMemoryStore::new())?;
//!
//! for frame in camera_frames {
//!     // Frames arriving while the engine is busy are dropped
//!     sender.offer(frame)?;
//!     while let Ok(EngineEvent::Status(status)) = engine.events().try_recv() {
//!         println!("{:.1}°", status.current_angle);
//!     }
//! }
//!
//! engine.send(EngineCommand::Confirm)?;
//! let session = engine.stop()?;
//! println!("Finished in state {}", session.state());
//! # Ok(())
//! # }
//! ```
//!
//! ## Geometry Helpers
//!
//! ```
//! use rom_measurement::formatter::format_neutral_zero;
//! use rom_measurement::geometry::vertex_angle;
//! use rom_measurement::joints::{JointType, MovementType};
//! use rom_measurement::landmark::Landmark;
//! use rom_measurement::rom::to_rom;
//!
//! let hip = Landmark::planar(0.0, 1.0, 1.0);
//! let knee = Landmark::planar(0.0, 0.0, 1.0);
//! let ankle = Landmark::planar(1.0, 0.0, 1.0);
//!
//! let raw = vertex_angle(&hip, &knee, &ankle);
//! assert_eq!(raw, 90.0);
//!
//! let rom = to_rom(raw, JointType::Knee, MovementType::Flexion).unwrap();
//! assert_eq!(format_neutral_zero(rom, JointType::Knee, MovementType::Flexion).unwrap(), "0-0-90");
//! ```

/// Keypoints, frames and landmark validation
pub mod landmark;

/// Vertex angles and planar distances
pub mod geometry;

/// Joint types, movements and the joint registry
pub mod joints;

/// Raw angle to range-of-motion mapping
pub mod rom;

/// Moving-average smoothing buffer
pub mod smoothing;

/// Window-based stability detection
pub mod stability;

/// Alignment anchor and drift rejection
pub mod drift;

/// Pelvic compensation detection
pub mod compensation;

/// Neutral-Zero notation
pub mod formatter;

/// Measurement records and persistence
pub mod measurement;

/// Measurement session state machine
pub mod session;

/// Background engine and frame channel
pub mod engine;

/// Milestones, normal ranges and progress alerts
pub mod progress;

/// Numeric helpers
pub mod utils;

/// Error types and result handling
pub mod error;

/// Recorded frame replay application
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
