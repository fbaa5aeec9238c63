//! Background measurement engine.
//!
//! The pose estimator hands frames to the engine through a rendezvous
//! channel: a frame is accepted only while the engine is idle and waiting,
//! otherwise it is dropped so the estimator never queues up stale frames.
//! User actions travel on a separate command channel and every processed
//! frame produces a [`EngineEvent::Status`] for the UI.
//!
//! The event queue is bounded by [`EVENT_QUEUE_CAPACITY`]. A consumer that
//! falls behind loses status updates, never command replies: those wait for
//! room in the queue.

use crate::constants::EVENT_QUEUE_CAPACITY;
use crate::landmark::PoseFrame;
use crate::measurement::{Measurement, MeasurementStore};
use crate::session::{LiveStatus, MeasurementSession};
use crate::{Error, Result};
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long the worker waits for a frame before checking commands again
const COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Producer side of the frame channel
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: SyncSender<PoseFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameSender {
    /// Offer a frame without blocking.
    ///
    /// Returns `Ok(false)` if the engine was busy and the frame was dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] once the engine has stopped
    pub fn offer(&self, frame: PoseFrame) -> Result<bool> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Engine busy, frame dropped ({dropped} total)");
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(Error::ChannelClosed("frame channel".to_string())),
        }
    }

    /// Hand a frame over, waiting until the engine takes it.
    ///
    /// Used for recorded streams where every frame matters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] once the engine has stopped
    pub fn send(&self, frame: PoseFrame) -> Result<()> {
        self.tx
            .send(frame)
            .map_err(|_| Error::ChannelClosed("frame channel".to_string()))
    }

    /// Frames dropped by [`FrameSender::offer`] so far
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer side of the frame channel
#[derive(Debug)]
pub struct FrameReceiver {
    rx: Receiver<PoseFrame>,
}

/// Create a frame channel holding no backlog
#[must_use]
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = mpsc::sync_channel(0);
    (
        FrameSender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        FrameReceiver { rx },
    )
}

/// User action forwarded to the session
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// Hold the current stable reading
    Freeze,
    /// Store the frozen reading
    Confirm,
    /// Discard the reading and search again
    Retake,
    /// Replace the user stability settings
    UpdateStability {
        /// Maximum deviation in degrees
        threshold: f64,
        /// Samples evaluated
        min_frames: usize,
    },
    /// Shut the worker down
    Stop,
}

/// Notification published by the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Overlay data for one processed frame
    Status(LiveStatus),
    /// A measurement was stored
    Confirmed(Measurement),
    /// Storing failed; the session is still frozen and confirm may be retried
    SaveFailed(String),
    /// A command was not valid in the current state
    Rejected(String),
    /// The session was reset by a retake
    Reset,
}

/// Worker side of the event queue
struct EventSink {
    tx: SyncSender<EngineEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSink {
    /// Publish a per-frame status, dropping it if the queue is full
    fn status(&self, status: LiveStatus) {
        match self.tx.try_send(EngineEvent::Status(status)) {
            // Nobody listening is not an error; the session still advances
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Event queue full, status dropped ({dropped} total)");
            }
        }
    }

    /// Publish a command reply, waiting for room in the queue
    fn reply(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Handle to the engine worker thread
#[derive(Debug)]
pub struct MeasurementEngine {
    commands: Sender<EngineCommand>,
    events: Receiver<EngineEvent>,
    dropped_events: Arc<AtomicU64>,
    handle: Option<JoinHandle<MeasurementSession>>,
}

impl MeasurementEngine {
    /// Move `session` onto a worker thread fed by `frames`
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned
    pub fn spawn<S>(session: MeasurementSession, frames: FrameReceiver, store: S) -> Result<Self>
    where
        S: MeasurementStore + 'static,
    {
        let (commands, command_rx) = mpsc::channel();
        let (event_tx, events) = mpsc::sync_channel(EVENT_QUEUE_CAPACITY);
        let dropped_events = Arc::new(AtomicU64::new(0));
        let sink = EventSink {
            tx: event_tx,
            dropped: Arc::clone(&dropped_events),
        };

        let handle = thread::Builder::new()
            .name("rom-engine".to_string())
            .spawn(move || run_worker(session, &frames.rx, &command_rx, &sink, store))?;

        Ok(Self {
            commands,
            events,
            dropped_events,
            handle: Some(handle),
        })
    }

    /// Queue a command for the worker
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the worker has exited
    pub fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::ChannelClosed("command channel".to_string()))
    }

    /// Event stream
    #[must_use]
    pub fn events(&self) -> &Receiver<EngineEvent> {
        &self.events
    }

    /// Status events discarded because the event queue was full
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Stop the worker and take the session back
    ///
    /// Events still queued are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the worker panicked
    pub fn stop(mut self) -> Result<MeasurementSession> {
        // The worker may already be gone after its frame source closed
        let _ = self.commands.send(EngineCommand::Stop);
        self.join_worker()
    }

    fn join_worker(&mut self) -> Result<MeasurementSession> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| Error::InvalidState("Engine already stopped".to_string()))?;

        // A worker blocked on a full event queue needs room to reach Stop
        while !handle.is_finished() {
            match self.events.recv_timeout(COMMAND_POLL_INTERVAL) {
                Ok(_) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        handle
            .join()
            .map_err(|_| Error::ChannelClosed("engine worker panicked".to_string()))
    }
}

impl Drop for MeasurementEngine {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.commands.send(EngineCommand::Stop);
            if let Err(e) = self.join_worker() {
                error!("Engine shutdown failed: {e}");
            }
        }
    }
}

fn run_worker<S: MeasurementStore>(
    mut session: MeasurementSession,
    frames: &Receiver<PoseFrame>,
    commands: &Receiver<EngineCommand>,
    events: &EventSink,
    mut store: S,
) -> MeasurementSession {
    info!("Measurement engine started for {}", session.key());

    'outer: loop {
        while let Ok(command) = commands.try_recv() {
            if !handle_command(&mut session, command, events, &mut store) {
                break 'outer;
            }
        }

        match frames.recv_timeout(COMMAND_POLL_INTERVAL) {
            Ok(frame) => {
                events.status(session.process_frame(&frame));
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Frame source closed");
                // Commands queued after the final frame still apply
                while let Ok(command) = commands.recv() {
                    if !handle_command(&mut session, command, events, &mut store) {
                        break;
                    }
                }
                break;
            }
        }
    }

    info!("Measurement engine stopped in state {}", session.state());
    session
}

/// Apply one command; returns `false` when the worker should exit
fn handle_command<S: MeasurementStore>(
    session: &mut MeasurementSession,
    command: EngineCommand,
    events: &EventSink,
    store: &mut S,
) -> bool {
    let event = match command {
        EngineCommand::Stop => return false,
        EngineCommand::Freeze => match session.freeze() {
            Ok(()) => EngineEvent::Status(session.live_status()),
            Err(e) => EngineEvent::Rejected(e.to_string()),
        },
        EngineCommand::Confirm => match session.confirm(store, Utc::now()) {
            Ok(measurement) => EngineEvent::Confirmed(measurement),
            Err(Error::SaveFailure(reason)) => {
                warn!("Measurement not saved, retry possible: {reason}");
                EngineEvent::SaveFailed(reason)
            }
            Err(e) => EngineEvent::Rejected(e.to_string()),
        },
        EngineCommand::Retake => match session.retake() {
            Ok(()) => EngineEvent::Reset,
            Err(e) => EngineEvent::Rejected(e.to_string()),
        },
        EngineCommand::UpdateStability { threshold, min_frames } => {
            match session.update_stability(threshold, min_frames) {
                Ok(()) => return true,
                Err(e) => EngineEvent::Rejected(e.to_string()),
            }
        }
    };
    events.reply(event);
    true
}
