//! Recording system module
//!
//! This module implements the recording session lifecycle:
//! - RecordingCoordinator runs the state machine and guards the single session
//! - RecordingSession pumps encoder output into an append-only chunk buffer
//! - state holds the phase enum and the values crossing the boundary

pub mod coordinator;
pub mod session;
pub mod state;

pub use coordinator::{RecordingCoordinator, RecordingEvent};
pub use session::{ChunkBuffer, RecordingSession};
pub use state::{
    CancelOutcome, FinishedRecording, RecordingRequest, SessionPhase, StartedSession, StopOutcome,
};
