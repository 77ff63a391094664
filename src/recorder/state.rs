//! Recording state management
//!
//! Defines the recording state machine and the values passed in and out of it.

use crate::capture::traits::TrackKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current phase of the recording system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No recording in progress
    Idle,
    /// Streams are being acquired
    Starting,
    /// Encoder running, chunks accumulating
    Recording,
    /// Encoder draining after a stop or cancel request
    Stopping,
    /// Finalized buffer handed to the upload
    Uploading,
    /// Chunks discarded; transient on the way back to idle
    Cancelled,
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl SessionPhase {
    /// Whether the tray should show the recording indicator
    pub fn is_capturing(&self) -> bool {
        matches!(self, SessionPhase::Recording)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Starting => "starting",
            SessionPhase::Recording => "recording",
            SessionPhase::Stopping => "stopping",
            SessionPhase::Uploading => "uploading",
            SessionPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Parameters for starting a recording
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRequest {
    /// Source to capture; the primary source when absent
    #[serde(default)]
    pub source_id: Option<String>,

    /// Whether to capture a microphone
    #[serde(default)]
    pub record_audio: bool,

    /// Microphone device ID, required when `record_audio` is set
    #[serde(default)]
    pub audio_device_id: Option<String>,

    /// Whether to overlay the camera
    #[serde(default)]
    pub camera: bool,
}

/// What a started session ended up capturing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedSession {
    pub session_id: Uuid,
    pub source_name: String,
    pub tracks: Vec<TrackKind>,
    /// Non-fatal problems hit while starting
    pub warnings: Vec<String>,
}

/// A finalized recording ready for upload
#[derive(Debug, Clone)]
pub struct FinishedRecording {
    pub session_id: Uuid,
    pub tracks: Vec<TrackKind>,
    pub duration_ms: u64,
    pub data: Vec<u8>,
}

/// How a stop request ended
#[derive(Debug)]
pub enum StopOutcome {
    /// Chunks finalized; the coordinator is now `Uploading`
    Finished(FinishedRecording),
    /// A cancel request won; nothing will be uploaded
    Cancelled,
}

/// How a cancel request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The session was stopped and its chunks dropped
    Discarded,
    /// A stop was already draining; it will take the cancelled path
    Flagged,
}
