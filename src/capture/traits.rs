//! Capture trait definitions
//!
//! Platform-agnostic types and traits for capture sources.

use crate::utils::error::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Position and size of a screen inside the virtual desktop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A screen that can be used as the video input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSource {
    /// Backend-specific identifier (display string, device index, ...)
    pub id: String,

    /// Human readable name
    pub name: String,

    /// Geometry, when the backend knows it
    pub geometry: Option<SourceGeometry>,

    /// Whether this is the primary display
    pub is_primary: bool,
}

/// A microphone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDevice {
    pub id: String,
    pub label: String,
}

/// A camera usable for the overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDevice {
    pub id: String,
    pub label: String,
}

/// What a permission applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Screen,
    Camera,
    Microphone,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MediaKind::Screen => "screen",
            MediaKind::Camera => "camera",
            MediaKind::Microphone => "microphone",
        };
        f.write_str(name)
    }
}

/// Outcome of a permission check or request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// No such device on this machine
    Unavailable,
    /// The platform cannot tell without trying
    Unknown,
}

/// Tracks carried by an encoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    Video,
    Audio,
    CameraOverlay,
}

/// Everything the encoder needs for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPlan {
    pub source: CaptureSource,
    pub audio: Option<AudioDevice>,
    pub camera: Option<CameraDevice>,
}

impl StreamPlan {
    pub fn video_only(source: CaptureSource) -> Self {
        Self {
            source,
            audio: None,
            camera: None,
        }
    }

    pub fn tracks(&self) -> Vec<TrackKind> {
        let mut tracks = vec![TrackKind::Video];
        if self.camera.is_some() {
            tracks.push(TrackKind::CameraOverlay);
        }
        if self.audio.is_some() {
            tracks.push(TrackKind::Audio);
        }
        tracks
    }
}

/// A running encoder producing container bytes
#[async_trait]
pub trait MediaEncoder: Send {
    /// Tracks muxed into the output
    fn tracks(&self) -> Vec<TrackKind>;

    /// Next encoded fragment, `None` once the stream has ended.
    ///
    /// Must be cancel-safe: the recorder polls it inside `select!`.
    async fn next_chunk(&mut self) -> AppResult<Option<Vec<u8>>>;

    /// Ask the encoder to flush and end the stream.
    ///
    /// Remaining fragments are still returned by `next_chunk` afterwards.
    async fn stop(&mut self) -> AppResult<()>;
}

/// Enumerates devices and opens encoders on one platform
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn sources(&self) -> AppResult<Vec<CaptureSource>>;

    async fn audio_devices(&self) -> AppResult<Vec<AudioDevice>>;

    async fn cameras(&self) -> AppResult<Vec<CameraDevice>>;

    /// Check without prompting
    async fn check_permission(&self, kind: MediaKind) -> PermissionStatus;

    /// Prompt or probe for access
    async fn request_permission(&self, kind: MediaKind) -> PermissionStatus;

    /// Verify the microphone can be opened
    async fn open_audio(&self, device: &AudioDevice) -> AppResult<()>;

    /// Acquire the streams in `plan` and start encoding
    async fn open_encoder(&self, plan: &StreamPlan) -> AppResult<Box<dyn MediaEncoder>>;
}
