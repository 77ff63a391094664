//! Capture sources and the ffmpeg backend
//!
//! This module enumerates screens, microphones and cameras, negotiates
//! access to them and starts the encoder for a recording session.

pub mod devices;
pub mod ffmpeg;
pub mod permissions;
pub mod traits;

pub use ffmpeg::FfmpegBackend;
pub use traits::{
    AudioDevice, CameraDevice, CaptureBackend, CaptureSource, MediaEncoder, MediaKind,
    PermissionStatus, SourceGeometry, StreamPlan, TrackKind,
};
