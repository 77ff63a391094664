//! Recording-related Tauri commands

use crate::app::AppState;
use crate::capture::traits::{AudioDevice, CameraDevice, CaptureSource, MediaKind, PermissionStatus};
use crate::recorder::state::{RecordingRequest, SessionPhase, StartedSession};
use crate::upload::handoff::UploadResult;
use crate::utils::error::ErrorResponse;
use std::sync::Arc;
use tauri::State;

type CommandResult<T> = Result<T, ErrorResponse>;

/// Get list of screens that can be recorded
#[tauri::command]
pub async fn get_sources(state: State<'_, Arc<AppState>>) -> CommandResult<Vec<CaptureSource>> {
    Ok(state.sources().await?)
}

/// Get list of available audio input devices (microphones)
#[tauri::command]
pub async fn get_audio_devices(state: State<'_, Arc<AppState>>) -> CommandResult<Vec<AudioDevice>> {
    Ok(state.audio_devices().await?)
}

/// Get list of available cameras/webcams
#[tauri::command]
pub async fn get_cameras(state: State<'_, Arc<AppState>>) -> CommandResult<Vec<CameraDevice>> {
    Ok(state.cameras().await?)
}

#[tauri::command]
pub async fn check_permission(
    state: State<'_, Arc<AppState>>,
    kind: MediaKind,
) -> CommandResult<PermissionStatus> {
    Ok(state.check_permission(kind).await)
}

/// Check, then ask for the permission if it is not granted yet
#[tauri::command]
pub async fn request_permission(
    state: State<'_, Arc<AppState>>,
    kind: MediaKind,
) -> CommandResult<PermissionStatus> {
    Ok(state.request_permission(kind).await)
}

/// Toggle the camera overlay; returns whether it ended up enabled
#[tauri::command]
pub async fn set_camera_enabled(
    state: State<'_, Arc<AppState>>,
    enabled: bool,
) -> CommandResult<bool> {
    Ok(state.set_camera_enabled(enabled).await)
}

/// Start recording
#[tauri::command]
pub async fn start_recording(
    state: State<'_, Arc<AppState>>,
    request: RecordingRequest,
) -> CommandResult<StartedSession> {
    Ok(state.start_recording(request).await?)
}

/// Stop recording and upload it; `None` if a cancel got there first
#[tauri::command]
pub async fn stop_recording(
    state: State<'_, Arc<AppState>>,
) -> CommandResult<Option<UploadResult>> {
    Ok(state.stop_recording().await?)
}

/// Cancel recording and discard everything captured
#[tauri::command]
pub async fn cancel_recording(state: State<'_, Arc<AppState>>) -> CommandResult<()> {
    Ok(state.cancel_recording().await?)
}

#[tauri::command]
pub fn get_recording_state(state: State<'_, Arc<AppState>>) -> SessionPhase {
    state.phase()
}

/// Get current recording duration in milliseconds
#[tauri::command]
pub fn get_recording_duration(state: State<'_, Arc<AppState>>) -> u64 {
    state.recording_duration_ms()
}
