//! Recording coordinator
//!
//! Owns the session state machine and makes sure at most one session is
//! ever active. Every transition goes through a compare-and-set on the
//! phase, taken before the first suspension point, so a second start is
//! rejected without touching any capture device.

use super::session::RecordingSession;
use super::state::{
    CancelOutcome, FinishedRecording, RecordingRequest, SessionPhase, StartedSession, StopOutcome,
};
use crate::capture::permissions;
use crate::capture::traits::{
    CaptureBackend, CaptureSource, MediaKind, PermissionStatus, StreamPlan,
};
use crate::utils::error::{AppError, AppResult};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events emitted during recording
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// The state machine moved
    PhaseChanged(SessionPhase),
    /// Non-fatal problem; the session continues in degraded form
    Warning(String),
}

/// Manages the lifecycle of the single recording session
pub struct RecordingCoordinator {
    /// Current phase
    phase: RwLock<SessionPhase>,

    /// Platform capture backend
    backend: Arc<dyn CaptureBackend>,

    /// The active session, present from `Recording` until `Stopping` ends
    session: Mutex<Option<RecordingSession>>,

    /// Whether a cancel was requested for the session being recorded or
    /// stopped. `None` once that session's fate is decided.
    cancel_requested: Mutex<Option<bool>>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl RecordingCoordinator {
    /// Create a new recording coordinator
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            phase: RwLock::new(SessionPhase::Idle),
            backend,
            session: Mutex::new(None),
            cancel_requested: Mutex::new(None),
            event_tx,
        }
    }

    pub fn backend(&self) -> &Arc<dyn CaptureBackend> {
        &self.backend
    }

    /// Get the current phase
    pub fn phase(&self) -> SessionPhase {
        *self.phase.read()
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Milliseconds since the active session started, 0 when idle
    pub fn duration_ms(&self) -> u64 {
        self.session
            .lock()
            .as_ref()
            .map(|session| session.elapsed_ms())
            .unwrap_or(0)
    }

    fn emit(&self, event: RecordingEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn set_phase(&self, phase: SessionPhase) {
        *self.phase.write() = phase;
        tracing::debug!("Recording phase -> {}", phase);
        self.emit(RecordingEvent::PhaseChanged(phase));
    }

    /// Move from `from` to `to` atomically, or report why not
    fn transition(
        &self,
        action: &'static str,
        from: SessionPhase,
        to: SessionPhase,
    ) -> AppResult<()> {
        {
            let mut phase = self.phase.write();
            if *phase != from {
                return Err(match (action, *phase) {
                    ("start", _) => AppError::AlreadyRecording,
                    (_, SessionPhase::Idle) => AppError::NotRecording,
                    (_, current) => AppError::InvalidTransition {
                        action,
                        phase: current.to_string(),
                    },
                });
            }
            *phase = to;
        }
        tracing::debug!("Recording phase {} -> {}", from, to);
        self.emit(RecordingEvent::PhaseChanged(to));
        Ok(())
    }

    fn warn(&self, message: String, warnings: &mut Vec<String>) {
        tracing::warn!("{}", message);
        self.emit(RecordingEvent::Warning(message.clone()));
        warnings.push(message);
    }

    /// Start recording
    ///
    /// Audio and camera problems degrade the session and are reported as
    /// warnings; everything else returns the coordinator to `Idle`.
    pub async fn start(&self, request: RecordingRequest) -> AppResult<StartedSession> {
        self.transition("start", SessionPhase::Idle, SessionPhase::Starting)?;

        match self.acquire(&request).await {
            Ok(started) => Ok(started),
            Err(e) => {
                tracing::error!("Failed to start recording: {}", e);
                self.set_phase(SessionPhase::Idle);
                Err(e)
            }
        }
    }

    async fn acquire(&self, request: &RecordingRequest) -> AppResult<StartedSession> {
        let audio_id = if request.record_audio {
            match request.audio_device_id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) => Some(id.to_string()),
                None => return Err(AppError::NoAudioDevice),
            }
        } else {
            None
        };

        let source = self.select_source(request.source_id.as_deref()).await?;
        tracing::info!("Selected capture source: {} ({})", source.name, source.id);

        let audio_device = match audio_id {
            Some(id) => Some(
                self.backend
                    .audio_devices()
                    .await?
                    .into_iter()
                    .find(|device| device.id == id)
                    .ok_or(AppError::NoAudioDevice)?,
            ),
            None => None,
        };

        match permissions::negotiate(self.backend.as_ref(), MediaKind::Screen).await {
            PermissionStatus::Granted | PermissionStatus::Unknown => {}
            PermissionStatus::Denied => {
                return Err(AppError::PermissionDenied(
                    "Screen recording permission not granted. Please allow it in system settings and try again.".to_string(),
                ))
            }
            PermissionStatus::Unavailable => return Err(AppError::NoCaptureSource),
        }

        let mut warnings = Vec::new();
        let mut plan = StreamPlan::video_only(source);

        if let Some(device) = audio_device {
            match self.backend.open_audio(&device).await {
                Ok(()) => plan.audio = Some(device),
                Err(e) => self.warn(
                    format!("{}. Continuing with video only.", e),
                    &mut warnings,
                ),
            }
        }

        if request.camera {
            match permissions::negotiate(self.backend.as_ref(), MediaKind::Camera).await {
                PermissionStatus::Granted | PermissionStatus::Unknown => {
                    let first = self.backend.cameras().await.map(|c| c.into_iter().next());
                    match first {
                        Ok(Some(camera)) => plan.camera = Some(camera),
                        Ok(None) => self.warn(
                            "No camera found. Recording without camera overlay.".to_string(),
                            &mut warnings,
                        ),
                        Err(e) => self.warn(
                            format!("{}. Recording without camera overlay.", e),
                            &mut warnings,
                        ),
                    }
                }
                PermissionStatus::Denied => self.warn(
                    "Camera permission denied. Recording without camera overlay.".to_string(),
                    &mut warnings,
                ),
                PermissionStatus::Unavailable => self.warn(
                    "No camera found. Recording without camera overlay.".to_string(),
                    &mut warnings,
                ),
            }
        }

        let encoder = self.backend.open_encoder(&plan).await?;
        let session = RecordingSession::begin(encoder);

        let started = StartedSession {
            session_id: session.id(),
            source_name: plan.source.name.clone(),
            tracks: session.tracks().to_vec(),
            warnings,
        };

        *self.cancel_requested.lock() = Some(false);
        *self.session.lock() = Some(session);
        self.set_phase(SessionPhase::Recording);

        tracing::info!("Recording started");
        Ok(started)
    }

    async fn select_source(&self, requested: Option<&str>) -> AppResult<CaptureSource> {
        let sources = self.backend.sources().await?;
        let source = match requested {
            Some(id) => sources.into_iter().find(|source| source.id == id),
            None => {
                let primary = sources.iter().position(|source| source.is_primary).unwrap_or(0);
                sources.into_iter().nth(primary)
            }
        };
        source.ok_or(AppError::NoCaptureSource)
    }

    /// Stop recording and finalize the chunks.
    ///
    /// On `Finished` the coordinator stays in `Uploading` until
    /// [`finish_upload`](Self::finish_upload) is called.
    pub async fn stop(&self) -> AppResult<StopOutcome> {
        self.transition("stop", SessionPhase::Recording, SessionPhase::Stopping)?;
        tracing::info!("Stopping recording");
        self.finalize().await
    }

    /// Cancel recording; nothing recorded so far is ever uploaded.
    ///
    /// While another caller is already stopping, this only raises the cancel
    /// flag and that stop takes the cancelled path. Once the stop has decided
    /// to keep the recording, a cancel is rejected.
    pub async fn cancel(&self) -> AppResult<CancelOutcome> {
        if self.phase() == SessionPhase::Stopping {
            if let Some(requested) = self.cancel_requested.lock().as_mut() {
                tracing::info!("Cancel requested while stopping");
                *requested = true;
                return Ok(CancelOutcome::Flagged);
            }
        }

        self.transition("cancel", SessionPhase::Recording, SessionPhase::Stopping)?;
        tracing::info!("Cancelling recording");
        if let Some(requested) = self.cancel_requested.lock().as_mut() {
            *requested = true;
        }

        match self.finalize().await? {
            StopOutcome::Cancelled => Ok(CancelOutcome::Discarded),
            StopOutcome::Finished(_) => Err(AppError::InvalidTransition {
                action: "cancel",
                phase: SessionPhase::Uploading.to_string(),
            }),
        }
    }

    async fn finalize(&self) -> AppResult<StopOutcome> {
        let session = self.session.lock().take();
        let Some(session) = session else {
            *self.cancel_requested.lock() = None;
            self.set_phase(SessionPhase::Idle);
            return Err(AppError::NotRecording);
        };

        let result = session.finish().await;
        // Decided under the lock `cancel` uses: a cancel either lands before
        // this and discards the chunks, or finds no flag and is rejected
        let cancelled = self.cancel_requested.lock().take().unwrap_or(false);

        match result {
            Ok(output) if cancelled => {
                tracing::info!(
                    session = %output.session_id,
                    "Session cancelled, discarding {} chunks ({} bytes)",
                    output.chunks.chunk_count(),
                    output.chunks.total_len()
                );
                self.set_phase(SessionPhase::Cancelled);
                self.set_phase(SessionPhase::Idle);
                Ok(StopOutcome::Cancelled)
            }
            Ok(output) => {
                tracing::info!(
                    session = %output.session_id,
                    "Session finalized: {} bytes, {}ms",
                    output.chunks.total_len(),
                    output.duration_ms
                );
                self.set_phase(SessionPhase::Uploading);
                Ok(StopOutcome::Finished(FinishedRecording {
                    session_id: output.session_id,
                    tracks: output.tracks,
                    duration_ms: output.duration_ms,
                    data: output.chunks.finalize(),
                }))
            }
            Err(e) => {
                tracing::error!("Failed to finalize recording: {}", e);
                self.set_phase(SessionPhase::Idle);
                Err(e)
            }
        }
    }

    /// Leave `Uploading` once the handoff is over, whatever its outcome
    pub fn finish_upload(&self) -> AppResult<()> {
        self.transition("finish upload", SessionPhase::Uploading, SessionPhase::Idle)
    }
}
