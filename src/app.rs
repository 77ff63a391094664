//! Application state
//!
//! One explicit state object handed to every inbound operation, whether it
//! comes from the webview, the tray or the headless runner.

use crate::capture::permissions;
use crate::capture::traits::{
    AudioDevice, CameraDevice, CaptureBackend, CaptureSource, MediaKind, PermissionStatus,
};
use crate::recorder::coordinator::{RecordingCoordinator, RecordingEvent};
use crate::recorder::state::{
    CancelOutcome, RecordingRequest, SessionPhase, StartedSession, StopOutcome,
};
use crate::tray::{IndicatorMode, TrayController, WindowVisibility};
use crate::upload::handoff::{UploadHandoff, UploadResult};
use crate::utils::error::{AppError, AppResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Something the user should be told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    PhaseChanged(SessionPhase),
    /// Upload finished; carries the shareable URL
    Saved { url: String },
    /// `recoverable` is false when only a restart with fixed
    /// configuration helps
    Error {
        code: String,
        message: String,
        recoverable: bool,
    },
    Warning(String),
    /// Recording was cancelled; not an error
    Cancelled,
    /// Required configuration is missing
    ConfigError(String),
}

impl Notification {
    fn error(error: &AppError) -> Self {
        Notification::Error {
            code: error.code().to_string(),
            message: error.to_string(),
            recoverable: error.is_recoverable(),
        }
    }
}

/// Delivers notifications to the UI
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Opens a URL outside the application
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> AppResult<()>;
}

/// Opens URLs in the system browser
pub struct SystemUrlOpener;

impl UrlOpener for SystemUrlOpener {
    fn open(&self, url: &str) -> AppResult<()> {
        open::that_detached(url)?;
        Ok(())
    }
}

pub struct AppState {
    coordinator: Arc<RecordingCoordinator>,
    handoff: Result<UploadHandoff, String>,
    notifier: Arc<dyn Notifier>,
    opener: Arc<dyn UrlOpener>,
    tray: Arc<TrayController>,
    camera_enabled: AtomicBool,
}

impl AppState {
    /// `handoff` is the configured upload, or the configuration error that
    /// prevented building it. A configuration error refuses every start.
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        handoff: AppResult<UploadHandoff>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let handoff = handoff.map_err(|e| match e {
            AppError::Config(message) => message,
            other => other.to_string(),
        });
        Self {
            coordinator: Arc::new(RecordingCoordinator::new(backend)),
            handoff,
            notifier,
            opener: Arc::new(SystemUrlOpener),
            tray: Arc::new(TrayController::new(IndicatorMode::Headless)),
            camera_enabled: AtomicBool::new(false),
        }
    }

    pub fn with_opener(mut self, opener: Arc<dyn UrlOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_tray(mut self, tray: Arc<TrayController>) -> Self {
        self.tray = tray;
        self
    }

    pub fn tray(&self) -> &Arc<TrayController> {
        &self.tray
    }

    /// Tell the UI about a configuration error found at startup
    pub fn announce(&self) {
        if let Err(message) = &self.handoff {
            tracing::error!("Configuration error: {}", message);
            self.notifier
                .notify(Notification::ConfigError(message.clone()));
        }
    }

    /// Forward coordinator events to the tray and the notifier.
    ///
    /// Subscribes immediately; the returned future runs until the
    /// coordinator is dropped and is spawned on the caller's runtime.
    pub fn forward_events(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut events = self.coordinator.subscribe();
        let notifier = self.notifier.clone();
        let tray = self.tray.clone();
        let coordinator = Arc::downgrade(&self.coordinator);

        async move {
            loop {
                match events.recv().await {
                    Ok(RecordingEvent::PhaseChanged(phase)) => {
                        tray.apply_phase(phase);
                        notifier.notify(Notification::PhaseChanged(phase));
                    }
                    Ok(RecordingEvent::Warning(message)) => {
                        notifier.notify(Notification::Warning(message));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Event forwarder skipped {} events", skipped);
                        if let Some(coordinator) = coordinator.upgrade() {
                            tray.apply_phase(coordinator.phase());
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    fn report<T>(&self, result: AppResult<T>) -> AppResult<T> {
        if let Err(e) = &result {
            self.notifier.notify(Notification::error(e));
        }
        result
    }

    pub async fn sources(&self) -> AppResult<Vec<CaptureSource>> {
        self.coordinator.backend().sources().await
    }

    pub async fn audio_devices(&self) -> AppResult<Vec<AudioDevice>> {
        self.coordinator.backend().audio_devices().await
    }

    pub async fn cameras(&self) -> AppResult<Vec<CameraDevice>> {
        self.coordinator.backend().cameras().await
    }

    pub async fn check_permission(&self, kind: MediaKind) -> PermissionStatus {
        self.coordinator.backend().check_permission(kind).await
    }

    pub async fn request_permission(&self, kind: MediaKind) -> PermissionStatus {
        permissions::negotiate(self.coordinator.backend().as_ref(), kind).await
    }

    pub fn camera_enabled(&self) -> bool {
        self.camera_enabled.load(Ordering::SeqCst)
    }

    /// Toggle the camera overlay for the next session; returns the new setting.
    ///
    /// Enabling negotiates camera permission and stays off when refused.
    pub async fn set_camera_enabled(&self, enabled: bool) -> bool {
        if !enabled {
            self.camera_enabled.store(false, Ordering::SeqCst);
            return false;
        }

        match self.request_permission(MediaKind::Camera).await {
            PermissionStatus::Granted | PermissionStatus::Unknown => {
                self.camera_enabled.store(true, Ordering::SeqCst);
                true
            }
            status => {
                let message = match status {
                    PermissionStatus::Unavailable => "No camera found.",
                    _ => "Camera permission denied. Please allow camera access and try again.",
                };
                tracing::warn!("Camera overlay refused: {:?}", status);
                self.camera_enabled.store(false, Ordering::SeqCst);
                self.notifier
                    .notify(Notification::Warning(message.to_string()));
                false
            }
        }
    }

    pub async fn start_recording(&self, mut request: RecordingRequest) -> AppResult<StartedSession> {
        if let Err(message) = &self.handoff {
            return self.report(Err(AppError::Config(message.clone())));
        }
        request.camera |= self.camera_enabled();
        self.report(self.coordinator.start(request).await)
    }

    /// Stop, upload, open the URL and notify.
    ///
    /// Returns `None` when a cancel won the race with this stop.
    pub async fn stop_recording(&self) -> AppResult<Option<UploadResult>> {
        let outcome = self.report(self.coordinator.stop().await)?;

        let recording = match outcome {
            StopOutcome::Finished(recording) => recording,
            StopOutcome::Cancelled => {
                self.notifier.notify(Notification::Cancelled);
                return Ok(None);
            }
        };

        let result = match &self.handoff {
            Ok(handoff) => handoff.upload(recording).await,
            Err(message) => Err(AppError::Config(message.clone())),
        };
        if let Err(e) = self.coordinator.finish_upload() {
            tracing::warn!("Leaving upload phase: {}", e);
        }

        let uploaded = self.report(result)?;

        self.notifier.notify(Notification::Saved {
            url: uploaded.url.clone(),
        });
        if let Err(e) = self.opener.open(&uploaded.url) {
            tracing::warn!("Failed to open {}: {}", uploaded.url, e);
            self.notifier.notify(Notification::Warning(format!(
                "Could not open {}: {}",
                uploaded.url, e
            )));
        }
        Ok(Some(uploaded))
    }

    pub async fn cancel_recording(&self) -> AppResult<()> {
        match self.report(self.coordinator.cancel().await)? {
            CancelOutcome::Discarded => self.notifier.notify(Notification::Cancelled),
            // The draining stop sends the notification
            CancelOutcome::Flagged => {}
        }
        Ok(())
    }

    pub fn phase(&self) -> SessionPhase {
        self.coordinator.phase()
    }

    pub fn recording_duration_ms(&self) -> u64 {
        self.coordinator.duration_ms()
    }

    pub fn toggle_window(&self) -> WindowVisibility {
        self.tray.toggle_window()
    }

    /// Bring the window forward, e.g. when the app is launched again.
    /// Without a window there is nothing to show.
    pub fn reveal_window(&self) {
        if self.tray.mode().has_window() {
            self.tray.show_window();
        }
    }

    pub fn config_error(&self) -> Option<String> {
        self.handoff.as_ref().err().cloned()
    }
}
