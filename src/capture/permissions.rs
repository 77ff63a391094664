//! Media permission negotiation
//!
//! Access is negotiated as explicit steps: check, then request when the
//! platform cannot already confirm access.

use crate::capture::traits::{CaptureBackend, MediaKind, PermissionStatus};

/// Check access and request it when the answer is not final.
///
/// `Granted` and `Unavailable` are final. `Denied` and `Unknown` lead to a
/// request, whose outcome is returned.
pub async fn negotiate(backend: &dyn CaptureBackend, kind: MediaKind) -> PermissionStatus {
    let status = backend.check_permission(kind).await;
    tracing::debug!("{} permission status: {:?}", kind, status);

    match status {
        PermissionStatus::Granted | PermissionStatus::Unavailable => status,
        PermissionStatus::Denied | PermissionStatus::Unknown => {
            tracing::info!("Requesting {} permission", kind);
            let outcome = backend.request_permission(kind).await;
            tracing::info!("{} permission request outcome: {:?}", kind, outcome);
            outcome
        }
    }
}

/// Check if screen recording permission is granted
#[cfg(target_os = "macos")]
pub fn has_screen_recording_permission() -> bool {
    core_graphics::access::ScreenCaptureAccess::preflight()
}

/// Request screen recording permission
///
/// Shows the system prompt the first time. Returns true if access is
/// already granted.
#[cfg(target_os = "macos")]
pub fn request_screen_recording_permission() -> bool {
    core_graphics::access::ScreenCaptureAccess::request()
}

/// X11 capture needs no grant, only a display to connect to
#[cfg(target_os = "linux")]
pub fn has_screen_recording_permission() -> bool {
    std::env::var_os("DISPLAY").is_some()
}

#[cfg(target_os = "linux")]
pub fn request_screen_recording_permission() -> bool {
    has_screen_recording_permission()
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub fn has_screen_recording_permission() -> bool {
    // Windows doesn't require explicit permission for screen capture
    true
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub fn request_screen_recording_permission() -> bool {
    true
}

/// Screen access as a typed outcome
pub fn screen_permission_status() -> PermissionStatus {
    if has_screen_recording_permission() {
        PermissionStatus::Granted
    } else if cfg!(target_os = "linux") {
        PermissionStatus::Unavailable
    } else {
        PermissionStatus::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::traits::{
        AudioDevice, CameraDevice, CaptureSource, MediaEncoder, StreamPlan,
    };
    use crate::utils::error::{AppError, AppResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedBackend {
        check: PermissionStatus,
        request: PermissionStatus,
        requests: AtomicUsize,
    }

    impl FixedBackend {
        fn new(check: PermissionStatus, request: PermissionStatus) -> Self {
            Self {
                check,
                request,
                requests: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CaptureBackend for FixedBackend {
        async fn sources(&self) -> AppResult<Vec<CaptureSource>> {
            Ok(Vec::new())
        }

        async fn audio_devices(&self) -> AppResult<Vec<AudioDevice>> {
            Ok(Vec::new())
        }

        async fn cameras(&self) -> AppResult<Vec<CameraDevice>> {
            Ok(Vec::new())
        }

        async fn check_permission(&self, _kind: MediaKind) -> PermissionStatus {
            self.check
        }

        async fn request_permission(&self, _kind: MediaKind) -> PermissionStatus {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.request
        }

        async fn open_audio(&self, _device: &AudioDevice) -> AppResult<()> {
            Ok(())
        }

        async fn open_encoder(&self, _plan: &StreamPlan) -> AppResult<Box<dyn MediaEncoder>> {
            Err(AppError::Encoder("not supported".to_string()))
        }
    }

    #[tokio::test]
    async fn test_granted_skips_request() {
        let backend = FixedBackend::new(PermissionStatus::Granted, PermissionStatus::Denied);
        assert_eq!(
            negotiate(&backend, MediaKind::Camera).await,
            PermissionStatus::Granted
        );
        assert_eq!(backend.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_is_final() {
        let backend = FixedBackend::new(PermissionStatus::Unavailable, PermissionStatus::Granted);
        assert_eq!(
            negotiate(&backend, MediaKind::Camera).await,
            PermissionStatus::Unavailable
        );
        assert_eq!(backend.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_requests_access() {
        let backend = FixedBackend::new(PermissionStatus::Unknown, PermissionStatus::Granted);
        assert_eq!(
            negotiate(&backend, MediaKind::Microphone).await,
            PermissionStatus::Granted
        );
        assert_eq!(backend.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_request_stays_denied() {
        let backend = FixedBackend::new(PermissionStatus::Denied, PermissionStatus::Denied);
        assert_eq!(
            negotiate(&backend, MediaKind::Screen).await,
            PermissionStatus::Denied
        );
    }
}
