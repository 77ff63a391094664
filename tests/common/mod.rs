//! Scripted doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use clipshare_lib::app::{AppState, Notification, Notifier, UrlOpener};
use clipshare_lib::capture::{
    AudioDevice, CameraDevice, CaptureBackend, CaptureSource, MediaEncoder, MediaKind,
    PermissionStatus, StreamPlan, TrackKind,
};
use clipshare_lib::config::UrlPolicy;
use clipshare_lib::upload::{ObjectStore, PutRequest, StoredObject, UploadHandoff};
use clipshare_lib::utils::{AppError, AppResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const CHUNK: &[u8] = &[0x1a; 512];
pub const TRAILER: &[u8] = b"cues";

/// Capture backend with one primary screen, one microphone and scripted
/// failures
pub struct ScriptedBackend {
    pub cameras: Vec<CameraDevice>,
    pub permissions: HashMap<MediaKind, PermissionStatus>,
    pub audio_fails: bool,
    /// When set, camera enumeration fails with this message
    pub camera_listing_error: Option<String>,
    /// When set, source enumeration waits for a notification
    pub start_gate: Option<Arc<Notify>>,
    /// When set, the encoder's stop waits for a notification
    pub drain_gate: Option<Arc<Notify>>,

    pub enumerations: AtomicUsize,
    pub acquisitions: AtomicUsize,
    pub plans: Mutex<Vec<StreamPlan>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            cameras: vec![CameraDevice {
                id: "cam-0".to_string(),
                label: "FaceTime HD Camera".to_string(),
            }],
            permissions: HashMap::new(),
            audio_fails: false,
            camera_listing_error: None,
            start_gate: None,
            drain_gate: None,
            enumerations: AtomicUsize::new(0),
            acquisitions: AtomicUsize::new(0),
            plans: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedBackend {
    pub fn with_permission(mut self, kind: MediaKind, status: PermissionStatus) -> Self {
        self.permissions.insert(kind, status);
        self
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn last_plan(&self) -> Option<StreamPlan> {
        self.plans.lock().last().cloned()
    }
}

#[async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn sources(&self) -> AppResult<Vec<CaptureSource>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.start_gate {
            gate.notified().await;
        }
        Ok(vec![
            CaptureSource {
                id: "screen-1".to_string(),
                name: "Side display".to_string(),
                geometry: None,
                is_primary: false,
            },
            CaptureSource {
                id: "screen-0".to_string(),
                name: "Built-in display".to_string(),
                geometry: None,
                is_primary: true,
            },
        ])
    }

    async fn audio_devices(&self) -> AppResult<Vec<AudioDevice>> {
        Ok(vec![AudioDevice {
            id: "mic-1".to_string(),
            label: "USB Microphone".to_string(),
        }])
    }

    async fn cameras(&self) -> AppResult<Vec<CameraDevice>> {
        if let Some(message) = &self.camera_listing_error {
            return Err(AppError::Encoder(message.clone()));
        }
        Ok(self.cameras.clone())
    }

    async fn check_permission(&self, kind: MediaKind) -> PermissionStatus {
        self.permissions
            .get(&kind)
            .copied()
            .unwrap_or(PermissionStatus::Granted)
    }

    async fn request_permission(&self, kind: MediaKind) -> PermissionStatus {
        self.check_permission(kind).await
    }

    async fn open_audio(&self, _device: &AudioDevice) -> AppResult<()> {
        if self.audio_fails {
            return Err(AppError::AudioCapture("device is busy".to_string()));
        }
        Ok(())
    }

    async fn open_encoder(&self, plan: &StreamPlan) -> AppResult<Box<dyn MediaEncoder>> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.plans.lock().push(plan.clone());
        Ok(Box::new(TickingEncoder {
            tracks: plan.tracks(),
            interval: tokio::time::interval(Duration::from_millis(50)),
            stopping: false,
            trailer_sent: false,
            drain_gate: self.drain_gate.clone(),
        }))
    }
}

/// Produces one chunk per tick and a trailer after `stop`
struct TickingEncoder {
    tracks: Vec<TrackKind>,
    interval: tokio::time::Interval,
    stopping: bool,
    trailer_sent: bool,
    drain_gate: Option<Arc<Notify>>,
}

#[async_trait]
impl MediaEncoder for TickingEncoder {
    fn tracks(&self) -> Vec<TrackKind> {
        self.tracks.clone()
    }

    async fn next_chunk(&mut self) -> AppResult<Option<Vec<u8>>> {
        if self.stopping {
            if self.trailer_sent {
                return Ok(None);
            }
            self.trailer_sent = true;
            return Ok(Some(TRAILER.to_vec()));
        }
        self.interval.tick().await;
        Ok(Some(CHUNK.to_vec()))
    }

    async fn stop(&mut self) -> AppResult<()> {
        if let Some(gate) = &self.drain_gate {
            gate.notified().await;
        }
        self.stopping = true;
        Ok(())
    }
}

/// In-memory bucket at `https://bucket.example`
#[derive(Default)]
pub struct MockStore {
    pub puts: Mutex<Vec<PutRequest>>,
    pub bytes_sent: AtomicUsize,
    pub fail_with: Option<String>,
    /// When set, `put_object` waits for a notification
    pub gate: Option<Arc<Notify>>,
}

impl MockStore {
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts.lock().iter().map(|put| put.key.clone()).collect()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn put_object(&self, request: PutRequest) -> AppResult<StoredObject> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(message) = &self.fail_with {
            return Err(AppError::UploadFailed(message.clone()));
        }
        self.bytes_sent
            .fetch_add(request.body.len(), Ordering::SeqCst);
        let stored = StoredObject {
            key: request.key.clone(),
            location: format!("https://bucket.example/{}", request.key),
        };
        self.puts.lock().push(request);
        Ok(stored)
    }

    async fn presign_get(&self, key: &str, expiry: Duration) -> AppResult<String> {
        Ok(format!(
            "https://bucket.example/{}?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Expires={}&X-Amz-Signature=f00d",
            key,
            expiry.as_secs()
        ))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn saved(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Saved { url } => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error { code, message, .. } => Some((code, message)),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Warning(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Notification) -> usize {
        self.all().iter().filter(|n| *n == wanted).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}

#[derive(Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<String>>,
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> AppResult<()> {
        self.opened.lock().push(url.to_string());
        Ok(())
    }
}

/// A desktop with no browser to hand URLs to
pub struct BrokenOpener;

impl UrlOpener for BrokenOpener {
    fn open(&self, _url: &str) -> AppResult<()> {
        Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no browser",
        )))
    }
}

/// Everything a test needs to drive and observe one application
pub struct Harness {
    pub state: Arc<AppState>,
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<MockStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub opener: Arc<RecordingOpener>,
}

impl Harness {
    pub fn new(backend: ScriptedBackend, store: MockStore, policy: UrlPolicy) -> Self {
        let backend = Arc::new(backend);
        let store = Arc::new(store);
        let notifier = Arc::new(RecordingNotifier::default());
        let opener = Arc::new(RecordingOpener::default());

        let handoff = UploadHandoff::new(store.clone(), "public-read", policy);
        let state = AppState::new(backend.clone(), Ok(handoff), notifier.clone())
            .with_opener(opener.clone());

        Self {
            state: Arc::new(state),
            backend,
            store,
            notifier,
            opener,
        }
    }

    pub fn simple() -> Self {
        Self::new(
            ScriptedBackend::default(),
            MockStore::default(),
            UrlPolicy::Location,
        )
    }
}

/// Poll until `check` holds, failing the test after two seconds
pub async fn wait_until<F: Fn() -> bool>(check: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
