//! ClipShare - record the screen from the tray and share it as a link.
//!
//! This is the main library crate for ClipShare. It holds the recording
//! state machine, the ffmpeg capture backend, the S3 upload handoff and,
//! with the `desktop` feature, the Tauri shell around them.

pub mod app;
pub mod capture;
pub mod config;
pub mod headless;
pub mod recorder;
pub mod tray;
pub mod upload;
pub mod utils;

#[cfg(feature = "desktop")]
pub mod commands;
#[cfg(feature = "desktop")]
pub mod desktop;

use app::{AppState, Notifier};
use capture::FfmpegBackend;
use config::{CaptureConfig, StorageConfig};
use recorder::state::RecordingRequest;
use std::sync::Arc;
use tray::IndicatorMode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload::UploadHandoff;

/// Install the log subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipshare_lib=debug,tauri=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Application state wired to ffmpeg and the configured bucket
pub fn build_state(notifier: Arc<dyn Notifier>) -> AppState {
    let capture = CaptureConfig::from_env();
    tracing::info!(
        "Capturing with {} at {} fps",
        capture.ffmpeg_path,
        capture.frame_rate
    );

    let handoff = StorageConfig::from_env().map(|storage| UploadHandoff::from_config(&storage));

    AppState::new(Arc::new(FfmpegBackend::new(capture)), handoff, notifier)
}

/// Initialize and run the application
pub fn run() {
    init_tracing();
    config::load_dotenv();

    tracing::info!("Starting ClipShare v{}", env!("CARGO_PKG_VERSION"));

    let mode = IndicatorMode::from_env();
    tracing::info!("Indicator mode: {:?}", mode);

    #[cfg(feature = "desktop")]
    {
        if mode.has_window() {
            desktop::run(mode);
            return;
        }
    }

    if mode.has_window() {
        tracing::info!("Built without the desktop shell; recording headless");
    }

    if let Err(e) = run_headless() {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_headless() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let state = Arc::new(build_state(Arc::new(headless::LogNotifier)));
        headless::run(state, RecordingRequest::default()).await
    })
}
