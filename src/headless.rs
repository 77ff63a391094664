//! Headless runner
//!
//! Used when there is no tray or window: records the primary screen until
//! Ctrl-C, uploads the result and prints the URL.

use crate::app::{AppState, Notification, Notifier};
use crate::recorder::state::RecordingRequest;
use anyhow::Context;
use std::sync::Arc;

/// Writes notifications to the log
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::PhaseChanged(phase) => tracing::debug!("Phase: {}", phase),
            Notification::Saved { url } => tracing::info!("Recording saved: {}", url),
            Notification::Error { code, message, .. } => tracing::error!("{}: {}", code, message),
            Notification::Warning(message) => tracing::warn!("{}", message),
            Notification::Cancelled => tracing::info!("Recording cancelled"),
            Notification::ConfigError(message) => {
                tracing::error!("Missing configuration: {}", message)
            }
        }
    }
}

pub async fn run(state: Arc<AppState>, request: RecordingRequest) -> anyhow::Result<()> {
    state.announce();
    if let Some(message) = state.config_error() {
        anyhow::bail!("Cannot record without storage configuration: {}", message);
    }

    let forwarder = tokio::spawn(state.forward_events());

    let started = state
        .start_recording(request)
        .await
        .context("Failed to start recording")?;
    tracing::info!(
        session = %started.session_id,
        "Recording {} ({:?}). Press Ctrl-C to stop.",
        started.source_name,
        started.tracks
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    let uploaded = state.stop_recording().await.context("Failed to save recording")?;
    if let Some(result) = uploaded {
        println!("{}", result.url);
    }

    forwarder.abort();
    Ok(())
}
