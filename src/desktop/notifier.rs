//! Notifications delivered to the webview as events

use crate::app::{Notification, Notifier};
use crate::utils::error::ErrorResponse;
use tauri::{AppHandle, Emitter};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

pub const EVENT_STATE: &str = "recording-state";
pub const EVENT_SAVED: &str = "recording-saved";
pub const EVENT_ERROR: &str = "recording-error";
pub const EVENT_WARNING: &str = "recording-warning";
pub const EVENT_CANCELLED: &str = "recording-cancelled";
pub const EVENT_CONFIG_ERROR: &str = "config-error";

pub struct WebviewNotifier {
    app: AppHandle,
}

impl WebviewNotifier {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn emit<S: serde::Serialize + Clone>(&self, event: &str, payload: S) {
        if let Err(e) = self.app.emit(event, payload) {
            tracing::warn!("Failed to emit {}: {}", event, e);
        }
    }
}

impl Notifier for WebviewNotifier {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::PhaseChanged(phase) => self.emit(EVENT_STATE, phase),
            Notification::Saved { url } => self.emit(EVENT_SAVED, url),
            Notification::Error {
                code,
                message,
                recoverable,
            } => self.emit(
                EVENT_ERROR,
                ErrorResponse {
                    code,
                    message,
                    recoverable,
                },
            ),
            Notification::Warning(message) => self.emit(EVENT_WARNING, message),
            Notification::Cancelled => self.emit(EVENT_CANCELLED, ()),
            Notification::ConfigError(message) => {
                self.emit(EVENT_CONFIG_ERROR, message.clone());
                // The webview may not be listening yet at startup
                self.app
                    .dialog()
                    .message(format!(
                        "ClipShare is not configured and cannot upload recordings.\n\n{}",
                        message
                    ))
                    .title("ClipShare configuration")
                    .kind(MessageDialogKind::Error)
                    .show(|_| {});
            }
        }
    }
}
