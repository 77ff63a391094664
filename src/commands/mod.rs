//! Tauri command handlers
//!
//! IPC handlers the webview calls through `invoke`. Each one forwards to
//! the shared [`AppState`](crate::app::AppState).

pub mod recording;
pub mod system;
