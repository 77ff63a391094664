//! System and window Tauri commands

use crate::app::AppState;
use crate::tray::{IndicatorMode, WindowVisibility};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tauri::{AppHandle, State};

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub arch: String,
    pub app_version: String,
    pub indicator: IndicatorMode,
}

/// Get basic system information
#[tauri::command]
pub fn get_system_info(state: State<'_, Arc<AppState>>) -> SystemInfo {
    SystemInfo {
        os: std::env::consts::OS.to_string(),
        os_version: get_os_version(),
        arch: std::env::consts::ARCH.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        indicator: state.tray().mode(),
    }
}

/// Message of the startup configuration error, if there was one
#[tauri::command]
pub fn get_config_error(state: State<'_, Arc<AppState>>) -> Option<String> {
    state.config_error()
}

#[tauri::command]
pub fn toggle_window(state: State<'_, Arc<AppState>>) -> WindowVisibility {
    state.toggle_window()
}

#[tauri::command]
pub fn quit_app(app: AppHandle) {
    tracing::info!("Quit requested from the window");
    app.exit(0);
}

fn get_os_version() -> String {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("sw_vers")
            .arg("-productVersion")
            .output()
            .ok()
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "ver"])
            .output()
            .ok()
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|release| {
                release.lines().find_map(|line| {
                    line.strip_prefix("PRETTY_NAME=")
                        .map(|name| name.trim_matches('"').to_string())
                })
            })
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
