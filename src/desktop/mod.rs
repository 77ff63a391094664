//! Tauri desktop shell
//!
//! Wires the application state to a tray icon, the main webview window and
//! the IPC commands.

pub mod notifier;
pub mod tray;

use crate::app::AppState;
use crate::commands;
use crate::tray::{IndicatorMode, TrayController};
use notifier::WebviewNotifier;
use std::sync::Arc;
use tauri::Manager;
use tray::TauriTrayView;

/// Run the desktop application until the user quits
pub fn run(mode: IndicatorMode) {
    tauri::Builder::default()
        // Registered first so a second launch exits before building anything
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            tracing::info!("Second instance launched; revealing this one");
            if let Some(state) = app.try_state::<Arc<AppState>>() {
                state.reveal_window();
            }
        }))
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            // Recording commands
            commands::recording::get_sources,
            commands::recording::get_audio_devices,
            commands::recording::get_cameras,
            commands::recording::check_permission,
            commands::recording::request_permission,
            commands::recording::set_camera_enabled,
            commands::recording::start_recording,
            commands::recording::stop_recording,
            commands::recording::cancel_recording,
            commands::recording::get_recording_state,
            commands::recording::get_recording_duration,
            // System commands
            commands::system::get_system_info,
            commands::system::get_config_error,
            commands::system::toggle_window,
            commands::system::quit_app,
        ])
        .setup(move |app| {
            let handle = app.handle().clone();

            let controller = Arc::new(TrayController::new(mode));
            let state = Arc::new(
                crate::build_state(Arc::new(WebviewNotifier::new(handle.clone())))
                    .with_tray(controller.clone()),
            );

            let tray_icon = if mode.has_tray() {
                Some(tray::setup_tray(&handle)?)
            } else {
                None
            };
            controller.attach(Arc::new(TauriTrayView::new(handle, tray_icon)));

            tauri::async_runtime::spawn(state.forward_events());
            state.announce();
            app.manage(state);

            tracing::info!("Desktop shell ready ({:?})", mode);
            Ok(())
        })
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::CloseRequested { api, .. } = event {
                // With a tray icon the window only hides; the tray brings it back
                if let Some(state) = window.try_state::<Arc<AppState>>() {
                    if state.tray().mode().has_tray() {
                        api.prevent_close();
                        state.tray().hide_window();
                    }
                }
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
