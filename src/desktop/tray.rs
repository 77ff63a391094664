//! Tauri tray icon and primary window
//!
//! Left-click (or the "Show/Hide" menu item) toggles the window; the menu
//! also carries "Quit". The idle and recording images are drawn here.

use crate::app::AppState;
use crate::tray::{TrayPhase, TrayView, APP_TITLE};
use std::sync::Arc;
use tauri::{
    image::Image,
    menu::{MenuBuilder, MenuItemBuilder},
    tray::{MouseButton, MouseButtonState, TrayIcon, TrayIconBuilder, TrayIconEvent},
    AppHandle, Manager,
};

pub const TRAY_ID: &str = "clipshare-tray";
pub const MAIN_WINDOW: &str = "main";

const ICON_SIZE: u32 = 32;
const IDLE_COLOR: [u8; 4] = [0x9a, 0x9a, 0x9a, 0xff];
const RECORDING_COLOR: [u8; 4] = [0xe5, 0x39, 0x35, 0xff];

/// Filled, anti-aliased dot on a transparent square
fn draw_dot(color: [u8; 4]) -> Image<'static> {
    let size = ICON_SIZE as f32;
    let center = size / 2.0;
    let radius = size * 0.4;
    let mut rgba = Vec::with_capacity((ICON_SIZE * ICON_SIZE * 4) as usize);

    for y in 0..ICON_SIZE {
        for x in 0..ICON_SIZE {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            let distance = (dx * dx + dy * dy).sqrt();
            let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
            rgba.extend_from_slice(&color[..3]);
            rgba.push((color[3] as f32 * coverage) as u8);
        }
    }

    Image::new_owned(rgba, ICON_SIZE, ICON_SIZE)
}

fn icon_for(phase: TrayPhase) -> Image<'static> {
    match phase {
        TrayPhase::Idle => draw_dot(IDLE_COLOR),
        TrayPhase::Recording => draw_dot(RECORDING_COLOR),
    }
}

fn toggle_window(app: &AppHandle) {
    match app.try_state::<Arc<AppState>>() {
        Some(state) => {
            state.toggle_window();
        }
        None => tracing::warn!("Tray used before the application state was ready"),
    }
}

/// Build the tray icon and its menu
pub fn setup_tray(app: &AppHandle) -> tauri::Result<TrayIcon> {
    let toggle_item = MenuItemBuilder::with_id("toggle", "Show/Hide").build(app)?;
    let quit_item = MenuItemBuilder::with_id("quit", "Quit").build(app)?;
    let menu = MenuBuilder::new(app)
        .item(&toggle_item)
        .separator()
        .item(&quit_item)
        .build()?;

    TrayIconBuilder::with_id(TRAY_ID)
        .icon(icon_for(TrayPhase::Idle))
        .tooltip(APP_TITLE)
        .menu(&menu)
        .show_menu_on_left_click(false)
        .on_tray_icon_event(|tray_icon, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                tracing::debug!("Tray clicked");
                toggle_window(tray_icon.app_handle());
            }
        })
        .on_menu_event(|app, event| match event.id().as_ref() {
            "toggle" => toggle_window(app),
            "quit" => {
                tracing::info!("Quit requested from tray menu");
                app.exit(0);
            }
            _ => {}
        })
        .build(app)
}

/// Tray icon and main window as seen by the tray controller
pub struct TauriTrayView {
    app: AppHandle,
    tray: Option<TrayIcon>,
}

impl TauriTrayView {
    pub fn new(app: AppHandle, tray: Option<TrayIcon>) -> Self {
        Self { app, tray }
    }
}

impl TrayView for TauriTrayView {
    fn show_phase(&self, phase: TrayPhase) {
        let Some(tray) = &self.tray else {
            return;
        };
        if let Err(e) = tray.set_icon(Some(icon_for(phase))) {
            tracing::warn!("Failed to swap tray icon: {}", e);
        }
        let tooltip = match phase {
            TrayPhase::Idle => APP_TITLE.to_string(),
            TrayPhase::Recording => format!("{} (recording)", APP_TITLE),
        };
        if let Err(e) = tray.set_tooltip(Some(tooltip)) {
            tracing::warn!("Failed to update tray tooltip: {}", e);
        }
    }

    fn set_window_visible(&self, visible: bool) {
        let Some(window) = self.app.get_webview_window(MAIN_WINDOW) else {
            return;
        };
        let result = if visible {
            window.show().and_then(|_| window.set_focus())
        } else {
            window.hide()
        };
        if let Err(e) = result {
            tracing::warn!("Failed to change window visibility: {}", e);
        }
    }

    fn set_window_title(&self, title: &str) {
        if let Some(window) = self.app.get_webview_window(MAIN_WINDOW) {
            if let Err(e) = window.set_title(title) {
                tracing::warn!("Failed to set window title: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_is_opaque_in_center_and_clear_in_corner() {
        let image = draw_dot(RECORDING_COLOR);
        let rgba = image.rgba();
        let pixel = |x: u32, y: u32| {
            let i = ((y * ICON_SIZE + x) * 4) as usize;
            &rgba[i..i + 4]
        };
        assert_eq!(pixel(16, 16), &RECORDING_COLOR[..]);
        assert_eq!(pixel(0, 0)[3], 0);
        assert_eq!(rgba.len(), (ICON_SIZE * ICON_SIZE * 4) as usize);
    }
}
