//! Status indicator capability
//!
//! Decided once at startup from the environment.

use serde::{Deserialize, Serialize};

/// Environment override for the indicator mode
pub const INDICATOR_VAR: &str = "CLIPSHARE_INDICATOR";

/// How the session phase is shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndicatorMode {
    /// Tray icon with idle/recording images
    StatusIcon,
    /// No usable tray; the phase goes into the window title
    WindowOnly,
    /// No display at all
    Headless,
}

impl IndicatorMode {
    pub fn from_env() -> Self {
        detect(std::env::consts::OS, |key| std::env::var(key).ok())
    }

    pub fn has_tray(&self) -> bool {
        matches!(self, IndicatorMode::StatusIcon)
    }

    pub fn has_window(&self) -> bool {
        !matches!(self, IndicatorMode::Headless)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tray" | "icon" | "statusicon" => Some(IndicatorMode::StatusIcon),
            "window" | "windowonly" => Some(IndicatorMode::WindowOnly),
            "headless" | "none" => Some(IndicatorMode::Headless),
            _ => None,
        }
    }
}

/// Resolve the indicator mode for `os` from environment values
pub fn detect<F>(os: &str, lookup: F) -> IndicatorMode
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(INDICATOR_VAR) {
        match IndicatorMode::parse(&value) {
            Some(mode) => return mode,
            None => tracing::warn!("Ignoring unknown {} value: {}", INDICATOR_VAR, value),
        }
    }

    if os != "linux" {
        return IndicatorMode::StatusIcon;
    }

    let has_display = ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|key| lookup(*key).is_some_and(|v| !v.is_empty()));
    if !has_display {
        return IndicatorMode::Headless;
    }

    // Stock GNOME Shell has no status notifier area
    let desktop = lookup("XDG_CURRENT_DESKTOP").unwrap_or_default();
    if desktop
        .split(':')
        .any(|part| part.eq_ignore_ascii_case("gnome"))
    {
        return IndicatorMode::WindowOnly;
    }

    IndicatorMode::StatusIcon
}
