//! Tray and window controller
//!
//! Keeps the tray icon and the primary window in step with the recording
//! phase. Only the latest state is kept; there is no queue of updates.

pub mod capability;

pub use capability::IndicatorMode;

use crate::recorder::state::SessionPhase;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Application name shown in the window title and tray tooltip
pub const APP_TITLE: &str = "ClipShare";

/// What the tray icon shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrayPhase {
    Idle,
    Recording,
}

impl From<SessionPhase> for TrayPhase {
    fn from(phase: SessionPhase) -> Self {
        if phase.is_capturing() {
            TrayPhase::Recording
        } else {
            TrayPhase::Idle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowVisibility {
    Shown,
    Hidden,
}

impl WindowVisibility {
    pub fn toggled(self) -> Self {
        match self {
            WindowVisibility::Shown => WindowVisibility::Hidden,
            WindowVisibility::Hidden => WindowVisibility::Shown,
        }
    }
}

/// The concrete tray icon and window, provided by the desktop shell
pub trait TrayView: Send + Sync {
    fn show_phase(&self, phase: TrayPhase);
    fn set_window_visible(&self, visible: bool);
    fn set_window_title(&self, title: &str);
}

struct TrayState {
    phase: TrayPhase,
    visibility: WindowVisibility,
    title: String,
}

pub struct TrayController {
    mode: IndicatorMode,
    state: Mutex<TrayState>,
    view: RwLock<Option<Arc<dyn TrayView>>>,
}

impl TrayController {
    pub fn new(mode: IndicatorMode) -> Self {
        let visibility = if mode.has_window() {
            WindowVisibility::Shown
        } else {
            WindowVisibility::Hidden
        };
        Self {
            mode,
            state: Mutex::new(TrayState {
                phase: TrayPhase::Idle,
                visibility,
                title: window_title(SessionPhase::Idle),
            }),
            view: RwLock::new(None),
        }
    }

    pub fn mode(&self) -> IndicatorMode {
        self.mode
    }

    /// Attach the view and bring it up to date with the current state
    pub fn attach(&self, view: Arc<dyn TrayView>) {
        let (phase, visibility, title) = {
            let state = self.state.lock();
            (state.phase, state.visibility, state.title.clone())
        };
        if self.mode.has_tray() {
            view.show_phase(phase);
        }
        view.set_window_visible(visibility == WindowVisibility::Shown);
        view.set_window_title(&title);
        *self.view.write() = Some(view);
    }

    pub fn phase(&self) -> TrayPhase {
        self.state.lock().phase
    }

    pub fn visibility(&self) -> WindowVisibility {
        self.state.lock().visibility
    }

    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    fn view(&self) -> Option<Arc<dyn TrayView>> {
        self.view.read().clone()
    }

    /// Mirror a session phase change
    pub fn apply_phase(&self, phase: SessionPhase) {
        let tray_phase = TrayPhase::from(phase);
        let title = window_title(phase);

        let (icon_changed, title_changed) = {
            let mut state = self.state.lock();
            let icon_changed = state.phase != tray_phase;
            let title_changed = state.title != title;
            state.phase = tray_phase;
            state.title = title.clone();
            (icon_changed, title_changed)
        };

        let Some(view) = self.view() else {
            return;
        };
        if icon_changed && self.mode.has_tray() {
            view.show_phase(tray_phase);
        }
        if title_changed && self.mode == IndicatorMode::WindowOnly {
            view.set_window_title(&title);
        }
    }

    /// Flip the primary window's visibility; returns the new visibility
    pub fn toggle_window(&self) -> WindowVisibility {
        let visibility = {
            let mut state = self.state.lock();
            state.visibility = state.visibility.toggled();
            state.visibility
        };
        tracing::debug!("Window {:?}", visibility);
        if let Some(view) = self.view() {
            view.set_window_visible(visibility == WindowVisibility::Shown);
        }
        visibility
    }

    pub fn show_window(&self) {
        self.state.lock().visibility = WindowVisibility::Shown;
        if let Some(view) = self.view() {
            view.set_window_visible(true);
        }
    }

    pub fn hide_window(&self) {
        self.state.lock().visibility = WindowVisibility::Hidden;
        if let Some(view) = self.view() {
            view.set_window_visible(false);
        }
    }
}

fn window_title(phase: SessionPhase) -> String {
    match phase {
        SessionPhase::Idle | SessionPhase::Cancelled => APP_TITLE.to_string(),
        SessionPhase::Starting => format!("{} (starting)", APP_TITLE),
        SessionPhase::Recording => format!("\u{25cf} {} (recording)", APP_TITLE),
        SessionPhase::Stopping => format!("{} (finishing)", APP_TITLE),
        SessionPhase::Uploading => format!("{} (uploading)", APP_TITLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordedView {
        phases: Mutex<Vec<TrayPhase>>,
        visible: Mutex<Vec<bool>>,
        titles: Mutex<Vec<String>>,
    }

    impl TrayView for RecordedView {
        fn show_phase(&self, phase: TrayPhase) {
            self.phases.lock().push(phase);
        }

        fn set_window_visible(&self, visible: bool) {
            self.visible.lock().push(visible);
        }

        fn set_window_title(&self, title: &str) {
            self.titles.lock().push(title.to_string());
        }
    }

    #[test]
    fn test_icon_follows_recording_entry_and_exit() {
        let controller = TrayController::new(IndicatorMode::StatusIcon);
        let view = Arc::new(RecordedView::default());
        controller.attach(view.clone());

        for phase in [
            SessionPhase::Starting,
            SessionPhase::Recording,
            SessionPhase::Stopping,
            SessionPhase::Uploading,
            SessionPhase::Idle,
        ] {
            controller.apply_phase(phase);
        }

        assert_eq!(
            *view.phases.lock(),
            vec![TrayPhase::Idle, TrayPhase::Recording, TrayPhase::Idle]
        );
        assert_eq!(controller.phase(), TrayPhase::Idle);
    }

    #[test]
    fn test_last_state_wins_before_view_attached() {
        let controller = TrayController::new(IndicatorMode::StatusIcon);
        controller.apply_phase(SessionPhase::Recording);
        controller.apply_phase(SessionPhase::Stopping);
        controller.apply_phase(SessionPhase::Recording);

        let view = Arc::new(RecordedView::default());
        controller.attach(view.clone());
        assert_eq!(*view.phases.lock(), vec![TrayPhase::Recording]);
    }

    #[test]
    fn test_toggle_window() {
        let controller = TrayController::new(IndicatorMode::StatusIcon);
        let view = Arc::new(RecordedView::default());
        controller.attach(view.clone());

        assert_eq!(controller.visibility(), WindowVisibility::Shown);
        assert_eq!(controller.toggle_window(), WindowVisibility::Hidden);
        assert_eq!(controller.toggle_window(), WindowVisibility::Shown);
        assert_eq!(*view.visible.lock(), vec![true, false, true]);
    }

    #[test]
    fn test_window_only_mirrors_phase_in_title() {
        let controller = TrayController::new(IndicatorMode::WindowOnly);
        let view = Arc::new(RecordedView::default());
        controller.attach(view.clone());

        controller.apply_phase(SessionPhase::Recording);
        controller.apply_phase(SessionPhase::Uploading);
        controller.apply_phase(SessionPhase::Idle);

        assert!(view.phases.lock().is_empty());
        let titles = view.titles.lock();
        assert_eq!(titles.len(), 4);
        assert!(titles[1].contains("recording"));
        assert!(titles[2].contains("uploading"));
        assert_eq!(titles[3], APP_TITLE);
    }

    #[test]
    fn test_show_window_brings_back_a_hidden_window() {
        let controller = TrayController::new(IndicatorMode::StatusIcon);
        let view = Arc::new(RecordedView::default());
        controller.attach(view.clone());

        controller.hide_window();
        controller.show_window();
        controller.show_window();

        assert_eq!(controller.visibility(), WindowVisibility::Shown);
        assert_eq!(*view.visible.lock(), vec![true, false, true, true]);
    }

    #[test]
    fn test_headless_starts_hidden() {
        let controller = TrayController::new(IndicatorMode::Headless);
        assert_eq!(controller.visibility(), WindowVisibility::Hidden);
    }
}
