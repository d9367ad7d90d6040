//! Render-ready state for the egui UI.

use crate::egui_app::ui::style::{self, StatusTone};
use egui::Color32;

/// Top-level UI model consumed by the egui renderer.
#[derive(Clone, Debug)]
pub struct UiState {
    pub status: StatusBarState,
    /// Item on screen, if a dataset is open.
    pub item: Option<ItemView>,
    /// Category tiles in declaration order.
    pub tiles: Vec<TileView>,
    /// Follow-up panels for the active categories that need one.
    pub follow_ups: Vec<FollowUpView>,
    pub progress: ProgressView,
    /// Modal dialog waiting for the annotator.
    pub prompt: Option<Prompt>,
    /// Multiplier applied to the item text size. Not persisted.
    pub text_zoom: f32,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: StatusBarState::idle(),
            item: None,
            tiles: Vec::new(),
            follow_ups: Vec::new(),
            progress: ProgressView::default(),
            prompt: None,
            text_zoom: 1.0,
        }
    }
}

/// Status badge + text shown in the footer.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusBarState {
    pub text: String,
    pub badge_label: String,
    pub badge_color: Color32,
}

impl StatusBarState {
    pub fn idle() -> Self {
        Self {
            text: "Zaimportuj CSV z kolumną 'tweets'".into(),
            badge_label: style::status_badge_label(StatusTone::Idle).into(),
            badge_color: style::status_badge_color(StatusTone::Idle),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemView {
    pub text: String,
    pub annotated: bool,
}

/// One square toggle per category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileView {
    pub key: &'static str,
    pub name: &'static str,
    pub active: bool,
}

/// Single-choice panel for a category's follow-up question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FollowUpView {
    pub key: &'static str,
    pub title: &'static str,
    pub prompt: &'static str,
    pub options: &'static [&'static str],
    pub selected: Option<usize>,
}

/// Position and completion readout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressView {
    /// One-based position and total.
    pub position: Option<(usize, usize)>,
    pub done: usize,
    pub total: usize,
}

impl ProgressView {
    pub fn position_label(&self) -> String {
        match self.position {
            Some((current, total)) => format!("{current}/{total}"),
            None => "—/—".into(),
        }
    }

    pub fn progress_label(&self) -> String {
        if self.position.is_none() {
            return "Postęp: —".into();
        }
        format!("Postęp: {}/{}", self.done, self.total)
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.position, Some((current, _)) if current > 1)
    }
}

/// Modal dialogs raised by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    /// Informational message; dismissed with OK.
    Notice { title: String, message: String },
    /// Failure that aborted an action.
    Error { title: String, message: String },
    /// Reached the last item: ask whether to export now.
    ExportAtEnd { missing: usize },
}

impl Prompt {
    /// True when the default answer of an end-of-dataset prompt is "yes".
    pub fn defaults_to_export(&self) -> bool {
        matches!(self, Prompt::ExportAtEnd { missing: 0 })
    }
}
