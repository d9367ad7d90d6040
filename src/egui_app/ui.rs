//! egui renderer for the annotation window.

mod annotation_panel;
mod chrome;
mod input;
mod prompts;
pub mod style;

use crate::annotations::{AnnotationStore, Annotator};
use crate::egui_app::controller::EguiController;
use crate::settings::TomlSettings;
use eframe::egui;

/// Smallest window that still fits a row of tiles and the follow-up panels.
pub const MIN_VIEWPORT_SIZE: egui::Vec2 = egui::vec2(1040.0, 720.0);

/// Renders the egui UI using the shared controller state.
pub struct EguiApp {
    controller: EguiController,
    visuals_set: bool,
    closed: bool,
}

impl EguiApp {
    /// Open the store and settings from the app root and resume the last session.
    pub fn new() -> Result<Self, String> {
        let store = AnnotationStore::open_default()
            .map_err(|err| format!("Failed to open annotation store: {err}"))?;
        let settings = TomlSettings::load_default()
            .map_err(|err| format!("Failed to load settings: {err}"))?;
        let mut controller = EguiController::new(Annotator::new(store, settings));
        controller.resume_session();
        Ok(Self {
            controller,
            visuals_set: false,
            closed: false,
        })
    }

    fn apply_visuals(&mut self, ctx: &egui::Context) {
        if self.visuals_set {
            return;
        }
        let mut visuals = egui::Visuals::dark();
        style::apply_visuals(&mut visuals);
        ctx.set_visuals(visuals);
        self.visuals_set = true;
    }

    fn handle_close(&mut self, ctx: &egui::Context) {
        if self.closed {
            return;
        }
        if ctx.input(|i| i.viewport().close_requested()) {
            self.controller.shutdown();
            self.closed = true;
        }
    }
}

impl eframe::App for EguiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_visuals(ctx);
        self.handle_close(ctx);
        self.handle_shortcuts(ctx);
        self.render_top_bar(ctx);
        self.render_status(ctx);
        egui::CentralPanel::default().show(ctx, |ui| self.render_annotation_panel(ui));
        self.render_prompt(ctx);
    }
}
