use super::style;
use super::*;
use crate::egui_app::state::Prompt;
use eframe::egui::{self, Align2, RichText};

enum PromptAction {
    Dismiss,
    Export,
    Stay,
}

impl EguiApp {
    pub(super) fn render_prompt(&mut self, ctx: &egui::Context) {
        let Some(prompt) = self.controller.ui.prompt.clone() else {
            return;
        };
        let palette = style::palette();
        let title = match &prompt {
            Prompt::Notice { title, .. } | Prompt::Error { title, .. } => title.clone(),
            Prompt::ExportAtEnd { missing: 0 } => "Zakończono anotacje".to_string(),
            Prompt::ExportAtEnd { .. } => "Nie wszystkie tweety oznaczone".to_string(),
        };
        let mut action = None;
        egui::Window::new(title)
            .anchor(Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .collapsible(false)
            .resizable(false)
            .auto_sized()
            .show(ctx, |ui| {
                ui.set_min_width(320.0);
                match &prompt {
                    Prompt::Notice { message, .. } => {
                        ui.label(RichText::new(message).color(palette.text));
                        ui.add_space(8.0);
                        if ui.button("OK").clicked() {
                            action = Some(PromptAction::Dismiss);
                        }
                    }
                    Prompt::Error { message, .. } => {
                        ui.label(RichText::new(message).color(palette.alert));
                        ui.add_space(8.0);
                        if ui.button("OK").clicked() {
                            action = Some(PromptAction::Dismiss);
                        }
                    }
                    Prompt::ExportAtEnd { missing } => {
                        let message = if *missing == 0 {
                            "Oznaczono wszystkie tweety.\nCzy chcesz wyeksportować do CSV teraz?"
                                .to_string()
                        } else {
                            format!(
                                "Pozostało {missing} nieoznaczonych tweetów.\nCzy mimo to chcesz wyeksportować?"
                            )
                        };
                        ui.label(RichText::new(message).color(palette.text));
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            let yes = ui.button("Tak");
                            let no = ui.button("Nie");
                            if ui.memory(|m| m.focused().is_none()) {
                                if prompt.defaults_to_export() {
                                    yes.request_focus();
                                } else {
                                    no.request_focus();
                                }
                            }
                            if yes.clicked() {
                                action = Some(PromptAction::Export);
                            } else if no.clicked() {
                                action = Some(PromptAction::Stay);
                            }
                        });
                    }
                }
            });
        if action.is_none() && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            action = Some(PromptAction::Stay);
        }
        match action {
            Some(PromptAction::Dismiss) => self.controller.dismiss_prompt(),
            Some(PromptAction::Export) => self.controller.resolve_end_prompt(true),
            Some(PromptAction::Stay) => {
                if matches!(prompt, Prompt::ExportAtEnd { .. }) {
                    self.controller.resolve_end_prompt(false);
                } else {
                    self.controller.dismiss_prompt();
                }
            }
            None => {}
        }
    }
}
