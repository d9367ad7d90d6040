use super::*;
use eframe::egui::{Key, Modifiers};

#[derive(Clone, Copy, Debug, Default)]
pub(super) struct InputSnapshot {
    pub arrow_left: bool,
    pub arrow_right: bool,
    pub next_chord: bool,
    pub import: bool,
    pub export: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
}

impl InputSnapshot {
    pub(super) fn capture(ctx: &egui::Context) -> Self {
        ctx.input_mut(|i| Self {
            next_chord: i.consume_key(Modifiers::COMMAND, Key::Enter),
            import: i.consume_key(Modifiers::COMMAND, Key::I),
            export: i.consume_key(Modifiers::COMMAND, Key::E),
            zoom_in: i.consume_key(Modifiers::COMMAND, Key::Plus)
                || i.consume_key(Modifiers::COMMAND, Key::Equals),
            zoom_out: i.consume_key(Modifiers::COMMAND, Key::Minus),
            arrow_left: i.key_pressed(Key::ArrowLeft),
            arrow_right: i.key_pressed(Key::ArrowRight),
        })
    }
}

impl EguiApp {
    /// Keyboard shortcuts are ignored while a dialog is open.
    pub(super) fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.controller.ui.prompt.is_some() {
            return;
        }
        let input = InputSnapshot::capture(ctx);
        if input.import {
            self.controller.import_via_dialog();
            return;
        }
        if input.export {
            self.controller.export_via_dialog();
            return;
        }
        if input.zoom_in {
            self.controller.zoom_text(0.1);
        }
        if input.zoom_out {
            self.controller.zoom_text(-0.1);
        }
        if !self.controller.is_active() {
            return;
        }
        if input.arrow_right || input.next_chord {
            self.controller.next();
        } else if input.arrow_left {
            self.controller.back();
        }
    }
}
