use super::style;
use super::*;
use eframe::egui::{self, Frame, Margin, RichText, StrokeKind};

impl EguiApp {
    pub(super) fn render_top_bar(&mut self, ctx: &egui::Context) {
        let palette = style::palette();
        egui::TopBottomPanel::top("top_bar")
            .frame(
                Frame::new()
                    .fill(palette.canvas)
                    .stroke(style::panel_stroke())
                    .inner_margin(Margin::symmetric(8, 6)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Tagowanie Tweetów")
                            .strong()
                            .color(palette.text),
                    );
                    ui.separator();
                    let active = self.controller.is_active();
                    if ui
                        .add_enabled(!active, egui::Button::new("Importuj CSV"))
                        .on_hover_text("Ctrl+I")
                        .clicked()
                    {
                        self.controller.import_via_dialog();
                    }
                    if ui
                        .add_enabled(active, egui::Button::new("Eksportuj"))
                        .on_hover_text("Ctrl+E")
                        .clicked()
                    {
                        self.controller.export_via_dialog();
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Zakończ").clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
            });
    }

    pub(super) fn render_status(&mut self, ctx: &egui::Context) {
        let palette = style::palette();
        egui::TopBottomPanel::bottom("status_bar")
            .frame(
                Frame::new()
                    .fill(palette.canvas)
                    .stroke(style::panel_stroke())
                    .inner_margin(Margin::symmetric(8, 4)),
            )
            .show(ctx, |ui| {
                let status = self.controller.ui.status.clone();
                let progress = self.controller.ui.progress.clone();
                ui.horizontal(|ui| {
                    let (badge_rect, _) =
                        ui.allocate_exact_size(egui::vec2(16.0, 16.0), egui::Sense::hover());
                    ui.painter().rect_filled(badge_rect, 0.0, status.badge_color);
                    ui.painter().rect_stroke(
                        badge_rect,
                        0.0,
                        style::divider_stroke(),
                        StrokeKind::Inside,
                    );
                    ui.add_space(8.0);
                    ui.label(RichText::new(&status.badge_label).color(palette.text));
                    ui.separator();
                    ui.label(RichText::new(&status.text).color(palette.text_dim));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            RichText::new(progress.progress_label()).color(palette.text),
                        );
                        ui.separator();
                        ui.label(
                            RichText::new(progress.position_label()).color(palette.text),
                        );
                    });
                });
            });
    }
}
