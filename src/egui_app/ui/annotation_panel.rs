use super::style;
use super::*;
use crate::egui_app::state::{FollowUpView, TileView};
use eframe::egui::{self, Frame, Margin, RichText, Ui};

const TEXT_SIZE: f32 = 18.0;
const TILE_SPACING: f32 = 8.0;
const MIN_TILE: f32 = 90.0;
const MAX_TILE: f32 = 160.0;

impl EguiApp {
    pub(super) fn render_annotation_panel(&mut self, ui: &mut Ui) {
        self.render_item_text(ui);
        ui.add_space(12.0);
        self.render_tiles(ui);
        ui.add_space(12.0);
        self.render_navigation(ui);
        ui.add_space(8.0);
        self.render_follow_ups(ui);
    }

    fn render_item_text(&mut self, ui: &mut Ui) {
        let palette = style::palette();
        let size = TEXT_SIZE * self.controller.ui.text_zoom;
        let (text, color) = match &self.controller.ui.item {
            Some(item) => (item.text.clone(), palette.text),
            None => (
                "Zaimportuj CSV z kolumną 'tweets'…".to_string(),
                palette.text_dim,
            ),
        };
        Frame::new()
            .fill(palette.canvas)
            .stroke(style::panel_stroke())
            .inner_margin(Margin::same(16))
            .show(ui, |ui| {
                ui.set_min_height(160.0);
                ui.set_width(ui.available_width());
                ui.vertical_centered(|ui| {
                    ui.add(egui::Label::new(RichText::new(text).size(size).color(color)).wrap());
                });
            });
    }

    fn render_tiles(&mut self, ui: &mut Ui) {
        let tiles = self.controller.ui.tiles.clone();
        if tiles.is_empty() {
            return;
        }
        let enabled = self.controller.ui.item.is_some();
        let side = tile_side(ui.available_width(), tiles.len());
        let mut toggled = None;
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = TILE_SPACING;
            for tile in &tiles {
                if render_tile(ui, tile, side, enabled) {
                    toggled = Some(tile.key);
                }
            }
        });
        if let Some(key) = toggled {
            self.controller.toggle_tile(key);
        }
    }

    fn render_navigation(&mut self, ui: &mut Ui) {
        let active = self.controller.ui.item.is_some();
        let can_go_back = self.controller.ui.progress.can_go_back();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(active && can_go_back, egui::Button::new("◀ Wstecz"))
                .clicked()
            {
                self.controller.back();
            }
            if ui
                .add_enabled(active, egui::Button::new("Dalej ▶"))
                .clicked()
            {
                self.controller.next();
            }
        });
    }

    fn render_follow_ups(&mut self, ui: &mut Ui) {
        let panels = self.controller.ui.follow_ups.clone();
        if panels.is_empty() {
            return;
        }
        let mut chosen = None;
        egui::ScrollArea::vertical()
            .id_salt("follow_ups_scroll")
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for panel in &panels {
                    if let Some(option) = render_follow_up(ui, panel) {
                        chosen = Some((panel.key, option));
                    }
                    ui.add_space(8.0);
                }
            });
        if let Some((key, option)) = chosen {
            self.controller.choose_follow_up(key, option);
        }
    }
}

/// Side of a square tile so that `count` tiles fill one row.
fn tile_side(available: f32, count: usize) -> f32 {
    let gaps = TILE_SPACING * count.saturating_sub(1) as f32;
    ((available - gaps) / count.max(1) as f32).clamp(MIN_TILE, MAX_TILE)
}

fn render_tile(ui: &mut Ui, tile: &TileView, side: f32, enabled: bool) -> bool {
    let palette = style::palette();
    let button = egui::Button::new(RichText::new(tile.name).strong().color(palette.text))
        .fill(style::tile_fill(tile.active))
        .selected(tile.active)
        .min_size(egui::vec2(side, side));
    ui.add_enabled(enabled, button).clicked()
}

fn render_follow_up(ui: &mut Ui, panel: &FollowUpView) -> Option<usize> {
    let palette = style::palette();
    let mut chosen = None;
    Frame::new()
        .fill(palette.raised)
        .stroke(style::divider_stroke())
        .inner_margin(Margin::same(10))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(panel.title).strong().color(palette.heading));
            ui.label(RichText::new(panel.prompt).color(palette.text));
            ui.add_space(4.0);
            for (index, option) in panel.options.iter().enumerate() {
                let selected = panel.selected == Some(index);
                if ui.radio(selected, *option).clicked() && !selected {
                    chosen = Some(index);
                }
            }
        });
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_share_the_row_within_bounds() {
        assert_eq!(tile_side(8.0 * 100.0 + 7.0 * TILE_SPACING, 8), 100.0);
        assert_eq!(tile_side(200.0, 8), MIN_TILE);
        assert_eq!(tile_side(5_000.0, 8), MAX_TILE);
    }
}
