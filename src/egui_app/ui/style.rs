use eframe::egui::{
    Color32, Stroke, Visuals,
    epaint::{CornerRadius, Shadow},
    style::WidgetVisuals,
};

/// Colours used across the annotation window.
#[derive(Clone, Copy)]
pub struct Palette {
    /// Behind the item text and the bars.
    pub canvas: Color32,
    /// Behind the central panel.
    pub surface: Color32,
    /// Follow-up panels and idle tiles.
    pub raised: Color32,
    pub outline: Color32,
    pub divider: Color32,
    pub text: Color32,
    pub text_dim: Color32,
    /// Follow-up panel titles.
    pub heading: Color32,
    pub tile_on: Color32,
    pub alert: Color32,
}

pub fn palette() -> Palette {
    Palette {
        canvas: Color32::from_rgb(16, 18, 22),
        surface: Color32::from_rgb(28, 31, 36),
        raised: Color32::from_rgb(44, 48, 55),
        outline: Color32::from_rgb(58, 63, 72),
        divider: Color32::from_rgb(36, 39, 45),
        text: Color32::from_rgb(214, 218, 224),
        text_dim: Color32::from_rgb(146, 152, 162),
        heading: Color32::from_rgb(150, 200, 245),
        tile_on: Color32::from_rgb(42, 104, 170),
        alert: Color32::from_rgb(222, 120, 92),
    }
}

pub fn apply_visuals(visuals: &mut Visuals) {
    let palette = palette();
    visuals.window_fill = palette.canvas;
    visuals.panel_fill = palette.surface;
    visuals.extreme_bg_color = palette.canvas;
    visuals.faint_bg_color = palette.surface;
    visuals.override_text_color = Some(palette.text);
    visuals.error_fg_color = palette.alert;
    visuals.warn_fg_color = palette.alert;
    visuals.selection.bg_fill = palette.tile_on;
    visuals.selection.stroke = Stroke::new(1.0, palette.heading);
    visuals.widgets.noninteractive.bg_fill = palette.surface;
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, palette.text);
    let widgets = &mut visuals.widgets;
    for (state, outline) in [
        (&mut widgets.inactive, palette.outline),
        (&mut widgets.hovered, palette.heading),
        (&mut widgets.active, palette.heading),
        (&mut widgets.open, palette.outline),
    ] {
        square_widget(state, palette, outline);
    }
    visuals.window_corner_radius = CornerRadius::ZERO;
    visuals.menu_corner_radius = CornerRadius::ZERO;
    visuals.window_shadow = Shadow::NONE;
    visuals.popup_shadow = Shadow::NONE;
}

fn square_widget(vis: &mut WidgetVisuals, palette: Palette, outline: Color32) {
    vis.corner_radius = CornerRadius::ZERO;
    vis.bg_fill = palette.raised;
    vis.weak_bg_fill = palette.raised;
    vis.bg_stroke = Stroke::new(1.0, outline);
    vis.fg_stroke = Stroke::new(1.0, palette.text);
}

/// Border around the bars and the item text.
pub fn panel_stroke() -> Stroke {
    Stroke::new(1.0, palette().outline)
}

/// Border inside panels: follow-up frames and the status badge.
pub fn divider_stroke() -> Stroke {
    Stroke::new(1.0, palette().divider)
}

pub fn tile_fill(active: bool) -> Color32 {
    let palette = palette();
    if active { palette.tile_on } else { palette.raised }
}

/// Severity of the message shown in the status bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTone {
    Idle,
    Info,
    Warning,
    Error,
}

pub fn status_badge_label(tone: StatusTone) -> &'static str {
    match tone {
        StatusTone::Idle => "Brak sesji",
        StatusTone::Info => "Sesja",
        StatusTone::Warning => "Uwaga",
        StatusTone::Error => "Błąd",
    }
}

pub fn status_badge_color(tone: StatusTone) -> Color32 {
    match tone {
        StatusTone::Idle => Color32::from_rgb(60, 62, 66),
        StatusTone::Info => Color32::from_rgb(58, 150, 110),
        StatusTone::Warning => Color32::from_rgb(205, 150, 50),
        StatusTone::Error => Color32::from_rgb(200, 64, 52),
    }
}
