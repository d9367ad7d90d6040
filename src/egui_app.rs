//! egui presentation layer: controller, render state and renderer.

/// Bridges annotator actions to UI state.
pub mod controller;
/// Render-ready state shared by controller and renderer.
pub mod state;
/// egui renderer and styling.
pub mod ui;
