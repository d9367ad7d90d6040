//! Library exports for the annotation app and its tests.
/// Application directory resolution.
pub mod app_dirs;
/// Label model, store, session and navigation.
pub mod annotations;
/// egui presentation layer.
pub mod egui_app;
/// Tracing subscriber setup.
pub mod logging;
/// Persisted key-value settings.
pub mod settings;
