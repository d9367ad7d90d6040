//! Bridges the annotator to the egui renderer.
//!
//! The controller owns the [`Annotator`], turns its results into [`UiState`]
//! and raises dialogs. File pickers live here too so the renderer only
//! forwards clicks and key presses.

use std::path::Path;

use rfd::FileDialog;

use crate::annotations::labels::{CATEGORIES, FollowUpKind, OTHER_KEY};
use crate::annotations::{Advance, Annotator, AnnotatorError, Item};
use crate::egui_app::state::*;
use crate::egui_app::ui::style::{self, StatusTone};
use crate::settings::{SettingsStore, TomlSettings};

/// Maintains UI state and forwards user actions to the annotator.
pub struct EguiController<S: SettingsStore = TomlSettings> {
    pub ui: UiState,
    annotator: Annotator<S>,
}

impl<S: SettingsStore> EguiController<S> {
    pub fn new(annotator: Annotator<S>) -> Self {
        let mut controller = Self {
            ui: UiState::default(),
            annotator,
        };
        controller.refresh();
        controller
    }

    /// Reopen the dataset from the previous run, if any.
    pub fn resume_session(&mut self) {
        match self.annotator.resume() {
            Ok(Some(active)) => self.set_status(
                format!("Sesja #{} wznowiona", active.dataset_id),
                StatusTone::Info,
            ),
            Ok(None) => {}
            Err(err) => self.report(err, "Błąd sesji"),
        }
        self.refresh();
    }

    pub fn is_active(&self) -> bool {
        self.annotator.is_active()
    }

    /// Flip a category tile on the current item.
    pub fn toggle_tile(&mut self, key: &str) {
        if let Err(err) = self.annotator.toggle_label(key) {
            self.report(err, "Błąd zapisu");
        }
        self.refresh();
    }

    /// Record an answer in the follow-up panel owned by `key`.
    pub fn choose_follow_up(&mut self, key: &str, option: usize) {
        let result = if key == OTHER_KEY {
            self.annotator.choose_intent(option)
        } else {
            self.annotator.choose_detail(key, option)
        };
        if let Err(err) = result {
            self.report(err, "Błąd zapisu");
        }
        self.refresh();
    }

    /// Move forward, or ask about exporting on the last item.
    pub fn next(&mut self) {
        match self.annotator.advance() {
            Ok(Advance::Moved { .. }) => {}
            Ok(Advance::AtEnd(progress)) => {
                self.ui.prompt = Some(Prompt::ExportAtEnd {
                    missing: progress.missing(),
                });
            }
            Err(AnnotatorError::MissingFollowUp { category }) => {
                self.ui.prompt = Some(Prompt::Notice {
                    title: "Brak odpowiedzi".into(),
                    message: missing_follow_up_message(category),
                });
            }
            Err(err) => self.report(err, "Błąd nawigacji"),
        }
        self.refresh();
    }

    pub fn back(&mut self) {
        if let Err(err) = self.annotator.retreat() {
            self.report(err, "Błąd nawigacji");
        }
        self.refresh();
    }

    /// Pick a CSV file and import it.
    pub fn import_via_dialog(&mut self) {
        if self.annotator.is_active() {
            self.report(AnnotatorError::ImportBlocked, "Import zablokowany");
            return;
        }
        let Some(path) = FileDialog::new()
            .set_title("Wybierz plik CSV")
            .add_filter("CSV", &["csv"])
            .pick_file()
        else {
            return;
        };
        self.import_from(&path);
    }

    /// Import a CSV file from a known path.
    pub fn import_from(&mut self, path: &Path) {
        match self.annotator.import_csv(path) {
            Ok(summary) => self.set_status(
                format!(
                    "Sesja #{}: zaimportowano {} tweetów",
                    summary.dataset_id, summary.total
                ),
                StatusTone::Info,
            ),
            Err(AnnotatorError::ImportBlocked) => {
                self.report(AnnotatorError::ImportBlocked, "Import zablokowany")
            }
            Err(err) => self.report(err, "Błąd importu"),
        }
        self.refresh();
    }

    /// Ask for a destination and export the open dataset.
    ///
    /// Dismissing the picker resumes the session where it was.
    pub fn export_via_dialog(&mut self) {
        if !self.annotator.is_active() {
            self.ui.prompt = Some(Prompt::Notice {
                title: "Brak sesji".into(),
                message: "Najpierw zaimportuj plik CSV.".into(),
            });
            return;
        }
        let request = match self.annotator.begin_export() {
            Ok(request) => request,
            Err(err) => {
                self.report(err, "Błąd eksportu");
                self.refresh();
                return;
            }
        };
        let mut dialog = FileDialog::new()
            .set_title("Zapisz CSV z oznaczeniami")
            .add_filter("CSV", &["csv"])
            .set_file_name(&request.suggested_name);
        if let Some(dir) = request.start_dir.as_deref() {
            dialog = dialog.set_directory(dir);
        }
        match dialog.save_file() {
            Some(destination) => self.finish_export(&destination),
            None => {
                if let Err(err) = self.annotator.cancel_export() {
                    self.report(err, "Błąd eksportu");
                }
                self.refresh();
            }
        }
    }

    /// Export straight to `destination` without a picker.
    pub fn export_to(&mut self, destination: &Path) {
        match self.annotator.begin_export() {
            Ok(_) => self.finish_export(destination),
            Err(err) => {
                self.report(err, "Błąd eksportu");
                self.refresh();
            }
        }
    }

    fn finish_export(&mut self, destination: &Path) {
        match self.annotator.finish_export(destination) {
            Ok(summary) => {
                let name = file_name(&summary.path);
                self.ui.prompt = Some(Prompt::Notice {
                    title: "Eksport zakończony".into(),
                    message: format!("Zapisano plik:\n{name}"),
                });
                self.set_status(format!("Wyeksportowano {name}"), StatusTone::Idle);
            }
            Err(err) => self.report(err, "Błąd eksportu"),
        }
        self.refresh();
    }

    /// Close the end-of-dataset prompt; `export` opens the save dialog.
    pub fn resolve_end_prompt(&mut self, export: bool) {
        if matches!(self.ui.prompt, Some(Prompt::ExportAtEnd { .. })) {
            self.ui.prompt = None;
        }
        if export {
            self.export_via_dialog();
        }
    }

    pub fn dismiss_prompt(&mut self) {
        self.ui.prompt = None;
    }

    /// Scale the item text, clamped to a readable range.
    pub fn zoom_text(&mut self, delta: f32) {
        self.ui.text_zoom = (self.ui.text_zoom + delta).clamp(0.6, 3.0);
    }

    /// Flush dwell time before the window closes.
    pub fn shutdown(&mut self) {
        if let Err(err) = self.annotator.shutdown() {
            tracing::warn!("Failed to record dwell time on close: {err}");
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        self.ui.status.text = text.into();
        self.ui.status.badge_label = style::status_badge_label(tone).into();
        self.ui.status.badge_color = style::status_badge_color(tone);
    }

    /// Rebuild the render state from the store.
    pub fn refresh(&mut self) {
        let item = match self.annotator.current_item() {
            Ok(item) => item,
            Err(err) => {
                tracing::warn!("Failed to load current item: {err}");
                None
            }
        };
        self.ui.tiles = tile_views(item.as_ref());
        self.ui.follow_ups = item.as_ref().map(follow_up_views).unwrap_or_default();
        self.ui.item = item.map(|item| ItemView {
            text: item.text,
            annotated: item.annotated,
        });
        self.ui.progress = match (self.annotator.position(), self.annotator.progress()) {
            (Some((_, cursor, total)), Ok(Some(progress))) => ProgressView {
                position: Some((cursor + 1, total)),
                done: progress.done,
                total: progress.total,
            },
            (_, Err(err)) => {
                tracing::warn!("Failed to count progress: {err}");
                ProgressView::default()
            }
            _ => ProgressView::default(),
        };
    }

    fn report(&mut self, err: AnnotatorError, title: &str) {
        let message = user_message(&err);
        if err.is_user_correctable() {
            self.ui.prompt = Some(Prompt::Notice {
                title: title.to_string(),
                message,
            });
        } else {
            tracing::warn!("{title}: {err}");
            self.set_status(message.clone(), StatusTone::Error);
            self.ui.prompt = Some(Prompt::Error {
                title: title.to_string(),
                message,
            });
        }
    }
}

fn tile_views(item: Option<&Item>) -> Vec<TileView> {
    CATEGORIES
        .iter()
        .map(|category| TileView {
            key: category.key,
            name: category.name,
            active: item.is_some_and(|item| item.labels.get(category.key)),
        })
        .collect()
}

fn follow_up_views(item: &Item) -> Vec<FollowUpView> {
    crate::annotations::required_follow_ups(&item.labels)
        .into_iter()
        .filter_map(|category| {
            let question = category.question()?;
            let title = match category.follow_up {
                FollowUpKind::Intent => "INNE: intencja",
                _ => category.name,
            };
            Some(FollowUpView {
                key: category.key,
                title,
                prompt: question.prompt,
                options: question.options,
                selected: item.answer_for(category).index(),
            })
        })
        .collect()
}

fn missing_follow_up_message(category: &str) -> String {
    if category == "INNE" {
        "Zaznacz odpowiedź w pytaniu o główną intencję wypowiedzi (dla „INNE”).".into()
    } else {
        format!("Zaznacz odpowiedź w pytaniu doprecyzowującym dla kategorii „{category}”.")
    }
}

fn user_message(err: &AnnotatorError) -> String {
    match err {
        AnnotatorError::ImportBlocked => {
            "Aby zaimportować nowy plik, najpierw wyeksportuj bieżący CSV.".into()
        }
        AnnotatorError::NoSession => "Najpierw zaimportuj plik CSV.".into(),
        AnnotatorError::MissingFollowUp { category } => missing_follow_up_message(category),
        other => other.to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
