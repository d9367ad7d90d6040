//! Moving through a dataset one item at a time.
//!
//! [`Annotator`] owns the store, the injected settings and the dwell timer.
//! It is the only writer during a session: every user action goes through one
//! of its methods, which validates against the label model, updates the store
//! and keeps the timer pointed at whatever item is on screen.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::db::{
    AnnotationStore, DatasetId, ImportSummary, Item, ItemId, LabelChange, Progress, StoreError,
};
use super::export::{ExportError, ExportSummary};
use super::import::{ImportError, ImportSource, read_tweets};
use super::labels::{self, Category, LabelFlags};
use super::session::{ActiveSession, Session, SessionError};
use super::timer::{Clock, DwellTimer, SystemClock};
use crate::settings::{ConfigError, SettingsStore};

/// Where the annotator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotatorState {
    /// No active dataset.
    Idle,
    /// An item is on screen and its dwell timer is running.
    Viewing {
        dataset: DatasetId,
        cursor: usize,
        total: usize,
    },
    /// Waiting for an export destination; the timer is stopped.
    Exporting {
        dataset: DatasetId,
        cursor: usize,
        total: usize,
    },
}

/// Outcome of [`Annotator::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next item.
    Moved { cursor: usize },
    /// Already on the last item; the cursor did not move.
    AtEnd(Progress),
}

/// Suggested destination for an export file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub dataset: DatasetId,
    pub suggested_name: String,
    pub start_dir: Option<PathBuf>,
}

impl ExportRequest {
    /// Full suggested path, when a start directory is known.
    pub fn suggested_path(&self) -> Option<PathBuf> {
        self.start_dir
            .as_ref()
            .map(|dir| dir.join(&self.suggested_name))
    }
}

/// Errors surfaced by [`Annotator`] operations.
#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error("No dataset is open; import a CSV file first")]
    NoSession,
    #[error("Export the current dataset before importing a new file")]
    ImportBlocked,
    /// A required follow-up question is unanswered.
    #[error("Answer the follow-up question for {category} before moving on")]
    MissingFollowUp { category: &'static str },
    #[error("An export is in progress")]
    ExportInProgress,
    #[error("No export has been started")]
    NotExporting,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<SessionError> for AnnotatorError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Store(err) => Self::Store(err),
            SessionError::Config(err) => Self::Config(err),
        }
    }
}

impl AnnotatorError {
    /// True for problems the annotator fixes without retrying storage.
    pub fn is_user_correctable(&self) -> bool {
        match self {
            Self::NoSession | Self::ImportBlocked | Self::MissingFollowUp { .. } => true,
            Self::Import(err) => err.is_content_error(),
            Self::Store(StoreError::EmptyImport) => true,
            _ => false,
        }
    }
}

/// Drives a single annotation session against the store.
pub struct Annotator<S, C = SystemClock> {
    store: AnnotationStore,
    session: Session<S>,
    clock: C,
    timer: DwellTimer,
    state: AnnotatorState,
}

impl<S: SettingsStore> Annotator<S, SystemClock> {
    /// Annotator using the wall clock.
    pub fn new(store: AnnotationStore, settings: S) -> Self {
        Self::with_clock(store, settings, SystemClock)
    }
}

impl<S: SettingsStore, C: Clock> Annotator<S, C> {
    /// Annotator using a custom clock. Starts [`AnnotatorState::Idle`].
    pub fn with_clock(store: AnnotationStore, settings: S, clock: C) -> Self {
        Self {
            store,
            session: Session::new(settings),
            clock,
            timer: DwellTimer::new(),
            state: AnnotatorState::Idle,
        }
    }

    pub fn state(&self) -> AnnotatorState {
        self.state
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn settings(&self) -> &S {
        self.session.settings()
    }

    /// True while a dataset is open, including during an export.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, AnnotatorState::Idle)
    }

    /// Reopen the dataset from the last run, if it is still resumable.
    ///
    /// The stored cursor is clamped into range. A pointer that no longer
    /// resolves is cleared and the annotator stays idle.
    pub fn resume(&mut self) -> Result<Option<ActiveSession>, AnnotatorError> {
        if self.is_active() {
            return Ok(None);
        }
        let Some(mut active) = self.session.resume(&self.store)? else {
            return Ok(None);
        };
        if active.total == 0 {
            tracing::warn!("Active dataset {} is empty; ignoring", active.dataset_id);
            self.session.clear_stale()?;
            return Ok(None);
        }
        let clamped = active.cursor.min(active.total - 1);
        if clamped != active.cursor {
            tracing::warn!(
                "Cursor {} out of range for dataset {}; clamping to {clamped}",
                active.cursor,
                active.dataset_id
            );
            self.store.set_cursor(active.dataset_id, clamped)?;
            active.cursor = clamped;
        }
        self.enter_viewing(active.dataset_id, active.cursor, active.total);
        tracing::info!(
            "Resumed dataset {} at item {}/{}",
            active.dataset_id,
            active.cursor + 1,
            active.total
        );
        Ok(Some(active))
    }

    /// Import the `tweets` column of a CSV file and open it.
    pub fn import_csv(&mut self, path: &Path) -> Result<ImportSummary, AnnotatorError> {
        self.ensure_idle()?;
        let tweets = read_tweets(path)?;
        let source = ImportSource::from_path(path);
        self.import_texts(&source.name, &source.path, tweets.as_slice())
    }

    /// Import already-read texts as a new dataset and open it.
    pub fn import_texts<T: AsRef<str>>(
        &mut self,
        name: &str,
        source_path: &Path,
        rows: &[T],
    ) -> Result<ImportSummary, AnnotatorError> {
        self.ensure_idle()?;
        let summary = self.store.import_items(name, source_path, rows)?;
        self.session.set_active_session(Some(summary.dataset_id))?;
        self.enter_viewing(summary.dataset_id, 0, summary.total);
        Ok(summary)
    }

    /// Item under the cursor, if a dataset is open.
    pub fn current_item(&self) -> Result<Option<Item>, AnnotatorError> {
        match self.position() {
            Some((dataset, cursor, _)) => Ok(self.store.fetch_item(dataset, cursor)?),
            None => Ok(None),
        }
    }

    /// Follow-ups the current item needs answered, in declaration order.
    pub fn required_follow_ups(&self) -> Result<Vec<&'static Category>, AnnotatorError> {
        Ok(self
            .current_item()?
            .map(|item| labels::required_follow_ups(&item.labels))
            .unwrap_or_default())
    }

    /// Flip one category on the current item.
    ///
    /// Turning a category off wipes its stored follow-up answer in the same
    /// transaction as the flag change.
    pub fn toggle_label(&mut self, key: &str) -> Result<LabelChange, AnnotatorError> {
        let item = self.viewing_item()?;
        let mut flags = item.labels;
        if flags.toggle(key).is_none() {
            return Err(StoreError::UnknownCategory(key.to_string()).into());
        }
        Ok(self.store.apply_labels(item.id, &flags)?)
    }

    /// Replace every flag on the current item.
    pub fn set_labels(&mut self, flags: &LabelFlags) -> Result<LabelChange, AnnotatorError> {
        let item = self.viewing_item()?;
        Ok(self.store.apply_labels(item.id, flags)?)
    }

    /// Answer a category's detail question on the current item.
    pub fn choose_detail(&mut self, key: &str, option: usize) -> Result<(), AnnotatorError> {
        let item = self.viewing_item()?;
        Ok(self.store.update_detail(item.id, key, option)?)
    }

    /// Answer the intent question on the current item.
    pub fn choose_intent(&mut self, option: usize) -> Result<(), AnnotatorError> {
        let item = self.viewing_item()?;
        Ok(self.store.update_intent(item.id, option)?)
    }

    /// Move to the next item once every required follow-up is answered.
    ///
    /// On the last item the cursor stays put and the completion count is
    /// returned; the timer keeps running.
    pub fn advance(&mut self) -> Result<Advance, AnnotatorError> {
        let (dataset, cursor, total) = self.viewing()?;
        let item = self.item_at(dataset, cursor)?;
        if let Some(category) = first_missing_follow_up(&item) {
            return Err(AnnotatorError::MissingFollowUp {
                category: category.name,
            });
        }
        if cursor + 1 >= total {
            return Ok(Advance::AtEnd(self.store.count_progress(dataset)?));
        }
        let next = cursor + 1;
        self.move_to(dataset, next)?;
        Ok(Advance::Moved { cursor: next })
    }

    /// Step back one item. A no-op on the first item.
    pub fn retreat(&mut self) -> Result<usize, AnnotatorError> {
        let (dataset, cursor, _) = self.viewing()?;
        if cursor == 0 {
            return Ok(0);
        }
        self.move_to(dataset, cursor - 1)?;
        Ok(cursor - 1)
    }

    /// Stop the timer and suggest where to write the export.
    pub fn begin_export(&mut self) -> Result<ExportRequest, AnnotatorError> {
        let (dataset, cursor, total) = self.viewing()?;
        let record = self
            .store
            .dataset(dataset)?
            .ok_or(StoreError::UnknownDataset(dataset))?;
        self.flush_dwell_or_restart(dataset, cursor)?;
        self.state = AnnotatorState::Exporting {
            dataset,
            cursor,
            total,
        };
        let stem = Path::new(&record.name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| format!("dataset_{dataset}"));
        let start_dir = self
            .session
            .settings()
            .last_export_dir()
            .or_else(crate::app_dirs::default_export_dir);
        Ok(ExportRequest {
            dataset,
            suggested_name: format!("{stem}_annotated.csv"),
            start_dir,
        })
    }

    /// Abandon a pending export and resume timing the current item.
    pub fn cancel_export(&mut self) -> Result<(), AnnotatorError> {
        let AnnotatorState::Exporting {
            dataset,
            cursor,
            total,
        } = self.state
        else {
            return Err(AnnotatorError::NotExporting);
        };
        self.enter_viewing(dataset, cursor, total);
        Ok(())
    }

    /// Write the pending export to `destination` and close the dataset.
    ///
    /// On failure the annotator returns to the same item with the timer running.
    pub fn finish_export(&mut self, destination: &Path) -> Result<ExportSummary, AnnotatorError> {
        let AnnotatorState::Exporting {
            dataset,
            cursor,
            total,
        } = self.state
        else {
            return Err(AnnotatorError::NotExporting);
        };
        let summary = match self.store.export_to_flat_file(dataset, destination) {
            Ok(summary) => summary,
            Err(err) => {
                tracing::warn!("Export of dataset {dataset} failed: {err}");
                self.enter_viewing(dataset, cursor, total);
                return Err(err.into());
            }
        };
        if let Err(err) = self.session.set_active_session(None) {
            tracing::warn!("Failed to clear active dataset after export: {err}");
        }
        if let Some(dir) = summary.path.parent()
            && let Err(err) = self.session.settings_mut().set_last_export_dir(dir)
        {
            tracing::warn!("Failed to remember export folder: {err}");
        }
        self.state = AnnotatorState::Idle;
        Ok(summary)
    }

    /// Begin and finish an export in one step.
    pub fn export(&mut self, destination: &Path) -> Result<ExportSummary, AnnotatorError> {
        self.begin_export()?;
        self.finish_export(destination)
    }

    /// Annotated vs total counts for the open dataset.
    pub fn progress(&self) -> Result<Option<Progress>, AnnotatorError> {
        match self.position() {
            Some((dataset, _, _)) => Ok(Some(self.store.count_progress(dataset)?)),
            None => Ok(None),
        }
    }

    /// Open dataset, zero-based cursor and total.
    pub fn position(&self) -> Option<(DatasetId, usize, usize)> {
        match self.state {
            AnnotatorState::Idle => None,
            AnnotatorState::Viewing {
                dataset,
                cursor,
                total,
            }
            | AnnotatorState::Exporting {
                dataset,
                cursor,
                total,
            } => Some((dataset, cursor, total)),
        }
    }

    /// Flush the running dwell interval before the application closes.
    pub fn shutdown(&mut self) -> Result<(), AnnotatorError> {
        self.flush_dwell()?;
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), AnnotatorError> {
        if self.is_active() {
            return Err(AnnotatorError::ImportBlocked);
        }
        Ok(())
    }

    fn viewing(&self) -> Result<(DatasetId, usize, usize), AnnotatorError> {
        match self.state {
            AnnotatorState::Idle => Err(AnnotatorError::NoSession),
            AnnotatorState::Exporting { .. } => Err(AnnotatorError::ExportInProgress),
            AnnotatorState::Viewing {
                dataset,
                cursor,
                total,
            } => Ok((dataset, cursor, total)),
        }
    }

    fn viewing_item(&self) -> Result<Item, AnnotatorError> {
        let (dataset, cursor, _) = self.viewing()?;
        self.item_at(dataset, cursor)
    }

    fn item_at(&self, dataset: DatasetId, cursor: usize) -> Result<Item, AnnotatorError> {
        Ok(self
            .store
            .fetch_item(dataset, cursor)?
            .ok_or(StoreError::UnknownDataset(dataset))?)
    }

    fn move_to(&mut self, dataset: DatasetId, next: usize) -> Result<(), AnnotatorError> {
        let (_, cursor, total) = self.viewing()?;
        self.flush_dwell_or_restart(dataset, cursor)?;
        if let Err(err) = self.store.set_cursor(dataset, next) {
            self.start_timer(dataset, cursor);
            return Err(err.into());
        }
        tracing::debug!("Dataset {dataset}: cursor {cursor} -> {next}");
        self.enter_viewing(dataset, next, total);
        Ok(())
    }

    fn enter_viewing(&mut self, dataset: DatasetId, cursor: usize, total: usize) {
        self.state = AnnotatorState::Viewing {
            dataset,
            cursor,
            total,
        };
        self.start_timer(dataset, cursor);
    }

    fn start_timer(&mut self, dataset: DatasetId, cursor: usize) {
        match self.store.fetch_item(dataset, cursor) {
            Ok(Some(item)) => self.timer.start(item.id, self.clock.now()),
            Ok(None) => tracing::warn!("No item {cursor} in dataset {dataset} to time"),
            Err(err) => tracing::warn!("Failed to start dwell timer: {err}"),
        }
    }

    fn flush_dwell(&mut self) -> Result<Option<(ItemId, u64)>, StoreError> {
        let Some((item, elapsed_ms)) = self.timer.stop(self.clock.now()) else {
            return Ok(None);
        };
        self.store.add_dwell_time(item, elapsed_ms)?;
        tracing::debug!("Item {item}: +{elapsed_ms} ms dwell time");
        Ok(Some((item, elapsed_ms)))
    }

    fn flush_dwell_or_restart(
        &mut self,
        dataset: DatasetId,
        cursor: usize,
    ) -> Result<(), AnnotatorError> {
        if let Err(err) = self.flush_dwell() {
            self.start_timer(dataset, cursor);
            return Err(err.into());
        }
        Ok(())
    }
}

/// First active category, in declaration order, whose follow-up is unanswered.
fn first_missing_follow_up(item: &Item) -> Option<&'static Category> {
    labels::required_follow_ups(&item.labels)
        .into_iter()
        .find(|category| !item.answer_for(category).is_answered())
}
