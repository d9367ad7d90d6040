//! Which dataset, if any, survives an application restart.

use super::db::{AnnotationStore, DatasetId, StoreError};
use crate::settings::{ConfigError, SettingsStore};

/// A resumable dataset and where the annotator left off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    pub dataset_id: DatasetId,
    pub cursor: usize,
    pub total: usize,
}

/// Errors returned by session lookups.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Wraps the injected settings store with the active-dataset rules.
#[derive(Debug)]
pub struct Session<S> {
    settings: S,
}

impl<S: SettingsStore> Session<S> {
    pub fn new(settings: S) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut S {
        &mut self.settings
    }

    /// Resolve the persisted pointer against the store.
    ///
    /// A pointer to a missing or exported dataset yields `None`; the stale
    /// pointer is left in place for [`Session::clear_stale`].
    pub fn load_active_session(
        &self,
        store: &AnnotationStore,
    ) -> Result<Option<ActiveSession>, StoreError> {
        let Some(dataset_id) = self.settings.active_dataset() else {
            return Ok(None);
        };
        match store.dataset(dataset_id)? {
            Some(dataset) if !dataset.exported => Ok(Some(ActiveSession {
                dataset_id,
                cursor: dataset.cursor,
                total: dataset.total,
            })),
            Some(_) => {
                tracing::warn!("Active dataset {dataset_id} was already exported; ignoring");
                Ok(None)
            }
            None => {
                tracing::warn!("Active dataset {dataset_id} no longer exists; ignoring");
                Ok(None)
            }
        }
    }

    /// Persist or clear the active dataset pointer.
    pub fn set_active_session(&mut self, dataset: Option<DatasetId>) -> Result<(), ConfigError> {
        self.settings.set_active_dataset(dataset)
    }

    /// Load the active session, clearing the pointer when it no longer resolves.
    pub fn resume(
        &mut self,
        store: &AnnotationStore,
    ) -> Result<Option<ActiveSession>, SessionError> {
        let session = self.load_active_session(store)?;
        if session.is_none() {
            self.clear_stale()?;
        }
        Ok(session)
    }

    /// Drop a pointer that is set but did not resolve.
    pub fn clear_stale(&mut self) -> Result<(), ConfigError> {
        if self.settings.active_dataset().is_some() {
            self.settings.set_active_dataset(None)?;
        }
        Ok(())
    }
}
