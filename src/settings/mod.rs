//! Process-wide key-value settings that survive a restart.
//!
//! The core never reads settings ambiently: the session layer receives a
//! [`SettingsStore`] by injection. [`TomlSettings`] persists to
//! `settings.toml` under the app root, [`MemorySettings`] keeps everything in
//! process.
//!
//! Config keys (TOML): `active_dataset_id`, `last_export_dir`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::annotations::db::DatasetId;

mod errors;
mod io;

pub use errors::ConfigError;
pub use io::{load_settings_from, save_settings_to_path};

/// Persisted settings. Unknown keys are ignored and missing keys default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Dataset the annotator was working through, if any.
    #[serde(default)]
    pub active_dataset_id: Option<DatasetId>,
    /// Folder of the last successful export.
    #[serde(default)]
    pub last_export_dir: Option<PathBuf>,
}

/// Injected settings store consumed by the session layer.
pub trait SettingsStore {
    fn active_dataset(&self) -> Option<DatasetId>;
    fn set_active_dataset(&mut self, dataset: Option<DatasetId>) -> Result<(), ConfigError>;
    fn last_export_dir(&self) -> Option<PathBuf>;
    fn set_last_export_dir(&mut self, dir: &Path) -> Result<(), ConfigError>;
}

/// Settings backed by a TOML file; every change is written through.
#[derive(Debug, Clone)]
pub struct TomlSettings {
    path: PathBuf,
    settings: AppSettings,
}

impl TomlSettings {
    /// Load from the default `settings.toml` under the app root.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_or_default(crate::app_dirs::settings_path()?)
    }

    /// Load from `path`, starting from defaults when the file does not exist.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let settings = load_settings_from(&path)?;
        Ok(Self { path, settings })
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current in-memory snapshot.
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    fn update(&mut self, apply: impl FnOnce(&mut AppSettings)) -> Result<(), ConfigError> {
        let mut next = self.settings.clone();
        apply(&mut next);
        if next == self.settings {
            return Ok(());
        }
        save_settings_to_path(&next, &self.path)?;
        self.settings = next;
        Ok(())
    }
}

impl SettingsStore for TomlSettings {
    fn active_dataset(&self) -> Option<DatasetId> {
        self.settings.active_dataset_id
    }

    fn set_active_dataset(&mut self, dataset: Option<DatasetId>) -> Result<(), ConfigError> {
        self.update(|settings| settings.active_dataset_id = dataset)
    }

    fn last_export_dir(&self) -> Option<PathBuf> {
        self.settings.last_export_dir.clone()
    }

    fn set_last_export_dir(&mut self, dir: &Path) -> Result<(), ConfigError> {
        self.update(|settings| settings.last_export_dir = Some(dir.to_path_buf()))
    }
}

/// In-process settings for tests and headless use.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    settings: AppSettings,
}

impl MemorySettings {
    pub fn new(settings: AppSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }
}

impl SettingsStore for MemorySettings {
    fn active_dataset(&self) -> Option<DatasetId> {
        self.settings.active_dataset_id
    }

    fn set_active_dataset(&mut self, dataset: Option<DatasetId>) -> Result<(), ConfigError> {
        self.settings.active_dataset_id = dataset;
        Ok(())
    }

    fn last_export_dir(&self) -> Option<PathBuf> {
        self.settings.last_export_dir.clone()
    }

    fn set_last_export_dir(&mut self, dir: &Path) -> Result<(), ConfigError> {
        self.settings.last_export_dir = Some(dir.to_path_buf());
        Ok(())
    }
}
