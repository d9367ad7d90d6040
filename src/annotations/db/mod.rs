use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::labels::{CATEGORIES, CATEGORY_COUNT, Category, Choice, FollowUpKind, LabelFlags};

/// Read-only queries over datasets and items.
pub mod read;
/// Versioned, additive schema migrations.
pub mod schema;
/// Write helpers and the transactional write batch.
pub mod write;

mod util;

#[cfg(test)]
mod tests;

pub use write::LabelChange;

/// Identity of an imported dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(i64);

impl DatasetId {
    /// Wrap a raw row id.
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw row id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a single item row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    /// Wrap a raw row id.
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw row id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One imported batch of items plus its progress metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    /// Row id of the dataset.
    pub id: DatasetId,
    /// Display name, usually the imported file name.
    pub name: String,
    /// Absolute path of the imported file.
    pub source_path: PathBuf,
    /// Local time of import, `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
    /// Index of the item currently presented.
    pub cursor: usize,
    /// Number of items imported into the dataset.
    pub total: usize,
    /// Set once the dataset has been written to CSV.
    pub exported: bool,
}

/// A single annotated text unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Row id of the item.
    pub id: ItemId,
    /// Dataset the item belongs to.
    pub dataset_id: DatasetId,
    /// Zero-based position inside the dataset, fixed at import.
    pub index: usize,
    /// Trimmed text as imported.
    pub text: String,
    /// Set by the first label edit or follow-up answer.
    pub annotated: bool,
    /// Category flags in declaration order.
    pub labels: LabelFlags,
    /// Detail answers in category order; unanswered for categories without one.
    pub details: [Choice; CATEGORY_COUNT],
    /// Answer to the shared intent question, used while `inne` is active.
    pub intent: Choice,
    /// Accumulated on-screen time.
    pub dwell_ms: u64,
}

impl Item {
    /// Stored detail answer for the category with `key`.
    pub fn detail(&self, key: &str) -> Choice {
        super::labels::category_index(key)
            .map(|idx| self.details[idx])
            .unwrap_or_default()
    }

    /// Stored answer to whichever follow-up `category` owns.
    pub fn answer_for(&self, category: &Category) -> Choice {
        match category.follow_up {
            FollowUpKind::Detail(_) => self.detail(category.key),
            FollowUpKind::Intent => self.intent,
            FollowUpKind::None => Choice::UNANSWERED,
        }
    }
}

/// Annotated vs total item counts for a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    /// Items not yet marked annotated.
    pub fn missing(&self) -> usize {
        self.total.saturating_sub(self.done)
    }

    /// True when every item is annotated.
    pub fn is_complete(&self) -> bool {
        self.done >= self.total
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub dataset_id: DatasetId,
    pub total: usize,
}

/// Errors returned by the annotation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened, created or migrated.
    #[error("Failed to initialize annotation store at {path}: {source}")]
    Init {
        path: PathBuf,
        source: Box<StoreError>,
    },
    /// Failed to create the directory holding the database file.
    #[error("Could not create storage directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// SQLite query failed.
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    /// Database is locked or busy.
    #[error("Database is busy, please retry")]
    Busy,
    #[error("Dataset {0} does not exist")]
    UnknownDataset(DatasetId),
    #[error("Item {0} does not exist")]
    UnknownItem(ItemId),
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    /// The category exists but owns no detail question.
    #[error("Category {0} has no follow-up question")]
    NoFollowUp(&'static str),
    #[error("Option {option} is out of range for {question}")]
    InvalidChoice {
        question: &'static str,
        option: usize,
    },
    /// Nothing left to import after dropping blank rows.
    #[error("Nothing to import: every row is blank")]
    EmptyImport,
}

/// SQLite-backed store for datasets and their items.
pub struct AnnotationStore {
    connection: Connection,
    path: PathBuf,
}

/// Groups related item writes into one transaction.
pub struct ItemWriteBatch<'conn> {
    tx: Transaction<'conn>,
}

impl AnnotationStore {
    /// Open (or create) the store at `path`, applying pending migrations.
    ///
    /// Any failure, including an unwritable location or a corrupt file, is
    /// reported as [`StoreError::Init`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        Self::initialize(path).map_err(|source| StoreError::Init {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Open the store at the default location under the app root.
    pub fn open_default() -> Result<Self, StoreError> {
        let path = crate::app_dirs::database_path().map_err(|err| match err {
            crate::app_dirs::AppDirError::CreateDir { path, source } => {
                StoreError::CreateDir { path, source }
            }
            crate::app_dirs::AppDirError::NoBaseDir => StoreError::CreateDir {
                path: PathBuf::from(crate::app_dirs::APP_DIR_NAME),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no config directory available",
                ),
            },
        })?;
        Self::open(path)
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initialize(path: &Path) -> Result<Self, StoreError> {
        util::create_parent_if_needed(path)?;
        let connection = Connection::open(path).map_err(util::map_sql_error)?;
        let mut store = Self {
            connection,
            path: path.to_path_buf(),
        };
        store.apply_pragmas()?;
        schema::apply_migrations(&mut store.connection)?;
        Ok(store)
    }

    fn apply_pragmas(&self) -> Result<(), StoreError> {
        self.connection
            .execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA foreign_keys=ON;
                 PRAGMA busy_timeout=5000;",
            )
            .map_err(util::map_sql_error)
    }
}

/// Column name of the detail answer for `category`.
pub(crate) fn detail_column(category: &Category) -> String {
    format!("{}_detail", category.key)
}

/// Categories in storage order, for building column lists.
pub(crate) fn flag_columns() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().map(|category| category.key)
}
