//! Annotation core: label model, persistent store, session and navigation.

pub mod db;
pub mod export;
pub mod import;
pub mod labels;
pub mod navigation;
pub mod session;
pub mod timer;

pub use db::{AnnotationStore, Dataset, DatasetId, Item, ItemId, Progress, StoreError};
pub use export::{ExportError, ExportSummary};
pub use import::ImportError;
pub use labels::{CATEGORIES, Category, Choice, LabelFlags, required_follow_ups};
pub use navigation::{Advance, Annotator, AnnotatorError, AnnotatorState, ExportRequest};
pub use session::{ActiveSession, Session};
pub use timer::{Clock, DwellTimer, SystemClock};
