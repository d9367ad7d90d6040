//! Flat CSV export of an annotated dataset.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::db::{AnnotationStore, DatasetId, Item, StoreError};
use super::import::TWEETS_COLUMN;
use super::labels::{CATEGORIES, detail_categories};

/// Header of the intent answer column.
pub const INTENT_COLUMN: &str = "Intencja";
/// Header of the dwell time column, in seconds.
pub const SECONDS_COLUMN: &str = "Czas_s";

/// Errors returned while writing an export file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not create export directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Export directory {0} is read-only")]
    NotWritable(PathBuf),
    #[error("Failed to write export {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode export {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where an export landed and how many rows it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
}

/// Column headers in export order.
pub fn export_header() -> Vec<String> {
    let mut header = Vec::with_capacity(3 + CATEGORIES.len() * 2);
    header.push(TWEETS_COLUMN.to_string());
    header.extend(CATEGORIES.iter().map(|category| category.name.to_string()));
    header.extend(detail_categories().map(|category| format!("{}_detail", category.name)));
    header.push(INTENT_COLUMN.to_string());
    header.push(SECONDS_COLUMN.to_string());
    header
}

/// Render milliseconds as seconds with exactly three decimals.
pub fn format_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

fn export_row(item: &Item) -> Vec<String> {
    let mut row = Vec::with_capacity(3 + CATEGORIES.len() * 2);
    row.push(item.text.clone());
    row.extend(
        item.labels
            .values()
            .iter()
            .map(|&flag| if flag { "1" } else { "0" }.to_string()),
    );
    row.extend(
        detail_categories().map(|category| item.detail(category.key).as_i64().to_string()),
    );
    row.push(item.intent.as_i64().to_string());
    row.push(format_seconds(item.dwell_ms));
    row
}

impl AnnotationStore {
    /// Write every item of `dataset` to `destination` and mark the dataset exported.
    ///
    /// The file is written next to its destination and renamed into place
    /// while the exported flag is held in an open transaction. The flag is
    /// committed only after the rename, and a failure before the rename rolls
    /// it back, so an existing file at `destination` survives every failure
    /// that happens before the new file replaces it.
    pub fn export_to_flat_file(
        &self,
        dataset: DatasetId,
        destination: &Path,
    ) -> Result<ExportSummary, ExportError> {
        if self.dataset(dataset)?.is_none() {
            return Err(StoreError::UnknownDataset(dataset).into());
        }
        let items = self.items(dataset)?;
        let dir = export_dir(destination);
        prepare_dir(&dir)?;

        let write_error = |source: std::io::Error| ExportError::Write {
            path: destination.to_path_buf(),
            source,
        };
        let csv_error = |source: csv::Error| ExportError::Csv {
            path: destination.to_path_buf(),
            source,
        };

        let temp = tempfile::NamedTempFile::new_in(&dir).map_err(write_error)?;
        let mut writer = csv::Writer::from_writer(temp);
        writer.write_record(export_header()).map_err(csv_error)?;
        for item in &items {
            writer.write_record(export_row(item)).map_err(csv_error)?;
        }
        let mut temp = writer
            .into_inner()
            .map_err(|err| write_error(err.into_error()))?;
        temp.flush().map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;

        let mut batch = self.write_batch()?;
        batch.mark_exported(dataset)?;
        temp.persist(destination)
            .map_err(|err| write_error(err.error))?;
        if let Err(err) = batch.commit() {
            tracing::warn!(
                "Export written to {} but dataset {dataset} could not be retired: {err}",
                destination.display()
            );
            return Err(err.into());
        }
        tracing::info!(
            "Exported dataset {dataset} ({} rows) to {}",
            items.len(),
            destination.display()
        );
        Ok(ExportSummary {
            path: destination.to_path_buf(),
            rows: items.len(),
        })
    }
}

fn export_dir(destination: &Path) -> PathBuf {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn prepare_dir(dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let metadata = std::fs::metadata(dir).map_err(|source| ExportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    if metadata.permissions().readonly() {
        return Err(ExportError::NotWritable(dir.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::import::read_tweets;
    use crate::annotations::labels::LabelFlags;
    use tempfile::tempdir;

    fn store_with(texts: &[&str]) -> (tempfile::TempDir, AnnotationStore, DatasetId) {
        let dir = tempdir().unwrap();
        let store = AnnotationStore::open(dir.path().join("store.sqlite3")).unwrap();
        let summary = store
            .import_items("batch.csv", &dir.path().join("batch.csv"), texts)
            .unwrap();
        (dir, store, summary.dataset_id)
    }

    #[test]
    fn header_lists_flags_then_details_then_intent_and_time() {
        let header = export_header();
        assert_eq!(header.first().map(String::as_str), Some("tweets"));
        assert_eq!(header[1], "IMIGRACJA");
        assert_eq!(header[8], "INNE");
        assert_eq!(header[9], "IMIGRACJA_detail");
        assert_eq!(header[15], "SZCZEPIONKI_detail");
        assert!(!header.contains(&"INNE_detail".to_string()));
        assert_eq!(&header[16..], ["Intencja", "Czas_s"]);
    }

    #[test]
    fn seconds_use_integer_arithmetic() {
        assert_eq!(format_seconds(0), "0.000");
        assert_eq!(format_seconds(7), "0.007");
        assert_eq!(format_seconds(1234), "1.234");
        assert_eq!(format_seconds(60_050), "60.050");
    }

    #[test]
    fn rows_render_flags_answers_and_time() {
        let (dir, store, dataset) = store_with(&["first", "second"]);
        let item = store.fetch_item(dataset, 0).unwrap().unwrap();
        store
            .apply_labels(item.id, &LabelFlags::from_active(["klimat", "inne"]))
            .unwrap();
        store.update_detail(item.id, "klimat", 1).unwrap();
        store.update_intent(item.id, 4).unwrap();
        store.add_dwell_time(item.id, 2_500).unwrap();

        let destination = dir.path().join("out").join("batch_annotated.csv");
        let summary = store.export_to_flat_file(dataset, &destination).unwrap();
        assert_eq!(summary.rows, 2);

        let mut reader = csv::Reader::from_path(&destination).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            export_header()
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(&rows[0][0], "first");
        assert_eq!(&rows[0][3], "1");
        assert_eq!(&rows[0][8], "1");
        assert_eq!(&rows[0][1], "0");
        assert_eq!(&rows[0][11], "1");
        assert_eq!(&rows[0][9], "-1");
        assert_eq!(&rows[0][16], "4");
        assert_eq!(&rows[0][17], "2.500");
        assert_eq!(&rows[1][16], "-1");
        assert_eq!(&rows[1][17], "0.000");
    }

    #[test]
    fn exported_texts_read_back_verbatim() {
        let texts = [
            "comma, inside",
            "line\nbreak",
            "\"quoted\" text",
            "zażółć gęślą jaźń 🐦",
        ];
        let (dir, store, dataset) = store_with(&texts);
        let destination = dir.path().join("roundtrip.csv");
        store.export_to_flat_file(dataset, &destination).unwrap();
        assert_eq!(read_tweets(&destination).unwrap(), texts);
    }

    #[test]
    fn successful_export_retires_the_dataset() {
        let (dir, store, dataset) = store_with(&["only"]);
        store
            .export_to_flat_file(dataset, &dir.path().join("done.csv"))
            .unwrap();
        assert!(store.dataset(dataset).unwrap().unwrap().exported);
    }

    #[test]
    fn failed_export_leaves_flag_unchanged() {
        let (dir, store, dataset) = store_with(&["only"]);
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = store
            .export_to_flat_file(dataset, &blocker.join("out.csv"))
            .unwrap_err();
        assert!(matches!(err, ExportError::CreateDir { .. }));
        assert!(!store.dataset(dataset).unwrap().unwrap().exported);
    }

    #[test]
    fn rejected_flag_keeps_the_previous_file() {
        let (dir, store, dataset) = store_with(&["only"]);
        let destination = dir.path().join("out.csv");
        std::fs::write(&destination, "earlier export").unwrap();
        let conn = rusqlite::Connection::open(store.path()).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER block_export BEFORE UPDATE OF exported ON datasets
             BEGIN SELECT RAISE(ABORT, 'exports frozen'); END;",
        )
        .unwrap();

        let err = store.export_to_flat_file(dataset, &destination).unwrap_err();
        assert!(matches!(err, ExportError::Store(_)));
        assert_eq!(
            std::fs::read_to_string(&destination).unwrap(),
            "earlier export"
        );
        assert!(!store.dataset(dataset).unwrap().unwrap().exported);
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|entry| {
                let name = entry.as_ref().unwrap().file_name();
                name.to_string_lossy().starts_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn impossible_stored_answers_export_as_unanswered() {
        let (dir, store, dataset) = store_with(&["only"]);
        let item = store.fetch_item(dataset, 0).unwrap().unwrap();
        let conn = rusqlite::Connection::open(store.path()).unwrap();
        conn.execute(
            "UPDATE tweets SET klimat_detail = 70000, intent = 2 WHERE id = ?1",
            [item.id.get()],
        )
        .unwrap();

        let destination = dir.path().join("raw.csv");
        store.export_to_flat_file(dataset, &destination).unwrap();
        let mut reader = csv::Reader::from_path(&destination).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[11], "-1");
        assert_eq!(&row[16], "2");
    }

    #[test]
    fn unknown_dataset_is_reported() {
        let (dir, store, _) = store_with(&["only"]);
        let err = store
            .export_to_flat_file(DatasetId::new(99), &dir.path().join("x.csv"))
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::Store(StoreError::UnknownDataset(_))
        ));
    }
}
